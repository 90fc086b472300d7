use std::fmt;

use serde::{Deserialize, Serialize};

/// What a table mutation does to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    RowCreate,
    RowDelete,
    RowChange,
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RowAction::RowCreate => "ROW_CREATE",
            RowAction::RowDelete => "ROW_DELETE",
            RowAction::RowChange => "ROW_CHANGE",
        };
        f.write_str(s)
    }
}
