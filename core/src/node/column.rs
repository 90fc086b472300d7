use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema descriptor of one table column.
///
/// `index` is the zero-based position in the table; `tag` is the column's
/// arc under the table identifier. Two columns are equal only when all
/// three fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub index: usize,
    pub tag: u32,
}

impl Column {
    pub fn new(name: impl Into<String>, index: usize, tag: u32) -> Self {
        Column {
            name: name.into(),
            index,
            tag,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]#{}", self.name, self.index, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_uses_all_fields() {
        let a = Column::new("name", 0, 2);
        assert_eq!(a, Column::new("name", 0, 2));
        assert_ne!(a, Column::new("name", 1, 2));
        assert_ne!(a, Column::new("name", 0, 3));
        assert_ne!(a, Column::new("label", 0, 2));
    }

    #[test]
    fn display() {
        assert_eq!(Column::new("status", 1, 3).to_string(), "status[1]#3");
    }
}
