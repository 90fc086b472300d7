use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote access mode of a scalar or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    ReadWrite,
    /// Writable, and may take part in row creation.
    ReadCreate,
}

impl Access {
    pub fn is_writable(&self) -> bool {
        !matches!(self, Access::ReadOnly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Access::ReadOnly => "read-only",
            Access::ReadWrite => "read-write",
            Access::ReadCreate => "read-create",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_read_only_is_not_writable() {
        assert!(!Access::ReadOnly.is_writable());
        assert!(Access::ReadWrite.is_writable());
        assert!(Access::ReadCreate.is_writable());
    }

    #[test]
    fn display() {
        assert_eq!(Access::ReadCreate.to_string(), "read-create");
    }
}
