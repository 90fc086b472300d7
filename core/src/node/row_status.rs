//! Row lifecycle state machine.
//!
//! ```text
//!   (absent) --createAndGo--> active --destroy--> (absent)
//! ```
//!
//! Only `createAndGo` and `destroy` are accepted as requested targets; every
//! other status value is refused with `wrongValue` before any listener is
//! consulted.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::column::Column;
use crate::namespace::ObjectId;
use crate::types::Outcome;
use crate::value::Variable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowStatus {
    NotExistant,
    Active,
    NotInService,
    NotReady,
    CreateAndGo,
    CreateAndWait,
    Destroy,
}

impl RowStatus {
    pub fn code(&self) -> i32 {
        match self {
            RowStatus::NotExistant => 0,
            RowStatus::Active => 1,
            RowStatus::NotInService => 2,
            RowStatus::NotReady => 3,
            RowStatus::CreateAndGo => 4,
            RowStatus::CreateAndWait => 5,
            RowStatus::Destroy => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<RowStatus> {
        match code {
            0 => Some(RowStatus::NotExistant),
            1 => Some(RowStatus::Active),
            2 => Some(RowStatus::NotInService),
            3 => Some(RowStatus::NotReady),
            4 => Some(RowStatus::CreateAndGo),
            5 => Some(RowStatus::CreateAndWait),
            6 => Some(RowStatus::Destroy),
            _ => None,
        }
    }

    /// Decode a status cell value. Non-integers and unknown codes are `None`.
    pub fn from_variable(v: &Variable) -> Option<RowStatus> {
        match v {
            Variable::Integer32(code) => RowStatus::from_code(i64::from(*code)),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Variable {
        Variable::Integer32(self.code())
    }

    /// What requesting `self` does to a row that does or does not exist.
    pub fn transition(&self, row_exists: bool) -> Transition {
        match (self, row_exists) {
            (RowStatus::CreateAndGo, false) => Transition::Create,
            (RowStatus::CreateAndGo, true) => Transition::Reject(Outcome::InconsistentValue),
            (RowStatus::Destroy, true) => Transition::Destroy,
            (RowStatus::Destroy, false) => Transition::Reject(Outcome::NoSuchName),
            _ => Transition::Reject(Outcome::WrongValue),
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RowStatus::NotExistant => "notExistant",
            RowStatus::Active => "active",
            RowStatus::NotInService => "notInService",
            RowStatus::NotReady => "notReady",
            RowStatus::CreateAndGo => "createAndGo",
            RowStatus::CreateAndWait => "createAndWait",
            RowStatus::Destroy => "destroy",
        };
        write!(f, "{}({})", s, self.code())
    }
}

/// Outcome of the state machine for one status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Create,
    Destroy,
    Reject(Outcome),
}

/// One decoded write against a table.
#[derive(Debug, Clone, PartialEq)]
pub enum RowMutation {
    /// A write to the row-status column.
    Status { row: ObjectId, target: RowStatus },
    /// A write to any other column.
    Change {
        row: ObjectId,
        column: Column,
        value: Variable,
    },
}

impl RowMutation {
    pub fn row(&self) -> &ObjectId {
        match self {
            RowMutation::Status { row, .. } | RowMutation::Change { row, .. } => row,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, RowMutation::Status { target: RowStatus::CreateAndGo, .. })
    }

    pub fn is_destroy(&self) -> bool {
        matches!(self, RowMutation::Status { target: RowStatus::Destroy, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        for code in 0..7 {
            assert_eq!(RowStatus::from_code(code).unwrap().code() as i64, code);
        }
        assert!(RowStatus::from_code(7).is_none());
        assert!(RowStatus::from_code(-1).is_none());
    }

    #[test]
    fn decode_from_variable() {
        assert_eq!(RowStatus::from_variable(&Variable::Integer32(4)), Some(RowStatus::CreateAndGo));
        assert_eq!(RowStatus::from_variable(&Variable::Gauge32(4)), None);
        assert_eq!(RowStatus::Active.as_variable(), Variable::Integer32(1));
    }

    #[test]
    fn create_and_go() {
        assert_eq!(RowStatus::CreateAndGo.transition(false), Transition::Create);
        assert_eq!(
            RowStatus::CreateAndGo.transition(true),
            Transition::Reject(Outcome::InconsistentValue)
        );
    }

    #[test]
    fn destroy() {
        assert_eq!(RowStatus::Destroy.transition(true), Transition::Destroy);
        assert_eq!(RowStatus::Destroy.transition(false), Transition::Reject(Outcome::NoSuchName));
    }

    #[test]
    fn unsupported_targets_are_wrong_value() {
        for target in [
            RowStatus::NotExistant,
            RowStatus::Active,
            RowStatus::NotInService,
            RowStatus::NotReady,
            RowStatus::CreateAndWait,
        ] {
            for exists in [true, false] {
                assert_eq!(target.transition(exists), Transition::Reject(Outcome::WrongValue));
            }
        }
    }

    #[test]
    fn display() {
        assert_eq!(RowStatus::CreateAndGo.to_string(), "createAndGo(4)");
    }
}
