//! Error types for the managed-object engine.
//!
//! Validation rejections are not errors: they travel as [`Outcome`] values.
//! Everything here is either a typed conversion failure, an I/O or
//! serialization failure in persistence, or a programming-level misuse that
//! is reported at construction/registration time.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::namespace::ObjectId;
use crate::types::Outcome;
use crate::value::ConversionError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Row {row} does not exist in {table}")]
    NoSuchRow { table: ObjectId, row: ObjectId },

    #[error("Column {column} is not valid for {table}")]
    NoSuchColumn { table: ObjectId, column: String },

    #[error("Row {row} already exists in {table}")]
    DuplicateRow { table: ObjectId, row: ObjectId },

    #[error("Object {id} overlaps an existing registration in context '{context}'")]
    DuplicateRegistration { id: ObjectId, context: String },

    #[error("Index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Object {0} is not writable")]
    NotWritable(ObjectId),

    #[error("Commit of {target} without a granted prepare: {reason}")]
    InvalidCommit { target: ObjectId, reason: String },

    #[error("Agent is {actual}, expected {expected}")]
    AgentState { expected: String, actual: String },

    #[error("Panic: {0}")]
    Panic(String),
}

impl Error {
    /// The protocol outcome reported to a remote caller for this error.
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::Conversion(_) => Outcome::WrongType,
            Error::NoSuchRow { .. } | Error::NoSuchColumn { .. } => Outcome::NoSuchName,
            Error::NotWritable(_) => Outcome::NotWritable,
            Error::InvalidCommit { .. } => Outcome::CommitFailed,
            _ => Outcome::GenErr,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Syntax;

    #[test]
    fn conversion_maps_to_wrong_type() {
        let err: Error = ConversionError::new(Syntax::Integer32, "abc", "not a number").into();
        assert_eq!(err.outcome(), Outcome::WrongType);
    }

    #[test]
    fn missing_row_maps_to_no_such_name() {
        let err = Error::NoSuchRow {
            table: ObjectId::from_arcs(&[1, 3, 6]),
            row: ObjectId::from_arcs(&[5]),
        };
        assert_eq!(err.outcome(), Outcome::NoSuchName);
        assert!(err.to_string().contains("1.3.6"));
    }

    #[test]
    fn io_maps_to_general_error() {
        let err: Error = io::Error::new(io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.outcome(), Outcome::GenErr);
    }
}
