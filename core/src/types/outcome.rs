//! Request outcome codes.
//!
//! Validation listeners answer with one of these; the request router
//! reports them to the remote caller unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Success,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
}

impl Outcome {
    const BY_CODE: [Outcome; 19] = [
        Outcome::Success,
        Outcome::TooBig,
        Outcome::NoSuchName,
        Outcome::BadValue,
        Outcome::ReadOnly,
        Outcome::GenErr,
        Outcome::NoAccess,
        Outcome::WrongType,
        Outcome::WrongLength,
        Outcome::WrongEncoding,
        Outcome::WrongValue,
        Outcome::NoCreation,
        Outcome::InconsistentValue,
        Outcome::ResourceUnavailable,
        Outcome::CommitFailed,
        Outcome::UndoFailed,
        Outcome::AuthorizationError,
        Outcome::NotWritable,
        Outcome::InconsistentName,
    ];

    /// Protocol error-status code.
    pub fn code(&self) -> u8 {
        // Variants are declared in code order.
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Outcome> {
        Outcome::BY_CODE.get(code as usize).copied()
    }

    pub fn is_success(&self) -> bool {
        *self == Outcome::Success
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::TooBig => "tooBig",
            Outcome::NoSuchName => "noSuchName",
            Outcome::BadValue => "badValue",
            Outcome::ReadOnly => "readOnly",
            Outcome::GenErr => "genErr",
            Outcome::NoAccess => "noAccess",
            Outcome::WrongType => "wrongType",
            Outcome::WrongLength => "wrongLength",
            Outcome::WrongEncoding => "wrongEncoding",
            Outcome::WrongValue => "wrongValue",
            Outcome::NoCreation => "noCreation",
            Outcome::InconsistentValue => "inconsistentValue",
            Outcome::ResourceUnavailable => "resourceUnavailable",
            Outcome::CommitFailed => "commitFailed",
            Outcome::UndoFailed => "undoFailed",
            Outcome::AuthorizationError => "authorizationError",
            Outcome::NotWritable => "notWritable",
            Outcome::InconsistentName => "inconsistentName",
        }
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.code())
    }
}
