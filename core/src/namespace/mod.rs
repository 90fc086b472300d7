//! Hierarchical object identifiers.
//!
//! Every scalar, table, column tag and row key is addressed by an
//! [`ObjectId`]: a sequence of unsigned arcs with an optional display name.

pub mod oid;

pub use oid::{ObjectId, ParseOidError, UNNAMED};
