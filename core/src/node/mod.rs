//! Managed nodes: scalars, tables and the listener plumbing they share.

pub mod column;
pub mod listeners;
pub mod row_status;
pub mod scalar;
pub mod table;

pub use column::Column;
pub use listeners::{
    ListenerKey, NodeRef, RestoreDefaultListener, ScalarGetListener, ScalarSetListener,
    ScalarValidationListener, TableGetListener, TableSetListener, TableValidationListener,
};
pub use row_status::{RowMutation, RowStatus, Transition};
pub use scalar::Scalar;
pub use table::{RowSnapshot, Table, TableBuilder};
