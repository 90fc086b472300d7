//! mibkeeper core: managed scalars and row-status tables with
//! validate-then-commit SET handling and schema-checked snapshot persistence.
//!
//! Module map:
//!
//! - [`namespace`]: hierarchical object identifiers
//! - [`value`]: syntaxes, protocol variables, generic/protocol conversion
//! - [`types`]: outcome codes, access modes, row actions, configuration
//! - [`node`]: scalar and table engines, listeners, row-status state machine
//! - [`persist`]: snapshot entries, storage, backends, inspection
//! - [`server`]: managed-object registration and request routing
//! - [`agent`]: shared context, fault registry, MIB modules, lifecycle
//! - [`settings`]: YAML configuration loading

pub mod agent;
pub mod error;
pub mod namespace;
pub mod node;
pub mod persist;
pub mod server;
pub mod settings;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use namespace::ObjectId;
pub use types::{Access, Outcome, RowAction};
pub use value::{Syntax, Variable};
