//! Shared vocabulary: request outcomes, access modes, row actions and the
//! agent configuration model.

pub mod access;
pub mod action;
pub mod config;
pub mod outcome;

pub use access::Access;
pub use action::RowAction;
pub use config::{AgentConfig, FaultConfig, PersistConfig};
pub use outcome::Outcome;
