//! Snapshot persistence.
//!
//! Non-volatile nodes hand a [`SnapshotEntry`] to [`PersistStorage`] after
//! every committed change. Storage keeps the latest entry per identifier and
//! rewrites its backend according to the [`SavePolicy`]. At startup a node
//! asks for its entry and restores from it only when the recorded schema
//! still matches.

pub mod backend;
pub mod entry;
pub mod inspect;
pub mod mock;
pub mod policy;
pub mod storage;

pub use backend::{JsonFileBackend, StorageBackend};
pub use entry::{NodeTraits, RowEntry, ScalarEntry, SchemaMismatch, SnapshotEntry, TableEntry};
pub use mock::MemoryBackend;
pub use policy::SavePolicy;
pub use storage::PersistStorage;

use crate::error::Result;
use crate::namespace::ObjectId;

/// A node that can be captured as a snapshot entry.
pub trait Persistable {
    fn persist_id(&self) -> &ObjectId;

    fn snapshot_entry(&self) -> Result<SnapshotEntry>;
}
