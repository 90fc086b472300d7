//! Persistent snapshot store.
//!
//! Holds the latest [`SnapshotEntry`] per identifier and writes the whole
//! set through a [`StorageBackend`]. Writes happen synchronously on the
//! caller's thread; an I/O failure is returned to whoever triggered it and
//! the in-memory entry is kept.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::backend::StorageBackend;
use super::entry::{ScalarEntry, SnapshotEntry, TableEntry};
use super::mock::MemoryBackend;
use super::policy::SavePolicy;
use super::Persistable;
use crate::error::Result;
use crate::namespace::ObjectId;

struct StorageState {
    entries: BTreeMap<ObjectId, SnapshotEntry>,
    policy: SavePolicy,
    /// Changed since the last successful write.
    dirty: bool,
    shut_down: bool,
}

pub struct PersistStorage {
    backend: Box<dyn StorageBackend>,
    state: Mutex<StorageState>,
}

impl PersistStorage {
    /// Open storage over `backend`.
    ///
    /// A backend with nothing stored yet is initialised with an empty
    /// document; failing to do so is an error. A document that cannot be
    /// read or parsed is logged and ignored, and storage starts empty.
    pub fn open(backend: impl StorageBackend + 'static, policy: SavePolicy) -> Result<Self> {
        let location = backend.describe();
        let mut entries = BTreeMap::new();
        match backend.load() {
            Ok(Some(loaded)) => {
                for entry in loaded {
                    entries.insert(entry.id().clone(), entry);
                }
                info!(location = %location, entries = entries.len(), policy = %policy, "snapshot store loaded");
            }
            Ok(None) => {
                backend.store(&[])?;
                info!(location = %location, policy = %policy, "snapshot store created");
            }
            Err(e) => {
                error!(location = %location, error = %e, "snapshot store unreadable, starting empty");
            }
        }
        Ok(PersistStorage {
            backend: Box::new(backend),
            state: Mutex::new(StorageState {
                entries,
                policy,
                dirty: false,
                shut_down: false,
            }),
        })
    }

    /// Storage over a fresh [`MemoryBackend`], with no initial write.
    pub fn in_memory(policy: SavePolicy) -> Self {
        PersistStorage {
            backend: Box::new(MemoryBackend::new()),
            state: Mutex::new(StorageState {
                entries: BTreeMap::new(),
                policy,
                dirty: false,
                shut_down: false,
            }),
        }
    }

    pub fn policy(&self) -> SavePolicy {
        self.state.lock().policy
    }

    pub fn set_policy(&self, policy: SavePolicy) {
        self.state.lock().policy = policy;
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Capture `node` and record its entry. See [`put_entry`](Self::put_entry).
    pub fn put(&self, node: &dyn Persistable) -> Result<bool> {
        let entry = node.snapshot_entry()?;
        self.put_entry(entry)
    }

    /// Record `entry`, replacing any entry with the same identifier.
    ///
    /// Returns whether anything changed. Under `OnChange` a change is
    /// written immediately.
    pub fn put_entry(&self, entry: SnapshotEntry) -> Result<bool> {
        let mut state = self.state.lock();
        if state.entries.get(entry.id()) == Some(&entry) {
            return Ok(false);
        }
        debug!(node = %entry.id().labelled(), kind = entry.kind(), "snapshot entry updated");
        state.entries.insert(entry.id().clone(), entry);
        state.dirty = true;
        if state.policy == SavePolicy::OnChange {
            self.write(&mut state)?;
        }
        Ok(true)
    }

    pub fn entry(&self, id: &ObjectId) -> Option<SnapshotEntry> {
        self.state.lock().entries.get(id).cloned()
    }

    pub fn scalar(&self, id: &ObjectId) -> Option<ScalarEntry> {
        match self.entry(id) {
            Some(SnapshotEntry::Scalar(e)) => Some(e),
            _ => None,
        }
    }

    pub fn table(&self, id: &ObjectId) -> Option<TableEntry> {
        match self.entry(id) {
            Some(SnapshotEntry::Table(e)) => Some(e),
            _ => None,
        }
    }

    /// All scalar entries in identifier order.
    pub fn scalars(&self) -> Vec<ScalarEntry> {
        self.state
            .lock()
            .entries
            .values()
            .filter_map(|e| match e {
                SnapshotEntry::Scalar(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// All table entries in identifier order.
    pub fn tables(&self) -> Vec<TableEntry> {
        self.state
            .lock()
            .entries
            .values()
            .filter_map(|e| match e {
                SnapshotEntry::Table(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.state.lock().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Drop the entry for `id`. Returns whether one existed; under
    /// `OnChange` a removal is written immediately.
    pub fn remove(&self, id: &ObjectId) -> Result<bool> {
        let mut state = self.state.lock();
        if state.entries.remove(id).is_none() {
            return Ok(false);
        }
        debug!(node = %id, "snapshot entry removed");
        state.dirty = true;
        if state.policy == SavePolicy::OnChange {
            self.write(&mut state)?;
        }
        Ok(true)
    }

    /// Drop every entry.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.entries.is_empty() {
            return Ok(());
        }
        state.entries.clear();
        state.dirty = true;
        if state.policy == SavePolicy::OnChange {
            self.write(&mut state)?;
        }
        Ok(())
    }

    /// Write the full document now, regardless of policy.
    pub fn save(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.write(&mut state)
    }

    /// Under `OnExit`, write once. Later calls do nothing once a shutdown
    /// has succeeded; a failed write leaves storage open for a retry.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.shut_down {
            return Ok(());
        }
        if state.policy == SavePolicy::OnExit {
            self.write(&mut state)?;
        }
        state.shut_down = true;
        info!(location = %self.backend.describe(), "snapshot store shut down");
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    fn write(&self, state: &mut StorageState) -> Result<()> {
        let entries: Vec<SnapshotEntry> = state.entries.values().cloned().collect();
        if let Err(e) = self.backend.store(&entries) {
            error!(location = %self.backend.describe(), error = %e, "snapshot write failed");
            return Err(e);
        }
        state.dirty = false;
        debug!(location = %self.backend.describe(), entries = entries.len(), "snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::node::Column;
    use crate::persist::entry::RowEntry;
    use crate::persist::JsonFileBackend;
    use crate::value::Syntax;
    use serde_json::json;

    fn scalar(arc: u32, value: i64) -> SnapshotEntry {
        SnapshotEntry::Scalar(ScalarEntry {
            id: ObjectId::from_arcs(&[1, 3, arc]),
            syntax: Syntax::Integer32,
            value: json!(value),
        })
    }

    fn table(arc: u32) -> SnapshotEntry {
        SnapshotEntry::Table(TableEntry {
            id: ObjectId::from_arcs(&[1, 4, arc]),
            columns: vec![Column::new("name", 0, 2)],
            syntaxes: vec![Syntax::OctetString],
            rows: vec![RowEntry {
                row: ObjectId::from_arcs(&[1]),
                values: vec![json!("a")],
            }],
        })
    }

    fn open(policy: SavePolicy) -> (MemoryBackend, PersistStorage) {
        let backend = MemoryBackend::new();
        let storage = PersistStorage::open(backend.clone(), policy).unwrap();
        (backend, storage)
    }

    // --- Open ---

    #[test]
    fn open_creates_empty_document() {
        let (backend, storage) = open(SavePolicy::OnChange);
        assert_eq!(backend.write_count(), 1);
        assert_eq!(backend.stored(), Some(vec![]));
        assert!(storage.is_empty());
    }

    #[test]
    fn open_loads_existing_entries() {
        let backend = MemoryBackend::with_entries(vec![scalar(1, 5), table(2)]);
        let storage = PersistStorage::open(backend.clone(), SavePolicy::OnChange).unwrap();
        assert_eq!(storage.len(), 2);
        assert_eq!(backend.write_count(), 0);
        assert_eq!(storage.scalar(&ObjectId::from_arcs(&[1, 3, 1])).unwrap().value, json!(5));
        assert!(storage.table(&ObjectId::from_arcs(&[1, 4, 2])).is_some());
    }

    #[test]
    fn open_ignores_unreadable_document() {
        let backend = MemoryBackend::with_entries(vec![scalar(1, 5)]);
        backend.set_fail_reads(true);
        let storage = PersistStorage::open(backend, SavePolicy::OnChange).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn open_fails_when_empty_document_cannot_be_written() {
        let backend = MemoryBackend::new();
        backend.set_fail_writes(true);
        assert!(PersistStorage::open(backend, SavePolicy::OnChange).is_err());
    }

    #[test]
    fn open_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, "[{\"kind\":\"bogus\"}]").unwrap();
        let storage = PersistStorage::open(JsonFileBackend::new(&path).unwrap(), SavePolicy::OnChange).unwrap();
        assert!(storage.is_empty());
    }

    // --- Save policies ---

    #[test]
    fn on_change_writes_per_accepted_put() {
        let (backend, storage) = open(SavePolicy::OnChange);
        let base = backend.write_count();
        for i in 0..3 {
            assert!(storage.put_entry(scalar(1, i)).unwrap());
        }
        assert_eq!(backend.write_count(), base + 3);
    }

    #[test]
    fn unchanged_put_does_not_write() {
        let (backend, storage) = open(SavePolicy::OnChange);
        storage.put_entry(scalar(1, 1)).unwrap();
        let base = backend.write_count();
        assert!(!storage.put_entry(scalar(1, 1)).unwrap());
        assert_eq!(backend.write_count(), base);
    }

    #[test]
    fn on_exit_defers_to_shutdown() {
        let (backend, storage) = open(SavePolicy::OnExit);
        let base = backend.write_count();
        for i in 0..5 {
            storage.put_entry(scalar(i, i as i64)).unwrap();
        }
        storage.remove(&ObjectId::from_arcs(&[1, 3, 0])).unwrap();
        assert_eq!(backend.write_count(), base);
        storage.shutdown().unwrap();
        assert_eq!(backend.write_count(), base + 1);
        storage.shutdown().unwrap();
        assert_eq!(backend.write_count(), base + 1);
        assert_eq!(backend.stored().unwrap().len(), 4);
    }

    #[test]
    fn failed_exit_write_is_retried() {
        let (backend, storage) = open(SavePolicy::OnExit);
        storage.put_entry(scalar(1, 1)).unwrap();
        backend.set_fail_writes(true);
        assert!(storage.shutdown().is_err());
        assert!(storage.is_dirty());
        backend.set_fail_writes(false);
        storage.shutdown().unwrap();
        assert!(!storage.is_dirty());
        assert_eq!(backend.stored().unwrap(), vec![scalar(1, 1)]);
    }

    #[test]
    fn on_change_shutdown_does_not_write() {
        let (backend, storage) = open(SavePolicy::OnChange);
        let base = backend.write_count();
        storage.shutdown().unwrap();
        assert_eq!(backend.write_count(), base);
    }

    #[test]
    fn remove_missing_is_noop() {
        let (backend, storage) = open(SavePolicy::OnChange);
        let base = backend.write_count();
        assert!(!storage.remove(&ObjectId::from_arcs(&[9])).unwrap());
        assert_eq!(backend.write_count(), base);
    }

    #[test]
    fn write_failure_reaches_caller_and_keeps_entry() {
        let (backend, storage) = open(SavePolicy::OnChange);
        backend.set_fail_writes(true);
        let err = storage.put_entry(scalar(1, 1)).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(storage.entry(&ObjectId::from_arcs(&[1, 3, 1])).is_some());
        assert!(storage.is_dirty());
        backend.set_fail_writes(false);
        storage.save().unwrap();
        assert!(!storage.is_dirty());
    }

    // --- Lookup ---

    #[test]
    fn kind_specific_lookups() {
        let (_backend, storage) = open(SavePolicy::OnChange);
        storage.put_entry(scalar(1, 1)).unwrap();
        storage.put_entry(table(1)).unwrap();
        assert_eq!(storage.scalars().len(), 1);
        assert_eq!(storage.tables().len(), 1);
        assert!(storage.table(&ObjectId::from_arcs(&[1, 3, 1])).is_none());
        storage.clear().unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn file_round_trip_through_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        {
            let storage = PersistStorage::open(JsonFileBackend::new(&path).unwrap(), SavePolicy::OnChange).unwrap();
            storage.put_entry(table(7)).unwrap();
        }
        let storage = PersistStorage::open(JsonFileBackend::new(&path).unwrap(), SavePolicy::OnChange).unwrap();
        assert_eq!(storage.entry(&ObjectId::from_arcs(&[1, 4, 7])), Some(table(7)));
    }
}
