//! In-memory storage backend for tests.
//!
//! Counts writes and can be told to fail, so save-policy behaviour and
//! error propagation can be asserted without touching the filesystem.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::backend::StorageBackend;
use super::entry::SnapshotEntry;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct MemoryState {
    stored: Option<Vec<SnapshotEntry>>,
    writes: usize,
    fail_writes: bool,
    fail_reads: bool,
}

/// A test double whose clones share one document.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that already holds a document.
    pub fn with_entries(entries: Vec<SnapshotEntry>) -> Self {
        let backend = Self::new();
        backend.inner.lock().stored = Some(entries);
        backend
    }

    /// Number of successful `store` calls.
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }

    pub fn stored(&self) -> Option<Vec<SnapshotEntry>> {
        self.inner.lock().stored.clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Vec<SnapshotEntry>>> {
        let state = self.inner.lock();
        if state.fail_reads {
            return Err(Error::Io(io::Error::new(io::ErrorKind::InvalidData, "simulated read failure")));
        }
        Ok(state.stored.clone())
    }

    fn store(&self, entries: &[SnapshotEntry]) -> Result<()> {
        let mut state = self.inner.lock();
        if state.fail_writes {
            return Err(Error::Io(io::Error::new(io::ErrorKind::Other, "simulated write failure")));
        }
        state.stored = Some(entries.to_vec());
        state.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
