//! Storage backends: where the snapshot document lives.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::entry::SnapshotEntry;
use crate::error::{Error, Result};

/// Durable home of the snapshot document.
pub trait StorageBackend: Send + Sync {
    /// Read all entries. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> Result<Option<Vec<SnapshotEntry>>>;

    /// Replace the stored document with `entries`.
    fn store(&self, entries: &[SnapshotEntry]) -> Result<()>;

    /// Human-readable location, for log lines.
    fn describe(&self) -> String;
}

/// A JSON array of entries in a single file, rewritten atomically through a
/// temporary file in the same directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::Config("persistence filename is empty".to_string()));
        }
        Ok(JsonFileBackend { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<Vec<SnapshotEntry>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let entries: Vec<SnapshotEntry> = serde_json::from_str(&content)?;
        Ok(Some(entries))
    }

    fn store(&self, entries: &[SnapshotEntry]) -> Result<()> {
        let dir = self.parent_dir();
        let persist_err = |source: std::io::Error| Error::Persist {
            path: self.path.clone(),
            source,
        };
        fs::create_dir_all(&dir).map_err(persist_err)?;

        let json = serde_json::to_string_pretty(entries)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(persist_err)?;
        tmp.write_all(json.as_bytes()).map_err(persist_err)?;
        tmp.as_file().sync_all().map_err(persist_err)?;
        tmp.persist(&self.path).map_err(|e| persist_err(e.error))?;

        debug!(path = %self.path.display(), entries = entries.len(), "snapshot file written");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
