use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::persist::SavePolicy;

pub const DEFAULT_IGNORE_UPDATE_MS: u64 = 1000;
pub const MAX_IGNORE_UPDATE_MS: u64 = 10_000;
pub const DEFAULT_PERSIST_FILENAME: &str = "mibkeeper.persist.json";

/// Agent configuration. Every field has a default, so an empty document is
/// a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Minimum spacing between two fired GET events on one node.
    pub ignore_update_ms: u64,
    pub persist: PersistConfig,
    pub faults: FaultConfig,
    /// Whether the boots counter may be reset to 0 by a remote write.
    pub allow_boots_count_reset: bool,
}

impl AgentConfig {
    pub fn new() -> Self {
        AgentConfig {
            ignore_update_ms: DEFAULT_IGNORE_UPDATE_MS,
            persist: PersistConfig::default(),
            faults: FaultConfig::default(),
            allow_boots_count_reset: true,
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.ignore_update_ms > MAX_IGNORE_UPDATE_MS {
            return Err(format!(
                "ignore_update_ms {} exceeds the maximum of {}",
                self.ignore_update_ms, MAX_IGNORE_UPDATE_MS
            ));
        }
        if self.persist.filename.as_os_str().is_empty() {
            return Err("persist.filename must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistConfig {
    /// Snapshot file. Relative paths are resolved against the directory of
    /// the configuration file by `settings::load`.
    pub filename: PathBuf,
    pub policy: SavePolicy,
}

impl Default for PersistConfig {
    fn default() -> Self {
        PersistConfig {
            filename: PathBuf::from(DEFAULT_PERSIST_FILENAME),
            policy: SavePolicy::OnChange,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaultConfig {
    /// Echo reported faults to stderr in addition to the listeners.
    pub console: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        FaultConfig { console: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AgentConfig::default();
        assert_eq!(c.ignore_update_ms, 1000);
        assert_eq!(c.persist.policy, SavePolicy::OnChange);
        assert_eq!(c.persist.filename, PathBuf::from("mibkeeper.persist.json"));
        assert!(c.faults.console);
        assert!(c.allow_boots_count_reset);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_long_debounce() {
        let mut c = AgentConfig::default();
        c.ignore_update_ms = 10_001;
        assert!(c.validate().unwrap_err().contains("ignore_update_ms"));
        c.ignore_update_ms = 10_000;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_filename() {
        let mut c = AgentConfig::default();
        c.persist.filename = PathBuf::new();
        assert!(c.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let mut c = AgentConfig::default();
        c.persist.policy = SavePolicy::OnExit;
        let json = serde_json::to_string(&c).unwrap();
        let back: AgentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
