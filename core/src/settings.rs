//! Loading the agent configuration from YAML.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::config::AgentConfig;

/// Environment variable naming the directory that holds `mibkeeper.yaml`.
pub const CONFIG_DIR_ENV: &str = "MIBKEEPER_CONFIG_DIR";
pub const CONFIG_FILENAME: &str = "mibkeeper.yaml";

/// Defaults for every field.
pub fn default_config() -> AgentConfig {
    AgentConfig::default()
}

/// Parse and validate a YAML document. Relative persistence paths are left
/// as written.
pub fn parse(content: &str) -> Result<AgentConfig> {
    let config: AgentConfig = if content.trim().is_empty() {
        default_config()
    } else {
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?
    };
    config.validate().map_err(Error::Config)?;
    Ok(config)
}

/// Load a config file. A relative `persist.filename` is resolved against
/// the file's own directory.
pub fn load(path: &Path) -> Result<AgentConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    let mut config = parse(&content)?;
    if config.persist.filename.is_relative() {
        if let Some(dir) = path.parent() {
            config.persist.filename = dir.join(&config.persist.filename);
        }
    }
    debug!(path = %path.display(), persist = %config.persist.filename.display(), "config loaded");
    Ok(config)
}

/// Serialize a config back to YAML.
pub fn save(path: &Path, config: &AgentConfig) -> Result<()> {
    let content = serde_yaml::to_string(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// The directory configuration is looked up in: `$MIBKEEPER_CONFIG_DIR`
/// when set, otherwise the current directory.
pub fn config_dir() -> PathBuf {
    std::env::var_os(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load `<config dir>/mibkeeper.yaml`, or defaults with the snapshot file
/// placed in the config dir when no file exists.
pub fn load_default() -> Result<AgentConfig> {
    let dir = config_dir();
    let path = dir.join(CONFIG_FILENAME);
    if path.exists() {
        return load(&path);
    }
    let mut config = default_config();
    config.persist.filename = dir.join(&config.persist.filename);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::SavePolicy;

    #[test]
    fn empty_document_is_defaults() {
        assert_eq!(parse("").unwrap(), default_config());
        assert_eq!(parse("  \n").unwrap(), default_config());
    }

    #[test]
    fn parse_partial_document() {
        let yaml = "ignore_update_ms: 250\npersist:\n  policy: on_exit\n";
        let c = parse(yaml).unwrap();
        assert_eq!(c.ignore_update_ms, 250);
        assert_eq!(c.persist.policy, SavePolicy::OnExit);
        assert!(c.faults.console);
    }

    #[test]
    fn parse_rejects_out_of_range() {
        let err = parse("ignore_update_ms: 20000\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn parse_rejects_unknown_policy() {
        assert!(parse("persist:\n  policy: sometimes\n").is_err());
    }

    #[test]
    fn load_resolves_relative_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mibkeeper.yaml");
        std::fs::write(&path, "persist:\n  filename: state.json\n").unwrap();
        let c = load(&path).unwrap();
        assert_eq!(c.persist.filename, dir.path().join("state.json"));
    }

    #[test]
    fn load_keeps_absolute_filename() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("elsewhere").join("s.json");
        let path = dir.path().join("c.yaml");
        std::fs::write(&path, format!("persist:\n  filename: {}\n", target.display())).unwrap();
        assert_eq!(load(&path).unwrap().persist.filename, target);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.yaml");
        let mut c = default_config();
        c.ignore_update_ms = 0;
        c.persist.filename = dir.path().join("p.json");
        save(&path, &c).unwrap();
        assert_eq!(load(&path).unwrap(), c);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = load(Path::new("/nonexistent/mibkeeper.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
