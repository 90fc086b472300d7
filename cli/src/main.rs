//! mibk: offline tooling for mibkeeper agents.
//!
//! # Usage
//!
//! ```text
//! mibk persist list agent.persist.json
//! mibk persist show agent.persist.json 1.3.6.1.6.3.10.2.1.2
//! mibk persist remove agent.persist.json 1.3.6.1.4.1.99.2.1
//! mibk persist clear agent.persist.json
//! mibk config check mibkeeper.yaml
//! mibk config check
//! mibk demo --persist /tmp/demo.persist.json
//! ```

mod demo;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mibkeeper_core::error::{Error, Result};
use mibkeeper_core::persist::{inspect, JsonFileBackend, PersistStorage, SavePolicy};
use mibkeeper_core::{settings, ObjectId};

#[derive(Parser)]
#[command(name = "mibk")]
#[command(about = "Inspect and maintain mibkeeper snapshot files")]
#[command(version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot file maintenance
    Persist {
        #[command(subcommand)]
        action: PersistAction,
    },
    /// Configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run a sample agent through create, read and destroy
    Demo {
        /// Snapshot file; in-memory when omitted
        #[arg(long)]
        persist: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum PersistAction {
    /// Summarize every stored scalar and table
    List { file: PathBuf },
    /// Print one entry as JSON
    Show { file: PathBuf, oid: String },
    /// Drop one entry and rewrite the file
    Remove { file: PathBuf, oid: String },
    /// Drop every entry
    Clear { file: PathBuf },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Parse and validate, then print the effective values. Defaults to
    /// `$MIBKEEPER_CONFIG_DIR/mibkeeper.yaml`.
    Check { file: Option<PathBuf> },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("mibk: {}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn execute(command: Commands) -> Result<String> {
    match command {
        Commands::Persist { action } => execute_persist(action),
        Commands::Config {
            action: ConfigAction::Check { file },
        } => {
            let config = match file {
                Some(path) => settings::load(&path)?,
                None => settings::load_default()?,
            };
            Ok(serde_json::to_string_pretty(&config)?)
        }
        Commands::Demo { persist } => demo::run(persist),
    }
}

fn execute_persist(action: PersistAction) -> Result<String> {
    match action {
        PersistAction::List { file } => {
            let storage = open_existing(&file)?;
            Ok(inspect::render(&inspect::inventory(&storage)))
        }
        PersistAction::Show { file, oid } => {
            let storage = open_existing(&file)?;
            let id = parse_oid(&oid)?;
            match storage.entry(&id) {
                Some(entry) => Ok(serde_json::to_string_pretty(&entry)?),
                None => Err(Error::Config(format!("no entry for {}", id))),
            }
        }
        PersistAction::Remove { file, oid } => {
            let storage = open_existing(&file)?;
            let id = parse_oid(&oid)?;
            if storage.remove(&id)? {
                Ok(format!("removed {}", id))
            } else {
                Err(Error::Config(format!("no entry for {}", id)))
            }
        }
        PersistAction::Clear { file } => {
            let storage = open_existing(&file)?;
            let count = storage.len();
            storage.clear()?;
            Ok(format!("cleared {} entries", count))
        }
    }
}

/// Open a snapshot file for maintenance. A missing file is an error here
/// rather than an empty store, so a typo does not create a new file.
fn open_existing(file: &Path) -> Result<Arc<PersistStorage>> {
    if !file.is_file() {
        return Err(Error::Config(format!("{} is not a snapshot file", file.display())));
    }
    let backend = JsonFileBackend::new(file)?;
    Ok(Arc::new(PersistStorage::open(backend, SavePolicy::OnChange)?))
}

fn parse_oid(text: &str) -> Result<ObjectId> {
    ObjectId::parse(text).map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mibkeeper_core::persist::{ScalarEntry, SnapshotEntry, StorageBackend};
    use mibkeeper_core::Syntax;
    use serde_json::json;

    fn seeded(dir: &Path) -> PathBuf {
        let path = dir.join("store.json");
        let backend = JsonFileBackend::new(&path).unwrap();
        backend
            .store(&[SnapshotEntry::Scalar(ScalarEntry {
                id: ObjectId::new(vec![1, 3, 6, 1, 6, 3, 10, 2, 1, 2], "snmpEngineBoots"),
                syntax: Syntax::Integer32,
                value: json!(3),
            })])
            .unwrap();
        path
    }

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from(["mibk", "-v", "persist", "show", "f.json", "1.3.6"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Persist {
                action: PersistAction::Show { .. }
            }
        ));
        assert!(Cli::try_parse_from(["mibk", "persist"]).is_err());
    }

    #[test]
    fn list_shows_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(dir.path());
        let out = execute_persist(PersistAction::List { file: path }).unwrap();
        assert!(out.contains("snmpEngineBoots"));
    }

    #[test]
    fn show_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(dir.path());
        let shown = execute_persist(PersistAction::Show {
            file: path.clone(),
            oid: "1.3.6.1.6.3.10.2.1.2".into(),
        })
        .unwrap();
        assert!(shown.contains("\"kind\": \"scalar\""));

        execute_persist(PersistAction::Remove {
            file: path.clone(),
            oid: "1.3.6.1.6.3.10.2.1.2".into(),
        })
        .unwrap();
        assert!(execute_persist(PersistAction::Show {
            file: path,
            oid: "1.3.6.1.6.3.10.2.1.2".into(),
        })
        .is_err());
    }

    #[test]
    fn clear_empties_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(dir.path());
        let out = execute_persist(PersistAction::Clear { file: path.clone() }).unwrap();
        assert_eq!(out, "cleared 1 entries");
        let listed = execute_persist(PersistAction::List { file: path }).unwrap();
        assert!(listed.contains("(empty)"));
    }

    #[test]
    fn missing_file_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(execute_persist(PersistAction::List { file: path.clone() }).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn config_check_prints_effective_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mibkeeper.yaml");
        std::fs::write(&path, "ignore_update_ms: 250\n").unwrap();
        let out = execute(Commands::Config {
            action: ConfigAction::Check { file: Some(path) },
        })
        .unwrap();
        assert!(out.contains("\"ignore_update_ms\": 250"));
    }
}
