use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When storage writes its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Rewrite after every put or remove that changed something.
    #[serde(alias = "ON_CHANGE", alias = "OnChange")]
    OnChange,
    /// Keep changes in memory and write once at shutdown.
    #[serde(alias = "ON_EXIT", alias = "OnExit")]
    OnExit,
}

impl SavePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavePolicy::OnChange => "on_change",
            SavePolicy::OnExit => "on_exit",
        }
    }
}

impl Default for SavePolicy {
    fn default() -> Self {
        SavePolicy::OnChange
    }
}

impl fmt::Display for SavePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SavePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "onchange" => Ok(SavePolicy::OnChange),
            "onexit" => Ok(SavePolicy::OnExit),
            _ => Err(format!("unknown save policy '{}' (expected on_change or on_exit)", s)),
        }
    }
}
