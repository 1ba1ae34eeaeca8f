use anyhow::{Context, Result};
use blockmed_core::Difficulty;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Persisted in `settings.json` next to the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Keep a `.sha256` sidecar next to the ledger file and check it on load.
    #[serde(default)]
    pub checksum: bool,
}

impl Settings {
    /// Defaults when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }
}
