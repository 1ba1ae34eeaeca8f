//! The record waiting to be mined, kept in `pending.json` between runs.

use anyhow::{Context, Result};
use blockmed_core::Transaction;
use std::fs;
use std::path::Path;

pub fn load(path: &Path) -> Result<Option<Transaction>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let tx = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(tx))
}

/// Writes `pending`, or removes the file when there is nothing pending.
pub fn store(path: &Path, pending: Option<&Transaction>) -> Result<()> {
    match pending {
        Some(tx) => {
            let json = serde_json::to_string_pretty(tx)?;
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))
        }
        None if path.exists() => {
            fs::remove_file(path).with_context(|| format!("removing {}", path.display()))
        }
        None => Ok(()),
    }
}
