//! One authenticated actor working against the ledger in a data directory.

use crate::access_log::AccessLog;
use crate::settings::Settings;
use crate::{pending, render};
use anyhow::{Context, Result};
use blockmed_core::{
    Block, Difficulty, DomainRoles, Ledger, LedgerStore, Miner, RecordInput, Registry, Role,
    ValidationReport,
};
use blockmed_storage::FileStore;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Debug)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger(&self) -> PathBuf {
        self.root.join("blockchain.dat")
    }

    pub fn users(&self) -> PathBuf {
        self.root.join("users.csv")
    }

    pub fn access_log(&self) -> PathBuf {
        self.root.join("access.log")
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn pending(&self) -> PathBuf {
        self.root.join("pending.json")
    }
}

pub struct Session {
    registry: Registry<FileStore, DomainRoles, AccessLog>,
    actor: String,
    dir: DataDir,
    settings: Settings,
}

impl Session {
    /// Opens the ledger in `dir`, or starts a new one when there is no
    /// ledger file yet. An existing file that fails to load is an error.
    pub fn open(dir: DataDir, actor: &str) -> Result<Self> {
        std::fs::create_dir_all(dir.root())
            .with_context(|| format!("creating {}", dir.root().display()))?;
        let settings = Settings::load(&dir.settings())?;
        let store = FileStore::new(dir.ledger()).with_checksum(settings.checksum);
        let ledger = if store.exists() {
            store.load()?
        } else {
            info!(path = %store.path().display(), "no ledger file, starting a new ledger");
            Ledger::new()
        };
        let mut registry = Registry::new(
            ledger,
            Miner::new(settings.difficulty),
            store,
            DomainRoles,
            AccessLog::new(dir.access_log()),
        );
        registry.set_pending(pending::load(&dir.pending())?);
        Ok(Self {
            registry,
            actor: actor.to_string(),
            dir,
            settings,
        })
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn ledger(&self) -> &Ledger {
        self.registry.ledger()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.registry.difficulty()
    }

    pub fn add_record(&mut self, input: RecordInput) -> Result<String> {
        let tx = self.registry.add_record(&self.actor, input)?;
        let summary = format!(
            "Record for patient {} is pending; run `mine` to seal it",
            tx.patient_id()
        );
        pending::store(&self.dir.pending(), self.registry.pending())?;
        Ok(summary)
    }

    pub fn mine(&mut self) -> Result<Block> {
        let block = self.registry.mine_pending(&self.actor)?.clone();
        self.registry.save(&self.actor)?;
        pending::store(&self.dir.pending(), None)?;
        Ok(block)
    }

    pub fn view(&self) -> Result<String> {
        Ok(render::ledger(self.registry.view(&self.actor)?))
    }

    pub fn validate(&self) -> Result<ValidationReport> {
        Ok(self.registry.validate(&self.actor)?)
    }

    pub fn save(&self) -> Result<PathBuf> {
        self.registry.save(&self.actor)?;
        Ok(self.dir.ledger())
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        let target = FileStore::new(path).with_checksum(self.settings.checksum);
        self.registry.save_to(&self.actor, &target)?;
        Ok(())
    }

    /// Reloads the session's own ledger file, discarding unsaved changes.
    pub fn reload(&mut self) -> Result<ValidationReport> {
        self.registry.load(&self.actor)?;
        self.validate()
    }

    /// Validates the ledger in `path` and, only if it is valid, makes it the
    /// session's ledger on disk.
    pub fn import(&mut self, path: &Path) -> Result<ValidationReport> {
        let source = FileStore::new(path).with_checksum(self.settings.checksum);
        let report = self.registry.import_from(&self.actor, &source)?;
        if report.is_valid() {
            self.registry.save(&self.actor)?;
        }
        Ok(report)
    }

    pub fn set_difficulty(&mut self, level: u8) -> Result<Difficulty> {
        let difficulty = self.registry.set_difficulty(&self.actor, level)?;
        self.settings.difficulty = difficulty;
        self.settings.save(&self.dir.settings())?;
        Ok(difficulty)
    }

    pub fn pending_patient(&self) -> Option<&str> {
        self.registry.pending().map(|tx| tx.patient_id())
    }

    pub fn role(&self) -> Role {
        self.registry.role_of(&self.actor)
    }
}
