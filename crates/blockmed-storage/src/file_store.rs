use crate::codec::{self, StorageError};
use crate::integrity;
use anyhow::Context;
use blockmed_core::{Ledger, LedgerStore};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ledger kept in a single file. Saves go through a sibling `.tmp` file and a
/// rename, so a crash mid-write leaves the previous file in place.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    checksum: bool,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            checksum: false,
        }
    }

    /// Also write `<path>.sha256` on save and check it on load.
    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.checksum = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn checksum_path(&self) -> PathBuf {
        sibling(&self.path, ".sha256")
    }

    fn tmp_path(&self) -> PathBuf {
        sibling(&self.path, ".tmp")
    }

    fn check_sidecar(&self) -> anyhow::Result<()> {
        let sidecar = self.checksum_path();
        if !sidecar.is_file() {
            warn!(path = %self.path.display(), "no checksum sidecar, skipping integrity check");
            return Ok(());
        }
        let expected = fs::read_to_string(&sidecar)
            .with_context(|| format!("reading {}", sidecar.display()))?;
        let expected = expected.trim().to_owned();
        let actual = integrity::file_digest(&self.path)
            .with_context(|| format!("hashing {}", self.path.display()))?;
        if !actual.eq_ignore_ascii_case(&expected) {
            return Err(StorageError::ChecksumMismatch { expected, actual }.into());
        }
        debug!(path = %self.path.display(), "checksum verified");
        Ok(())
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl LedgerStore for FileStore {
    fn save(&self, ledger: &Ledger) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = self.tmp_path();
        {
            let file =
                File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
            let mut w = BufWriter::new(file);
            codec::write_ledger(&mut w, ledger)
                .with_context(|| format!("writing {}", tmp.display()))?;
            w.flush()?;
            w.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        if self.checksum {
            let digest = integrity::file_digest(&self.path)?;
            let sidecar = self.checksum_path();
            fs::write(&sidecar, format!("{digest}\n"))
                .with_context(|| format!("writing {}", sidecar.display()))?;
        }
        info!(path = %self.path.display(), blocks = ledger.len(), "ledger saved");
        Ok(())
    }

    fn load(&self) -> anyhow::Result<Ledger> {
        if self.checksum {
            self.check_sidecar()?;
        }
        let file =
            File::open(&self.path).with_context(|| format!("opening {}", self.path.display()))?;
        let len = file.metadata()?.len();
        let mut r = BufReader::new(file);
        let ledger = codec::read_ledger(&mut r, len)
            .with_context(|| format!("decoding {}", self.path.display()))?;
        info!(path = %self.path.display(), blocks = ledger.len(), "ledger loaded");
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_paths_append_suffix() {
        let store = FileStore::new("data/blockchain.dat");
        assert_eq!(store.tmp_path(), PathBuf::from("data/blockchain.dat.tmp"));
        assert_eq!(
            store.checksum_path(),
            PathBuf::from("data/blockchain.dat.sha256")
        );
    }

    #[test]
    fn save_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/ledger.dat"));
        store.save(&Ledger::new()).unwrap();
        assert!(store.exists());
        assert!(!store.tmp_path().exists());
        assert!(!store.checksum_path().exists());
    }

    #[test]
    fn missing_file_fails_with_path_context() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.dat"));
        let err = store.load().unwrap_err();
        assert!(format!("{err:#}").contains("absent.dat"));
    }
}
