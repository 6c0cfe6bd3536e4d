//! File-backed stake ledger.
//!
//! The whole ledger is one JSON document under the configured
//! directory:
//!
//! ```text
//! {ledger_path}/stake_ledger.json
//! ```
//!
//! Every write rewrites the full document with `create + truncate`,
//! then `flush()` + `sync_all()`, so a partially written previous
//! state cannot leak into the next read. The document is small (one
//! entry per delegator) so full rewrites are acceptable.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, StakeLedger, StakeSnapshot};

const LEDGER_FILENAME: &str = "stake_ledger.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    /// address -> last recorded stake
    #[serde(default)]
    delegators: BTreeMap<String, f64>,
    /// last epoch for which a payout cycle completed
    #[serde(default)]
    last_epoch: Option<u64>,
}

/// Durable ledger rooted at a directory on disk.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    /// In-memory copy of the document; the file is the source of
    /// truth only at open time.
    doc: Mutex<LedgerDocument>,
}

impl FileLedger {
    /// Opens the ledger under `base_dir`, creating the directory and
    /// an empty document if nothing exists yet.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let dir = base_dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(LEDGER_FILENAME);

        let doc = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)
                .map_err(|e| LedgerError::Corrupt(format!("{}: {}", path.display(), e)))?
        } else {
            LedgerDocument::default()
        };

        Ok(FileLedger {
            path,
            doc: Mutex::new(doc),
        })
    }

    fn persist(&self, doc: &LedgerDocument) -> Result<(), LedgerError> {
        let raw = serde_json::to_string_pretty(doc)
            .map_err(|e| LedgerError::Corrupt(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(raw.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

impl StakeLedger for FileLedger {
    fn delegator_stake(&self, address: &str) -> Result<Option<StakeSnapshot>, LedgerError> {
        let doc = self.doc.lock();
        Ok(doc.delegators.get(address).map(|&stake| StakeSnapshot { stake }))
    }

    fn set_delegator_stake(&self, address: &str, stake: f64) -> Result<(), LedgerError> {
        let mut doc = self.doc.lock();
        doc.delegators.insert(address.to_string(), stake);
        self.persist(&doc)
    }

    fn delegator_stakes(&self) -> Result<BTreeMap<String, StakeSnapshot>, LedgerError> {
        let doc = self.doc.lock();
        Ok(doc
            .delegators
            .iter()
            .map(|(addr, &stake)| (addr.clone(), StakeSnapshot { stake }))
            .collect())
    }

    fn last_epoch(&self) -> Result<Option<u64>, LedgerError> {
        Ok(self.doc.lock().last_epoch)
    }

    fn set_last_epoch(&self, epoch: u64) -> Result<(), LedgerError> {
        let mut doc = self.doc.lock();
        doc.last_epoch = Some(epoch);
        self.persist(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ledger_reads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = FileLedger::open(dir.path()).expect("open");
        assert!(ledger.delegator_stake("0xaa").unwrap().is_none());
        assert!(ledger.last_epoch().unwrap().is_none());
        assert!(ledger.delegator_stakes().unwrap().is_empty());
    }

    #[test]
    fn stake_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let ledger = FileLedger::open(dir.path()).expect("open");
            ledger.set_delegator_stake("0xaa", 1000.5).unwrap();
            ledger.set_last_epoch(120).unwrap();
        }
        let ledger = FileLedger::open(dir.path()).expect("reopen");
        assert_eq!(
            ledger.delegator_stake("0xaa").unwrap(),
            Some(StakeSnapshot { stake: 1000.5 })
        );
        assert_eq!(ledger.last_epoch().unwrap(), Some(120));
    }

    #[test]
    fn overwrite_replaces_previous_stake() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = FileLedger::open(dir.path()).expect("open");
        ledger.set_delegator_stake("0xaa", 100.0).unwrap();
        ledger.set_delegator_stake("0xaa", 250.0).unwrap();
        assert_eq!(
            ledger.delegator_stake("0xaa").unwrap(),
            Some(StakeSnapshot { stake: 250.0 })
        );
        assert_eq!(ledger.delegator_stakes().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_file_is_reported_not_reset() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(LEDGER_FILENAME), b"not json").unwrap();
        match FileLedger::open(dir.path()) {
            Err(LedgerError::Corrupt(_)) => {}
            other => panic!("expected Corrupt, got {:?}", other.map(|_| ())),
        }
    }
}
