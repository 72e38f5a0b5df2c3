//! Version-scoped risk ledgers
//!
//! Each key version has exactly one ledger mapping opaque signatures to risk
//! metadata, stored at `ledgers/v<N>.json`. Only the ledger of the current key
//! version is ever open; after rotation the previous file stays on disk
//! untouched (archived) and is no longer reachable through lookups.
//!
//! ## Version Binding
//!
//! A signature computed under version `v` means nothing against any other
//! version's ledger. The store therefore refuses entries whose `key_version`
//! differs from the active ledger's version, and the active version is only
//! ever switched by the coordinator during rotation.
//!
//! Switching is split so that the fallible part (opening or creating the next
//! file) can run before the key version is committed. [`LedgerStore::prepare`]
//! loads the next ledger without changing what is active, and
//! [`LedgerStore::install`] swaps it in.
//!
//! ## Concurrency
//!
//! Writes take the ledger mutex, merge into a copy of the current entries,
//! persist the merged map, and only then commit it in memory. Concurrent
//! batches therefore never lose each other's entries, and a failed write
//! leaves both disk and memory at the previous state.

use super::store::{read_json, write_json_atomic, DataDir, PersistenceError};
use crate::crypto::OpaqueSignature;
use crate::protocol::types::LedgerEntry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Entry signed under key v{entry_version} cannot enter ledger v{ledger_version}")]
    VersionMismatch {
        entry_version: u64,
        ledger_version: u64,
    },

    #[error("Failed to persist ledger: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

type Entries = BTreeMap<OpaqueSignature, LedgerEntry>;

/// One version's ledger, loaded in memory.
#[derive(Debug)]
struct Ledger {
    version: u64,
    path: PathBuf,
    entries: Entries,
}

impl Ledger {
    /// Load the ledger for `version`, creating an empty file if absent.
    fn open(dir: &DataDir, version: u64) -> Result<Self, PersistenceError> {
        let path = dir.ledger_path(version);
        let entries = match read_json::<Entries>(&path)? {
            Some(entries) => {
                info!(version, entries = entries.len(), "loaded active ledger");
                entries
            }
            None => {
                let entries = Entries::new();
                write_json_atomic(&path, &entries)?;
                info!(version, "initialized new ledger");
                entries
            }
        };
        Ok(Self {
            version,
            path,
            entries,
        })
    }
}

/// A loaded ledger waiting to become active.
#[derive(Debug)]
pub struct PreparedLedger(Ledger);

impl PreparedLedger {
    pub fn version(&self) -> u64 {
        self.0.version
    }
}

/// Owner of ledger contents; exposes only the active version's ledger.
#[derive(Debug)]
pub struct LedgerStore {
    dir: DataDir,
    active: Mutex<Ledger>,
}

impl LedgerStore {
    /// Open the store with the ledger for `active_version` active.
    pub fn open(dir: DataDir, active_version: u64) -> Result<Self, LedgerError> {
        let ledger = Ledger::open(&dir, active_version)?;
        Ok(Self {
            dir,
            active: Mutex::new(ledger),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, LedgerError> {
        self.active.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Key version of the active ledger.
    pub fn active_version(&self) -> Result<u64, LedgerError> {
        Ok(self.lock()?.version)
    }

    /// Number of entries in the active ledger.
    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    /// Insert or overwrite a single entry.
    pub fn upsert(&self, signature: OpaqueSignature, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.upsert_batch(vec![(signature, entry)]).map(|_| ())
    }

    /// Merge a batch of entries into the active ledger as one write.
    ///
    /// Either every entry is written or none is. Returns the entry count.
    pub fn upsert_batch(
        &self,
        batch: Vec<(OpaqueSignature, LedgerEntry)>,
    ) -> Result<usize, LedgerError> {
        let mut ledger = self.lock()?;

        if let Some((_, stale)) = batch
            .iter()
            .find(|(_, entry)| entry.key_version != ledger.version)
        {
            return Err(LedgerError::VersionMismatch {
                entry_version: stale.key_version,
                ledger_version: ledger.version,
            });
        }

        let count = batch.len();
        let mut merged = ledger.entries.clone();
        merged.extend(batch);
        write_json_atomic(&ledger.path, &merged)?;
        ledger.entries = merged;

        Ok(count)
    }

    /// Look a signature up in the active ledger.
    pub fn lookup(&self, signature: &OpaqueSignature) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.lock()?.entries.get(signature).cloned())
    }

    /// Look up many signatures under a single lock acquisition.
    pub fn lookup_many<'a>(
        &self,
        signatures: impl IntoIterator<Item = &'a OpaqueSignature>,
    ) -> Result<Vec<Option<LedgerEntry>>, LedgerError> {
        let ledger = self.lock()?;
        Ok(signatures
            .into_iter()
            .map(|sig| ledger.entries.get(sig).cloned())
            .collect())
    }

    /// Load (or create) `version`'s ledger without activating it.
    pub(crate) fn prepare(&self, version: u64) -> Result<PreparedLedger, LedgerError> {
        Ok(PreparedLedger(Ledger::open(&self.dir, version)?))
    }

    /// Make a prepared ledger active, archiving the current one.
    ///
    /// Called only by rotation, with the key manager write-locked.
    pub(crate) fn install(&self, next: PreparedLedger) -> Result<(), LedgerError> {
        let mut ledger = self.lock()?;
        info!(
            archived = ledger.version,
            active = next.0.version,
            "switched active ledger"
        );
        *ledger = next.0;
        Ok(())
    }

    /// Make `version`'s ledger active in one step.
    #[cfg(test)]
    pub(crate) fn switch_to(&self, version: u64) -> Result<(), LedgerError> {
        let next = self.prepare(version)?;
        self.install(next)
    }
}
