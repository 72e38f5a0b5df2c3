//! On-disk JSON state files
//!
//! Every store (keys, client registry, per-version ledgers) is a single JSON
//! document rewritten as a whole on each mutation. Writes go to a sibling
//! `.tmp` file which is synced and then renamed over the target, so a crash
//! leaves either the old document or the new one, never a torn file.
//!
//! ## Layout
//!
//! ```text
//! <data_dir>/
//!   server_keys.json
//!   authorized_clients.json
//!   ledgers/
//!     v1.json
//!     v2.json
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const KEYS_FILE: &str = "server_keys.json";
const CLIENTS_FILE: &str = "authorized_clients.json";
const LEDGER_DIR: &str = "ledgers";

/// Errors raised while reading or writing state files
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode '{path}': {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Handle on the data directory holding all persisted protocol state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Open (and create if needed) a data directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        let ledgers = root.join(LEDGER_DIR);
        fs::create_dir_all(&ledgers).map_err(|source| PersistenceError::Io {
            path: ledgers.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn keys_path(&self) -> PathBuf {
        self.root.join(KEYS_FILE)
    }

    pub fn clients_path(&self) -> PathBuf {
        self.root.join(CLIENTS_FILE)
    }

    /// Path of the ledger for one key version (`ledgers/v<N>.json`).
    pub fn ledger_path(&self, version: u64) -> PathBuf {
        self.root.join(LEDGER_DIR).join(format!("v{}.json", version))
    }
}

/// Read a JSON document, returning `None` if the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let contents = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&contents)
        .map(Some)
        .map_err(|source| PersistenceError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Atomically replace `path` with the pretty-printed JSON encoding of `value`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let encoded =
        serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    let tmp_path = path.with_extension("json.tmp");
    let io_err = |source| PersistenceError::Io {
        path: tmp_path.clone(),
        source,
    };

    let mut file = File::create(&tmp_path).map_err(io_err)?;
    file.write_all(&encoded).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}
