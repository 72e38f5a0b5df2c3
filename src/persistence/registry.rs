//! Consortium client registry
//!
//! Tracks every member bank's API credential and the last key version it
//! synchronized against. The sync version only ever moves forward, and only
//! after a successful ingestion by that client.
//!
//! ## Staleness
//!
//! A client whose `last_sync_version` is behind the server's current version
//! is `Outdated`: whatever it ingested earlier sits in an archived ledger and
//! no longer matches anything. It must re-ingest before its verification
//! results can be trusted.
//!
//! ## Persisted Form
//!
//! ```json
//! { "3f9a...": { "name": "Bank A", "last_sync_version": 1 } }
//! ```

use super::store::{read_json, write_json_atomic, DataDir, PersistenceError};
use crate::crypto::{EntropySource, FieldError};
use crate::protocol::types::{ApiKey, ClientStatus};
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

/// Length of a freshly issued API key in random bytes (hex doubles it).
const API_KEY_BYTES: usize = 16;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown API key {0}")]
    UnknownCredential(String),

    #[error("Failed to generate API key: {0}")]
    RandomSource(#[from] FieldError),

    #[error("Failed to persist client registry: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Registry lock poisoned")]
    LockPoisoned,
}

/// Registration record for one consortium member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub name: String,
    pub last_sync_version: u64,
}

type Clients = BTreeMap<ApiKey, ClientRecord>;

/// Owner of client credentials and their sync state.
pub struct ClientRegistry {
    path: PathBuf,
    rng: Box<dyn EntropySource>,
    clients: Mutex<Clients>,
}

impl ClientRegistry {
    /// Load the registry from `dir` (empty if the file does not exist yet).
    pub fn load(dir: &DataDir) -> Result<Self, RegistryError> {
        Self::load_with(dir, Box::new(SystemRandom::new()))
    }

    pub fn load_with(dir: &DataDir, rng: Box<dyn EntropySource>) -> Result<Self, RegistryError> {
        let path = dir.clients_path();
        let clients = read_json::<Clients>(&path)?.unwrap_or_default();
        info!(clients = clients.len(), "loaded client registry");
        Ok(Self {
            path,
            rng,
            clients: Mutex::new(clients),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Clients>, RegistryError> {
        self.clients.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    /// Apply `mutate` to a copy of the registry, persist it, then commit.
    fn commit<T>(&self, mutate: impl FnOnce(&mut Clients) -> T) -> Result<T, RegistryError> {
        let mut clients = self.lock()?;
        let mut next = clients.clone();
        let out = mutate(&mut next);
        write_json_atomic(&self.path, &next)?;
        *clients = next;
        Ok(out)
    }

    /// Issue a new credential for `name` with `last_sync_version = 0`.
    pub fn register(&self, name: &str) -> Result<ApiKey, RegistryError> {
        let mut bytes = [0u8; API_KEY_BYTES];
        self.rng.fill(&mut bytes)?;
        let api_key = ApiKey::new(hex::encode(bytes));

        let record = ClientRecord {
            name: name.to_string(),
            last_sync_version: 0,
        };
        self.commit(|clients| clients.insert(api_key.clone(), record))?;

        info!(client = %api_key.fingerprint(), name, "registered consortium client");
        Ok(api_key)
    }

    /// Record that `api_key` has ingested against `version`.
    ///
    /// The stored version never decreases.
    pub fn record_sync(&self, api_key: &ApiKey, version: u64) -> Result<(), RegistryError> {
        if !self.lock()?.contains_key(api_key) {
            return Err(RegistryError::UnknownCredential(api_key.fingerprint()));
        }
        self.commit(|clients| {
            if let Some(record) = clients.get_mut(api_key) {
                record.last_sync_version = record.last_sync_version.max(version);
            }
        })
    }

    /// Staleness verdict for `api_key` against the server's current version.
    pub fn check_status(
        &self,
        api_key: &ApiKey,
        current_server_version: u64,
    ) -> Result<ClientStatus, RegistryError> {
        let clients = self.lock()?;
        let status = match clients.get(api_key) {
            None => ClientStatus::InvalidKey,
            Some(record) if record.last_sync_version < current_server_version => {
                ClientStatus::Outdated {
                    client_version: record.last_sync_version,
                    server_version: current_server_version,
                }
            }
            Some(_) => ClientStatus::Ok,
        };
        Ok(status)
    }

    pub fn get(&self, api_key: &ApiKey) -> Result<Option<ClientRecord>, RegistryError> {
        Ok(self.lock()?.get(api_key).cloned())
    }

    /// All registered clients as `(name, api_key)` pairs.
    pub fn list_clients(&self) -> Result<Vec<(String, ApiKey)>, RegistryError> {
        Ok(self
            .lock()?
            .iter()
            .map(|(key, record)| (record.name.clone(), key.clone()))
            .collect())
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
