//! Consortium node: signing, ingestion, lookup and key rotation
//!
//! The coordinator composes the three server stores:
//!
//! - [`KeyManager`] behind an `RwLock`. Signing, ingestion and queries hold a
//!   read lock; rotation takes the write lock, so no signature, write or
//!   lookup can straddle a version change.
//! - [`LedgerStore`], whose active ledger always follows the key manager's
//!   current version. Its own mutex serializes ledger writes. Ingestion and
//!   queries refuse to run if the two ever disagree.
//! - [`ClientRegistry`], whose mutex serializes sync updates.
//!
//! ## Ingestion Policy
//!
//! - Unknown credentials are refused.
//! - Outdated clients may ingest; ingestion is how they resynchronize.
//! - Any entry signed under a version other than the current one rejects the
//!   whole batch. Nothing is written and the client's sync version is not
//!   advanced.
//! - Entries are committed to the ledger before the client's sync version is
//!   recorded. If recording fails the entries stay live and the client still
//!   reads as outdated; re-running the same batch is idempotent and clears it.
//!
//! ## Rotation
//!
//! The new secret is drawn and the next ledger file opened before anything is
//! committed. Only then is the key state persisted and the ledger swapped, so
//! a failure at any step before the key write leaves the node on the old
//! version with its old ledger.
//!
//! The secret and the blinded inputs are never logged.

use super::traits::ConsortiumNode;
use super::types::{
    ApiKey, ClientStatus, IngestEntry, IngestReceipt, LedgerEntry, QueryOutcome, SignedElement,
};
use super::{ProtocolError, ProtocolResult};
use crate::crypto::{power, FieldElement, OpaqueSignature};
use crate::persistence::{ClientRecord, ClientRegistry, DataDir, KeyManager, LedgerStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// The server role of the protocol.
#[derive(Debug)]
pub struct ProtocolCoordinator {
    keys: RwLock<KeyManager>,
    ledger: LedgerStore,
    registry: ClientRegistry,
}

impl ProtocolCoordinator {
    /// Load (or initialize) all server state from a data directory.
    pub fn open(dir: DataDir) -> ProtocolResult<Self> {
        let keys = KeyManager::initialize_or_load(&dir)?;
        let registry = ClientRegistry::load(&dir)?;
        let ledger = LedgerStore::open(dir, keys.current_version())?;
        Ok(Self::from_parts(keys, ledger, registry))
    }

    /// Assemble a coordinator from already-opened stores.
    ///
    /// The ledger must be open at the key manager's current version.
    pub fn from_parts(keys: KeyManager, ledger: LedgerStore, registry: ClientRegistry) -> Self {
        Self {
            keys: RwLock::new(keys),
            ledger,
            registry,
        }
    }

    fn read_keys(&self) -> ProtocolResult<RwLockReadGuard<'_, KeyManager>> {
        self.keys.read().map_err(|_| ProtocolError::LockPoisoned)
    }

    fn write_keys(&self) -> ProtocolResult<RwLockWriteGuard<'_, KeyManager>> {
        self.keys.write().map_err(|_| ProtocolError::LockPoisoned)
    }

    /// Current key version, provided the active ledger belongs to it.
    fn bound_version(&self, keys: &KeyManager) -> ProtocolResult<u64> {
        let key_version = keys.current_version();
        let ledger_version = self.ledger.active_version()?;
        if key_version != ledger_version {
            warn!(key_version, ledger_version, "ledger out of sync with server key");
            return Err(ProtocolError::LedgerOutOfSync {
                key_version,
                ledger_version,
            });
        }
        Ok(key_version)
    }

    pub fn current_version(&self) -> ProtocolResult<u64> {
        Ok(self.read_keys()?.current_version())
    }

    /// Issue a credential for a new consortium member.
    pub fn register_client(&self, name: &str) -> ProtocolResult<ApiKey> {
        Ok(self.registry.register(name)?)
    }

    /// All registered members as `(name, api_key)` pairs.
    pub fn list_clients(&self) -> ProtocolResult<Vec<(String, ApiKey)>> {
        Ok(self.registry.list_clients()?)
    }

    pub fn client(&self, api_key: &ApiKey) -> ProtocolResult<Option<ClientRecord>> {
        Ok(self.registry.get(api_key)?)
    }

    /// Number of entries in the active ledger.
    pub fn active_ledger_len(&self) -> ProtocolResult<usize> {
        Ok(self.ledger.len()?)
    }
}

#[async_trait]
impl ConsortiumNode for ProtocolCoordinator {
    async fn authenticate(&self, api_key: &ApiKey) -> ProtocolResult<ClientStatus> {
        let version = self.read_keys()?.current_version();
        let status = self.registry.check_status(api_key, version)?;
        debug!(client = %api_key.fingerprint(), ?status, "authenticated client");
        Ok(status)
    }

    async fn sign_blinded(&self, blinded: &FieldElement) -> ProtocolResult<SignedElement> {
        if blinded.is_zero() {
            return Err(ProtocolError::InvalidElement);
        }

        let keys = self.read_keys()?;
        let secret = keys.active_secret()?;
        Ok(SignedElement {
            signed: power(blinded, secret.exponent()),
            version: keys.current_version(),
        })
    }

    async fn ingest_batch(
        &self,
        api_key: &ApiKey,
        entries: Vec<IngestEntry>,
    ) -> ProtocolResult<IngestReceipt> {
        let keys = self.read_keys()?;
        let current = self.bound_version(&keys)?;

        match self.registry.check_status(api_key, current)? {
            ClientStatus::InvalidKey => {
                warn!(client = %api_key.fingerprint(), "ingestion refused: unknown API key");
                return Err(ProtocolError::InvalidCredential);
            }
            ClientStatus::Outdated { client_version, .. } => {
                info!(
                    client = %api_key.fingerprint(),
                    from = client_version,
                    to = current,
                    "outdated client re-ingesting"
                );
            }
            ClientStatus::Ok => {}
        }

        let rejected = entries
            .iter()
            .filter(|entry| entry.key_version != current)
            .count();
        if rejected > 0 {
            warn!(
                client = %api_key.fingerprint(),
                rejected,
                version = current,
                "ingestion refused: entries signed under a retired key"
            );
            return Err(ProtocolError::StaleEntries {
                rejected,
                current_version: current,
            });
        }

        let batch = entries
            .into_iter()
            .map(|entry| {
                (
                    entry.signature,
                    LedgerEntry {
                        risk: entry.risk,
                        role: entry.role,
                        key_version: entry.key_version,
                    },
                )
            })
            .collect();
        let accepted = self.ledger.upsert_batch(batch)?;
        self.registry.record_sync(api_key, current)?;

        info!(
            client = %api_key.fingerprint(),
            entries = accepted,
            version = current,
            "ingested batch"
        );
        Ok(IngestReceipt {
            accepted,
            key_version: current,
        })
    }

    async fn query_batch(
        &self,
        signatures: Vec<OpaqueSignature>,
    ) -> ProtocolResult<BTreeMap<OpaqueSignature, QueryOutcome>> {
        let keys = self.read_keys()?;
        let version = self.bound_version(&keys)?;
        let found = self.ledger.lookup_many(&signatures)?;

        let results: BTreeMap<_, _> = signatures
            .into_iter()
            .zip(found)
            .map(|(signature, entry)| {
                let outcome = entry.map_or(QueryOutcome::Clean, QueryOutcome::Found);
                (signature, outcome)
            })
            .collect();

        let matches = results
            .values()
            .filter(|outcome| matches!(outcome, QueryOutcome::Found(_)))
            .count();
        info!(
            queries = results.len(),
            matches,
            version,
            "processed batch query"
        );
        Ok(results)
    }

    async fn rotate(&self) -> ProtocolResult<u64> {
        let mut keys = self.write_keys()?;
        let pending = keys.prepare_rotation()?;
        let next_ledger = self.ledger.prepare(pending.version())?;
        let version = keys.commit_rotation(pending)?;
        self.ledger.install(next_ledger)?;
        info!(version, "rotated to new key version; previous ledger archived");
        Ok(version)
    }
}
