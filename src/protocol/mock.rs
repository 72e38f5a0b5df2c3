//! Mock Consortium Node for Testing
//!
//! Provides MockConsortiumNode: an in-memory signer and ledger with a fixed
//! secret per version, which records every element it was asked to sign so
//! tests can assert what the server side actually observes.

use super::traits::ConsortiumNode;
use super::types::{
    ApiKey, ClientStatus, IngestEntry, IngestReceipt, LedgerEntry, QueryOutcome, SignedElement,
};
use super::{ProtocolError, ProtocolResult};
use crate::crypto::{power, FieldElement, OpaqueSignature};
use async_trait::async_trait;
use num_bigint::BigUint;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Mock consortium node for testing
#[derive(Clone, Default)]
pub struct MockConsortiumNode {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    version: u64,
    clients: HashMap<ApiKey, u64>,
    ledger: HashMap<OpaqueSignature, LedgerEntry>,
    signed_inputs: Vec<FieldElement>,
    ingested: Vec<IngestEntry>,
}

impl MockConsortiumNode {
    /// Create a mock node at key version 1
    pub fn new() -> Self {
        let node = Self::default();
        node.state.lock().unwrap().version = 1;
        node
    }

    /// Register a client at sync version 0
    pub fn add_client(&self, api_key: &ApiKey) {
        self.state
            .lock()
            .unwrap()
            .clients
            .insert(api_key.clone(), 0);
    }

    /// Deterministic per-version secret
    fn secret(version: u64) -> BigUint {
        BigUint::from(0x5eed_0000_0001_u64 + 2 * version)
    }

    /// Expected signature of a field element under the current version
    pub fn expected_signature(&self, element: &FieldElement) -> OpaqueSignature {
        let version = self.state.lock().unwrap().version;
        OpaqueSignature::from_element(&power(element, &Self::secret(version)))
    }

    /// Every element the node was asked to sign, in order
    pub fn signed_inputs(&self) -> Vec<FieldElement> {
        self.state.lock().unwrap().signed_inputs.clone()
    }

    /// Every entry accepted through ingestion, in order
    pub fn ingested(&self) -> Vec<IngestEntry> {
        self.state.lock().unwrap().ingested.clone()
    }
}

#[async_trait]
impl ConsortiumNode for MockConsortiumNode {
    async fn authenticate(&self, api_key: &ApiKey) -> ProtocolResult<ClientStatus> {
        let state = self.state.lock().unwrap();
        Ok(match state.clients.get(api_key) {
            None => ClientStatus::InvalidKey,
            Some(&synced) if synced < state.version => ClientStatus::Outdated {
                client_version: synced,
                server_version: state.version,
            },
            Some(_) => ClientStatus::Ok,
        })
    }

    async fn sign_blinded(&self, blinded: &FieldElement) -> ProtocolResult<SignedElement> {
        let mut state = self.state.lock().unwrap();
        state.signed_inputs.push(blinded.clone());
        Ok(SignedElement {
            signed: power(blinded, &Self::secret(state.version)),
            version: state.version,
        })
    }

    async fn ingest_batch(
        &self,
        api_key: &ApiKey,
        entries: Vec<IngestEntry>,
    ) -> ProtocolResult<IngestReceipt> {
        let mut state = self.state.lock().unwrap();
        if !state.clients.contains_key(api_key) {
            return Err(ProtocolError::InvalidCredential);
        }
        let version = state.version;
        let rejected = entries
            .iter()
            .filter(|entry| entry.key_version != version)
            .count();
        if rejected > 0 {
            return Err(ProtocolError::StaleEntries {
                rejected,
                current_version: version,
            });
        }
        let accepted = entries.len();
        for entry in entries {
            state.ledger.insert(
                entry.signature.clone(),
                LedgerEntry {
                    risk: entry.risk,
                    role: entry.role,
                    key_version: entry.key_version,
                },
            );
            state.ingested.push(entry);
        }
        state.clients.insert(api_key.clone(), version);
        Ok(IngestReceipt {
            accepted,
            key_version: version,
        })
    }

    async fn query_batch(
        &self,
        signatures: Vec<OpaqueSignature>,
    ) -> ProtocolResult<BTreeMap<OpaqueSignature, QueryOutcome>> {
        let state = self.state.lock().unwrap();
        Ok(signatures
            .into_iter()
            .map(|sig| {
                let outcome = state
                    .ledger
                    .get(&sig)
                    .cloned()
                    .map_or(QueryOutcome::Clean, QueryOutcome::Found);
                (sig, outcome)
            })
            .collect())
    }

    async fn rotate(&self) -> ProtocolResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.version += 1;
        state.ledger.clear();
        Ok(state.version)
    }
}
