//! Consortium Node Trait Abstraction
//!
//! The server call surface consumed by bank clients and operators. The
//! in-process [`ProtocolCoordinator`](super::coordinator::ProtocolCoordinator)
//! implements it directly; an RPC transport would implement it by forwarding
//! calls and imposing its own timeouts.

use super::types::{ApiKey, ClientStatus, IngestEntry, IngestReceipt, QueryOutcome, SignedElement};
use super::ProtocolResult;
use crate::crypto::{FieldElement, OpaqueSignature};
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
pub trait ConsortiumNode: Send + Sync {
    /// Staleness verdict for a credential against the current key version.
    async fn authenticate(&self, api_key: &ApiKey) -> ProtocolResult<ClientStatus>;

    /// Raise a blinded element to the active secret.
    ///
    /// Returns the signed element together with the version it was signed under.
    async fn sign_blinded(&self, blinded: &FieldElement) -> ProtocolResult<SignedElement>;

    /// Write a batch of signatures into the active ledger and mark the
    /// client synchronized.
    async fn ingest_batch(
        &self,
        api_key: &ApiKey,
        entries: Vec<IngestEntry>,
    ) -> ProtocolResult<IngestReceipt>;

    /// Look signatures up in the active ledger only.
    async fn query_batch(
        &self,
        signatures: Vec<OpaqueSignature>,
    ) -> ProtocolResult<BTreeMap<OpaqueSignature, QueryOutcome>>;

    /// Move to a new key version with a fresh, empty ledger. Irreversible.
    async fn rotate(&self) -> ProtocolResult<u64>;
}
