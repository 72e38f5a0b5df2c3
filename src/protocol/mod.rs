//! Blind-matching protocol roles
//!
//! ```text
//! bank                                         consortium node
//! ----                                         ---------------
//! normalize -> map to field -> x
//! blind:   x^r                 ───────────►    sign: (x^r)^k, version
//! unblind: ((x^r)^k)^(r^-1)    ◄───────────
//!        = x^k  (opaque signature)
//! ingest / query signatures    ───────────►    active ledger (version-scoped)
//! ```
//!
//! The node never sees `x`, and the bank never sees `k`. For a fixed key
//! version every bank obtains the same signature for the same attribute.

pub mod client;
pub mod coordinator;
pub mod mock;
pub mod records;
pub mod traits;
pub mod types;

use crate::crypto::FieldError;
use crate::persistence::{KeyError, LedgerError, RegistryError};
use thiserror::Error;

pub use client::BankProtocolClient;
pub use coordinator::ProtocolCoordinator;
pub use mock::MockConsortiumNode;
pub use records::{
    Applicant, ApplicantReport, IdentityFields, IngestionRecord, IngestionSummary, MatchAlert,
    RecommendedAction, Verdict, VerificationReport,
};
pub use traits::ConsortiumNode;
pub use types::{
    ActorRole, ApiKey, ClientStatus, IngestEntry, IngestReceipt, LedgerEntry, QueryOutcome,
    RiskType, SignedElement,
};

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid API key")]
    InvalidCredential,

    #[error("{rejected} entries were signed under a retired key; server is on v{current_version}, re-run ingestion")]
    StaleEntries {
        rejected: usize,
        current_version: u64,
    },

    #[error("Server key rotated during the exchange; retry the batch")]
    RotatedDuringExchange,

    #[error("Blinded element must be a nonzero field element")]
    InvalidElement,

    #[error("Field arithmetic failed: {0}")]
    Field(#[from] FieldError),

    #[error("Key management failed: {0}")]
    Key(#[from] KeyError),

    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Client registry operation failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Active ledger v{ledger_version} does not match server key v{key_version}")]
    LedgerOutOfSync {
        key_version: u64,
        ledger_version: u64,
    },

    #[error("Server state lock poisoned")]
    LockPoisoned,
}
