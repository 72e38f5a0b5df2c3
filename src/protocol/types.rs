//! Value types exchanged between bank clients and the consortium node

use crate::crypto::{FieldElement, OpaqueSignature};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Nature of the reported incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskType {
    /// Non-payment
    CreditDefault,
    /// Stolen credentials
    IdentityTheft,
    MoneyLaundering,
    /// Fabricated profile
    SyntheticId,
}

/// Role the attribute's owner played in the incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Perpetrator,
    Victim,
    /// Unconfirmed involvement
    Suspect,
}

impl fmt::Display for RiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RiskType::CreditDefault => "CREDIT_DEFAULT",
            RiskType::IdentityTheft => "IDENTITY_THEFT",
            RiskType::MoneyLaundering => "MONEY_LAUNDERING",
            RiskType::SyntheticId => "SYNTHETIC_ID",
        };
        f.write_str(tag)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ActorRole::Perpetrator => "PERPETRATOR",
            ActorRole::Victim => "VICTIM",
            ActorRole::Suspect => "SUSPECT",
        };
        f.write_str(tag)
    }
}

/// Stored risk metadata for one signature in a versioned ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub risk: RiskType,
    pub role: ActorRole,
    pub key_version: u64,
}

/// One ingestion item as submitted by a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestEntry {
    pub signature: OpaqueSignature,
    pub risk: RiskType,
    pub role: ActorRole,
    pub key_version: u64,
}

/// Server answer to a blinded signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedElement {
    pub signed: FieldElement,
    /// Key version the element was signed under
    pub version: u64,
}

/// Per-signature answer to a batch query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryOutcome {
    Found(LedgerEntry),
    Clean,
}

/// Acknowledgement of an accepted ingestion batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReceipt {
    pub accepted: usize,
    pub key_version: u64,
}

/// Staleness verdict for a client credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Ok,
    /// Client last ingested under an older key version; its data is archived.
    Outdated {
        client_version: u64,
        server_version: u64,
    },
    InvalidKey,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientStatus::Ok => write!(f, "OK: client is synchronized"),
            ClientStatus::Outdated {
                client_version,
                server_version,
            } => write!(
                f,
                "OUTDATED: client is on v{}, server is on v{}; previous data is archived",
                client_version, server_version
            ),
            ClientStatus::InvalidKey => write!(f, "INVALID_KEY: unknown API key"),
        }
    }
}

/// API credential issued to a consortium member.
///
/// `Debug` and logs only ever show the fingerprint.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Zeroize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, safe to log.
    pub fn fingerprint(&self) -> String {
        self.0.chars().take(8).collect()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}…)", self.fingerprint())
    }
}
