//! Bank-side input records and verification reports
//!
//! Input shapes match the JSON arrays produced by the banks' own systems:
//!
//! ```json
//! [{"email": "badguy@gmail.com", "risk": "MONEY_LAUNDERING", "role": "PERPETRATOR"}]
//! [{"id": "APP-1", "email": "BadGuy@gmail.com", "phone": "514-555-0000"}]
//! ```

use super::types::{ActorRole, ClientStatus, RiskType};
use crate::attribute::{normalize, AttributeKind, NormalizedAttribute};
use serde::{Deserialize, Serialize};

/// The matchable identity attributes of a record; any may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IdentityFields {
    fn raw(&self, kind: AttributeKind) -> Option<&str> {
        match kind {
            AttributeKind::Email => self.email.as_deref(),
            AttributeKind::Phone => self.phone.as_deref(),
            AttributeKind::NationalId => self.national_id.as_deref(),
            AttributeKind::Name => self.name.as_deref(),
        }
    }

    /// Normalized attributes, skipping missing and empty ones.
    pub fn normalized(&self) -> Vec<NormalizedAttribute> {
        AttributeKind::ALL
            .iter()
            .filter_map(|&kind| self.raw(kind).and_then(|raw| normalize(kind, raw)))
            .collect()
    }
}

/// A historical incident a bank contributes to the consortium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRecord {
    #[serde(flatten)]
    pub identity: IdentityFields,
    pub risk: RiskType,
    pub role: ActorRole,
}

/// A new applicant a bank wants screened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: String,
    #[serde(flatten)]
    pub identity: IdentityFields,
}

/// What the bank should do about a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedAction {
    /// Known perpetrator: decline
    Block,
    /// Known victim of identity theft: manual ID check, do not block
    VerifyIdentity,
    Review,
}

impl From<ActorRole> for RecommendedAction {
    fn from(role: ActorRole) -> Self {
        match role {
            ActorRole::Perpetrator => RecommendedAction::Block,
            ActorRole::Victim => RecommendedAction::VerifyIdentity,
            ActorRole::Suspect => RecommendedAction::Review,
        }
    }
}

/// Overall verdict for one applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verdict {
    Clean,
    Review,
    VictimProtection,
    HighRiskBlock,
}

/// One matched attribute of an applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAlert {
    pub kind: AttributeKind,
    pub risk: RiskType,
    pub role: ActorRole,
    pub action: RecommendedAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantReport {
    pub applicant_id: String,
    pub alerts: Vec<MatchAlert>,
    pub verdict: Verdict,
}

impl ApplicantReport {
    /// Build a report, ordering alerts by attribute kind.
    ///
    /// Any perpetrator match blocks; otherwise victim matches take priority
    /// over suspect matches.
    pub fn new(applicant_id: String, mut alerts: Vec<MatchAlert>) -> Self {
        alerts.sort_by_key(|alert| alert.kind);
        let verdict = alerts
            .iter()
            .map(|alert| match alert.role {
                ActorRole::Perpetrator => Verdict::HighRiskBlock,
                ActorRole::Victim => Verdict::VictimProtection,
                ActorRole::Suspect => Verdict::Review,
            })
            .max()
            .unwrap_or(Verdict::Clean);
        Self {
            applicant_id,
            alerts,
            verdict,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Outcome of screening a batch of applicants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Client status at the time of verification; `Outdated` means degraded confidence
    pub client_status: ClientStatus,
    pub key_version: Option<u64>,
    pub applicants: Vec<ApplicantReport>,
}

impl VerificationReport {
    pub fn is_degraded(&self) -> bool {
        matches!(self.client_status, ClientStatus::Outdated { .. })
    }

    pub fn flagged(&self) -> impl Iterator<Item = &ApplicantReport> {
        self.applicants.iter().filter(|report| !report.is_clean())
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionSummary {
    pub records: usize,
    /// Records with no usable attribute
    pub skipped_records: usize,
    pub submitted: usize,
    pub key_version: u64,
}
