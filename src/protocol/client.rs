//! Bank-side protocol client
//!
//! A `BankProtocolClient` is one session of a consortium member. It owns a
//! single blinding factor for its whole lifetime, reuses it for every
//! attribute, and drops (zeroizes) it with the session. The factor is never
//! persisted or transmitted.
//!
//! Each attribute moves through a fixed sequence of steps:
//!
//! ```text
//! Normalized --map--> x --blind--> x^r --sign--> (x^r)^k, v --unblind--> x^k
//! ```
//!
//! Attributes share no mutable state, so every exchange of a batch is driven
//! concurrently.

use super::records::{
    Applicant, ApplicantReport, IngestionRecord, IngestionSummary, MatchAlert, RecommendedAction,
    VerificationReport,
};
use super::traits::ConsortiumNode;
use super::types::{ApiKey, ClientStatus, IngestEntry, QueryOutcome};
use super::{ProtocolError, ProtocolResult};
use crate::attribute::{AttributeKind, NormalizedAttribute};
use crate::crypto::{BlindingFactor, OpaqueSignature};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroize;

/// Output of one blind/sign/unblind exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedAttribute {
    pub kind: AttributeKind,
    pub signature: OpaqueSignature,
    /// Key version the signature is bound to
    pub key_version: u64,
}

/// The client role of the protocol, bound to one API key and one session.
pub struct BankProtocolClient<N: ConsortiumNode + ?Sized> {
    api_key: ApiKey,
    node: Arc<N>,
    blinding: BlindingFactor,
}

impl<N: ConsortiumNode + ?Sized> BankProtocolClient<N> {
    /// Start a session with a freshly generated blinding factor.
    pub fn new(api_key: ApiKey, node: Arc<N>) -> ProtocolResult<Self> {
        let blinding = BlindingFactor::generate()?;
        Ok(Self::with_blinding_factor(api_key, node, blinding))
    }

    pub fn with_blinding_factor(api_key: ApiKey, node: Arc<N>, blinding: BlindingFactor) -> Self {
        Self {
            api_key,
            node,
            blinding,
        }
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Obtain the opaque signature of one normalized attribute.
    pub async fn evaluate(
        &self,
        attribute: &NormalizedAttribute,
    ) -> ProtocolResult<EvaluatedAttribute> {
        let element = attribute.to_field();
        let blinded = self.blinding.blind(&element);
        let response = self.node.sign_blinded(&blinded).await?;
        let unblinded = self.blinding.unblind(&response.signed);

        Ok(EvaluatedAttribute {
            kind: attribute.kind(),
            signature: OpaqueSignature::from_element(&unblinded),
            key_version: response.version,
        })
    }

    async fn evaluate_all(
        &self,
        attributes: &[NormalizedAttribute],
    ) -> ProtocolResult<Vec<EvaluatedAttribute>> {
        try_join_all(attributes.iter().map(|attr| self.evaluate(attr))).await
    }

    /// Sign every attribute of every record and submit them as one batch.
    ///
    /// Records without any usable attribute are skipped.
    pub async fn process_ingestion(
        &self,
        records: &[IngestionRecord],
    ) -> ProtocolResult<IngestionSummary> {
        let status = self.node.authenticate(&self.api_key).await?;
        if status == ClientStatus::InvalidKey {
            return Err(ProtocolError::InvalidCredential);
        }

        info!(records = records.len(), "processing records for ingestion");

        let mut pending = Vec::new();
        let mut skipped_records = 0;
        for record in records {
            let attributes = record.identity.normalized();
            if attributes.is_empty() {
                skipped_records += 1;
                continue;
            }
            pending.extend(attributes.into_iter().map(|attr| (attr, record)));
        }

        let attributes: Vec<_> = pending.iter().map(|(attr, _)| attr.clone()).collect();
        let evaluated = self.evaluate_all(&attributes).await?;
        let key_version = single_version(&evaluated)?;

        let entries: Vec<IngestEntry> = evaluated
            .into_iter()
            .zip(pending.iter())
            .map(|(eval, (_, record))| IngestEntry {
                signature: eval.signature,
                risk: record.risk,
                role: record.role,
                key_version: eval.key_version,
            })
            .collect();
        let submitted = entries.len();

        let receipt = self.node.ingest_batch(&self.api_key, entries).await?;
        info!(
            submitted,
            skipped_records,
            version = receipt.key_version,
            "ingestion complete; sync status updated"
        );

        Ok(IngestionSummary {
            records: records.len(),
            skipped_records,
            submitted,
            key_version: key_version.unwrap_or(receipt.key_version),
        })
    }

    /// Screen applicants against the consortium ledger.
    ///
    /// An outdated session still runs, but the report is marked degraded.
    pub async fn process_verification(
        &self,
        applicants: &[Applicant],
    ) -> ProtocolResult<VerificationReport> {
        let client_status = self.node.authenticate(&self.api_key).await?;
        match client_status {
            ClientStatus::InvalidKey => return Err(ProtocolError::InvalidCredential),
            ClientStatus::Outdated {
                client_version,
                server_version,
            } => warn!(
                client_version,
                server_version,
                "client is outdated; re-run ingestion, verification results may be incomplete"
            ),
            ClientStatus::Ok => {}
        }

        info!(applicants = applicants.len(), "verifying applicants");

        // Several applicants may share an attribute value, so the reverse
        // index maps each signature to every (applicant, kind) that produced it.
        let mut attributes = Vec::new();
        let mut origins = Vec::new();
        for (index, applicant) in applicants.iter().enumerate() {
            for attr in applicant.identity.normalized() {
                origins.push((index, attr.kind()));
                attributes.push(attr);
            }
        }

        let evaluated = self.evaluate_all(&attributes).await?;
        let key_version = single_version(&evaluated)?;

        let mut reverse_index: BTreeMap<OpaqueSignature, Vec<(usize, AttributeKind)>> =
            BTreeMap::new();
        for (eval, origin) in evaluated.into_iter().zip(origins) {
            reverse_index.entry(eval.signature).or_default().push(origin);
        }

        let results = self
            .node
            .query_batch(reverse_index.keys().cloned().collect())
            .await?;

        let mut alerts: Vec<Vec<MatchAlert>> = vec![Vec::new(); applicants.len()];
        for (signature, origins) in &reverse_index {
            if let Some(QueryOutcome::Found(entry)) = results.get(signature) {
                for &(index, kind) in origins {
                    alerts[index].push(MatchAlert {
                        kind,
                        risk: entry.risk,
                        role: entry.role,
                        action: RecommendedAction::from(entry.role),
                    });
                }
            }
        }

        let reports: Vec<ApplicantReport> = applicants
            .iter()
            .zip(alerts)
            .map(|(applicant, alerts)| ApplicantReport::new(applicant.id.clone(), alerts))
            .collect();
        info!(
            flagged = reports.iter().filter(|r| !r.is_clean()).count(),
            "verification complete"
        );

        Ok(VerificationReport {
            client_status,
            key_version,
            applicants: reports,
        })
    }
}

/// The common key version of a batch, or `None` for an empty batch.
///
/// Mixed versions mean the server rotated mid-batch.
fn single_version(evaluated: &[EvaluatedAttribute]) -> ProtocolResult<Option<u64>> {
    let mut versions = evaluated.iter().map(|eval| eval.key_version);
    let first = versions.next();
    match first {
        Some(v) if versions.any(|other| other != v) => Err(ProtocolError::RotatedDuringExchange),
        _ => Ok(first),
    }
}

impl<N: ConsortiumNode + ?Sized> Drop for BankProtocolClient<N> {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}
