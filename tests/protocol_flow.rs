//! Integration tests for the blind-matching protocol.
//!
//! These tests drive real bank sessions against a real consortium node
//! backed by a temporary data directory:
//! - Two banks share a fraud record without sharing the raw attribute
//! - Sessions with different blinding factors agree on signatures
//! - Key rotation severs matchability and marks members outdated
//! - Entries signed under a retired key are refused
//! - Node state survives a restart

use num_bigint::BigUint;
use silentmatch::attribute::{normalize, AttributeKind};
use silentmatch::crypto::{power, BlindingFactor, FieldElement};
use silentmatch::persistence::DataDir;
use silentmatch::protocol::{
    ActorRole, ApiKey, Applicant, BankProtocolClient, ClientStatus, ConsortiumNode,
    IdentityFields, IngestEntry, IngestionRecord, ProtocolCoordinator, ProtocolError,
    QueryOutcome, RecommendedAction, RiskType, Verdict,
};
use std::sync::Arc;
use tempfile::TempDir;

// === Test Fixtures ===

struct Consortium {
    _dir: TempDir,
    node: Arc<ProtocolCoordinator>,
}

impl Consortium {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let node = ProtocolCoordinator::open(DataDir::open(dir.path()).unwrap()).unwrap();
        Self {
            _dir: dir,
            node: Arc::new(node),
        }
    }

    fn member(&self, name: &str) -> ApiKey {
        self.node.register_client(name).unwrap()
    }

    fn session(&self, api_key: &ApiKey) -> BankProtocolClient<ProtocolCoordinator> {
        BankProtocolClient::new(api_key.clone(), Arc::clone(&self.node)).unwrap()
    }
}

fn email_record(email: &str, risk: RiskType, role: ActorRole) -> IngestionRecord {
    IngestionRecord {
        identity: IdentityFields {
            email: Some(email.to_string()),
            ..Default::default()
        },
        risk,
        role,
    }
}

fn email_applicant(id: &str, email: &str) -> Applicant {
    Applicant {
        id: id.to_string(),
        identity: IdentityFields {
            email: Some(email.to_string()),
            ..Default::default()
        },
    }
}

// === Protocol Properties ===

#[tokio::test]
async fn test_end_to_end_cross_bank_match() {
    let consortium = Consortium::new();
    let bank_a = consortium.member("Bank A");
    let bank_b = consortium.member("Bank B");

    consortium
        .session(&bank_a)
        .process_ingestion(&[email_record(
            "badguy@gmail.com",
            RiskType::MoneyLaundering,
            ActorRole::Perpetrator,
        )])
        .await
        .unwrap();

    let report = consortium
        .session(&bank_b)
        .process_verification(&[
            email_applicant("APP-1", "BadGuy@gmail.com"),
            email_applicant("APP-2", "nice.person@example.org"),
        ])
        .await
        .unwrap();

    let flagged = &report.applicants[0];
    assert_eq!(flagged.applicant_id, "APP-1");
    assert_eq!(flagged.verdict, Verdict::HighRiskBlock);
    assert_eq!(flagged.alerts.len(), 1);
    assert_eq!(flagged.alerts[0].role, ActorRole::Perpetrator);
    assert_eq!(flagged.alerts[0].risk, RiskType::MoneyLaundering);
    assert_eq!(flagged.alerts[0].action, RecommendedAction::Block);

    let clean = &report.applicants[1];
    assert_eq!(clean.verdict, Verdict::Clean);
    assert!(clean.is_clean());
}

#[tokio::test]
async fn test_victim_match_recommends_identity_check() {
    let consortium = Consortium::new();
    let bank = consortium.member("Bank A");
    let session = consortium.session(&bank);

    session
        .process_ingestion(&[IngestionRecord {
            identity: IdentityFields {
                phone: Some("(514) 555-0000".to_string()),
                ..Default::default()
            },
            risk: RiskType::IdentityTheft,
            role: ActorRole::Victim,
        }])
        .await
        .unwrap();

    let report = session
        .process_verification(&[Applicant {
            id: "APP-9".to_string(),
            identity: IdentityFields {
                phone: Some("514-555-0000".to_string()),
                ..Default::default()
            },
        }])
        .await
        .unwrap();

    let applicant = &report.applicants[0];
    assert_eq!(applicant.verdict, Verdict::VictimProtection);
    assert_eq!(applicant.alerts[0].kind, AttributeKind::Phone);
    assert_eq!(applicant.alerts[0].action, RecommendedAction::VerifyIdentity);
}

#[tokio::test]
async fn test_signatures_are_deterministic_across_sessions() {
    let consortium = Consortium::new();
    let bank = consortium.member("Bank A");
    let attribute = normalize(AttributeKind::Email, "someone@example.com").unwrap();

    let first = consortium.session(&bank).evaluate(&attribute).await.unwrap();
    let second = consortium.session(&bank).evaluate(&attribute).await.unwrap();

    assert_eq!(first.signature, second.signature);
    assert_eq!(first.key_version, second.key_version);
}

#[tokio::test]
async fn test_round_trip_matches_direct_power() {
    let consortium = Consortium::new();
    let x = FieldElement::new(BigUint::from(123_456_789u64));
    let blinding = BlindingFactor::from_exponent(&BigUint::from(65_537u32)).unwrap();

    let signed = consortium
        .node
        .sign_blinded(&blinding.blind(&x))
        .await
        .unwrap();
    let unblinded = blinding.unblind(&signed.signed);

    // Signing x directly must agree with the blinded exchange.
    let direct = consortium.node.sign_blinded(&x).await.unwrap();
    assert_eq!(unblinded, direct.signed);
}

#[tokio::test]
async fn test_version_separation() {
    let consortium = Consortium::new();
    let bank = consortium.member("Bank A");
    let attribute = normalize(AttributeKind::Email, "someone@example.com").unwrap();

    let before = consortium.session(&bank).evaluate(&attribute).await.unwrap();
    consortium.node.rotate().await.unwrap();
    let after = consortium.session(&bank).evaluate(&attribute).await.unwrap();

    assert_eq!(before.key_version, 1);
    assert_eq!(after.key_version, 2);
    assert_ne!(before.signature, after.signature);
}

#[tokio::test]
async fn test_rotation_invalidates_previous_matches() {
    let consortium = Consortium::new();
    let bank = consortium.member("Bank A");
    let record = email_record(
        "badguy@gmail.com",
        RiskType::MoneyLaundering,
        ActorRole::Perpetrator,
    );
    let applicant = email_applicant("APP-1", "badguy@gmail.com");

    consortium
        .session(&bank)
        .process_ingestion(&[record])
        .await
        .unwrap();
    let before = consortium
        .session(&bank)
        .process_verification(&[applicant.clone()])
        .await
        .unwrap();
    assert_eq!(before.flagged().count(), 1);

    consortium.node.rotate().await.unwrap();

    let after = consortium
        .session(&bank)
        .process_verification(&[applicant])
        .await
        .unwrap();
    assert_eq!(after.key_version, Some(2));
    assert_eq!(after.applicants[0].verdict, Verdict::Clean);
    assert!(after.is_degraded());
}

#[tokio::test]
async fn test_staleness_detection_after_rotation() {
    let consortium = Consortium::new();
    let bank = consortium.member("Bank A");

    consortium
        .session(&bank)
        .process_ingestion(&[email_record(
            "a@b.com",
            RiskType::CreditDefault,
            ActorRole::Suspect,
        )])
        .await
        .unwrap();
    assert_eq!(
        consortium.node.authenticate(&bank).await.unwrap(),
        ClientStatus::Ok
    );

    consortium.node.rotate().await.unwrap();

    assert_eq!(
        consortium.node.authenticate(&bank).await.unwrap(),
        ClientStatus::Outdated {
            client_version: 1,
            server_version: 2
        }
    );

    // Re-ingesting resynchronizes the member.
    consortium
        .session(&bank)
        .process_ingestion(&[email_record(
            "a@b.com",
            RiskType::CreditDefault,
            ActorRole::Suspect,
        )])
        .await
        .unwrap();
    assert_eq!(
        consortium.node.authenticate(&bank).await.unwrap(),
        ClientStatus::Ok
    );
}

#[tokio::test]
async fn test_retired_version_entries_are_refused() {
    let consortium = Consortium::new();
    let bank = consortium.member("Bank A");
    let attribute = normalize(AttributeKind::NationalId, "123-456-789").unwrap();
    let stale = consortium.session(&bank).evaluate(&attribute).await.unwrap();

    consortium.node.rotate().await.unwrap();

    let result = consortium
        .node
        .ingest_batch(
            &bank,
            vec![IngestEntry {
                signature: stale.signature.clone(),
                risk: RiskType::SyntheticId,
                role: ActorRole::Perpetrator,
                key_version: stale.key_version,
            }],
        )
        .await;

    assert!(matches!(
        result,
        Err(ProtocolError::StaleEntries {
            rejected: 1,
            current_version: 2
        })
    ));
    assert_eq!(consortium.node.active_ledger_len().unwrap(), 0);
    let outcome = consortium
        .node
        .query_batch(vec![stale.signature.clone()])
        .await
        .unwrap();
    assert_eq!(outcome[&stale.signature], QueryOutcome::Clean);
}

#[tokio::test]
async fn test_unknown_member_is_refused() {
    let consortium = Consortium::new();
    let stranger = ApiKey::new("00000000000000000000000000000000");

    assert_eq!(
        consortium.node.authenticate(&stranger).await.unwrap(),
        ClientStatus::InvalidKey
    );
    let result = consortium
        .session(&stranger)
        .process_verification(&[email_applicant("APP-1", "a@b.com")])
        .await;
    assert!(matches!(result, Err(ProtocolError::InvalidCredential)));
}

#[test]
fn test_normalization_examples() {
    assert_eq!(
        normalize(AttributeKind::Phone, "514-555-0000"),
        normalize(AttributeKind::Phone, "5145550000")
    );
    assert_eq!(
        normalize(AttributeKind::Email, "Alice@Gmail.com "),
        normalize(AttributeKind::Email, "alice@gmail.com")
    );

    let canonical = normalize(AttributeKind::Name, "  Alice   SMITH ").unwrap();
    assert_eq!(
        normalize(AttributeKind::Name, canonical.canonical()),
        Some(canonical)
    );
}

#[test]
fn test_cross_kind_non_collision() {
    let phone = normalize(AttributeKind::Phone, "123456789").unwrap();
    let national_id = normalize(AttributeKind::NationalId, "123456789").unwrap();

    assert_eq!(phone.canonical(), national_id.canonical());
    assert_ne!(phone.to_field(), national_id.to_field());
}

#[test]
fn test_round_trip_with_known_secret() {
    let x = normalize(AttributeKind::Email, "x@y.z").unwrap().to_field();
    let secret = BigUint::from(1_000_003u32);
    let blinding = BlindingFactor::generate().unwrap();

    let signed = power(&blinding.blind(&x), &secret);
    assert_eq!(blinding.unblind(&signed), power(&x, &secret));
}

// === Persistence ===

#[tokio::test]
async fn test_node_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let attribute = normalize(AttributeKind::Email, "badguy@gmail.com").unwrap();

    let (bank, signature) = {
        let node = Arc::new(ProtocolCoordinator::open(DataDir::open(dir.path()).unwrap()).unwrap());
        let bank = node.register_client("Bank A").unwrap();
        let session = BankProtocolClient::new(bank.clone(), Arc::clone(&node)).unwrap();
        session
            .process_ingestion(&[email_record(
                "badguy@gmail.com",
                RiskType::MoneyLaundering,
                ActorRole::Perpetrator,
            )])
            .await
            .unwrap();
        let signature = session.evaluate(&attribute).await.unwrap().signature;
        (bank, signature)
    };

    let node = Arc::new(ProtocolCoordinator::open(DataDir::open(dir.path()).unwrap()).unwrap());
    assert_eq!(node.current_version().unwrap(), 1);
    assert_eq!(node.authenticate(&bank).await.unwrap(), ClientStatus::Ok);

    let session = BankProtocolClient::new(bank, Arc::clone(&node)).unwrap();
    assert_eq!(session.evaluate(&attribute).await.unwrap().signature, signature);

    let outcome = node.query_batch(vec![signature.clone()]).await.unwrap();
    assert!(matches!(outcome[&signature], QueryOutcome::Found(_)));
}
