//! Verification round-trip tests: anchored artifacts verify as Matched, the
//! wrong identity reports Mismatch with the recorded endorser, unknown bytes
//! report NotFound, and label indirection resolves before comparison.

use std::time::Duration;

use provenance_anchor::mock::{MockPublisher, MockResolver, PublishFailure};
use provenance_anchor::{
    AnchorPipeline, CredentialProvider, Ed25519Credential, Identity, ProvenanceRegistry,
    RetryPolicy,
    VerificationOutcome, Verifier, VerifyError,
};
use tempfile::TempDir;

const NOW: u64 = 1_700_000_000;

fn registry() -> ProvenanceRegistry {
    ProvenanceRegistry::with_clock(|| NOW)
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 1,
        retry_delay: Duration::ZERO,
        attempt_timeout: Duration::from_secs(5),
    }
}

#[test]
fn test_anchor_then_verify_round_trip() {
    let registry = registry();
    let credential = Ed25519Credential::generate();
    let publisher = MockPublisher::new();
    let identity = credential.identity().unwrap();

    AnchorPipeline::new(&registry, &credential, &publisher)
        .with_policy(fast_policy())
        .run(b"release artifact")
        .unwrap();

    let verifier = Verifier::new(&registry);

    // Committed bytes + committing identity
    assert!(verifier.verify(b"release artifact", &identity).unwrap().is_matched());

    // Committed bytes + any other identity
    let other = Identity::from_bytes([0x42; 32]);
    assert_eq!(
        verifier.verify(b"release artifact", &other).unwrap(),
        VerificationOutcome::Mismatch { recorded: identity }
    );

    // Other bytes + committing identity
    assert_eq!(
        verifier.verify(b"some other artifact", &identity).unwrap(),
        VerificationOutcome::NotFound
    );
}

#[test]
fn test_degraded_publish_still_verifies_matched() {
    let registry = registry();
    let credential = Ed25519Credential::generate();
    let publisher = MockPublisher::new().with_failure(PublishFailure::transient("gateway down"));
    let identity = credential.identity().unwrap();

    let outcome = AnchorPipeline::new(&registry, &credential, &publisher)
        .with_policy(fast_policy())
        .run(b"unpublished artifact")
        .unwrap();
    assert!(!outcome.published);

    // Retrievability loss does not weaken the provenance claim
    let outcome = Verifier::new(&registry)
        .verify(b"unpublished artifact", &identity)
        .unwrap();
    assert!(outcome.is_matched());
}

#[test]
fn test_verify_by_label() {
    let registry = registry();
    let credential = Ed25519Credential::generate();
    let publisher = MockPublisher::new();
    let identity = credential.identity().unwrap();

    AnchorPipeline::new(&registry, &credential, &publisher)
        .with_policy(fast_policy())
        .run(b"labeled artifact")
        .unwrap();

    let resolver = MockResolver::new()
        .with_label("publisher.example", identity)
        .with_label("impostor.example", Identity::from_bytes([9u8; 32]));
    let verifier = Verifier::new(&registry);

    assert!(verifier
        .verify_label(b"labeled artifact", "publisher.example", &resolver)
        .unwrap()
        .is_matched());

    assert!(matches!(
        verifier
            .verify_label(b"labeled artifact", "impostor.example", &resolver)
            .unwrap(),
        VerificationOutcome::Mismatch { .. }
    ));

    // Resolution failure is its own error kind, not a NotFound outcome
    let err = verifier
        .verify_label(b"labeled artifact", "unknown.example", &resolver)
        .unwrap_err();
    assert!(matches!(err, VerifyError::Resolution(_)));
}

#[test]
fn test_report_consistent_under_concurrent_commits() {
    use std::sync::Arc;
    use std::thread;

    let registry = Arc::new(registry());
    let endorser = Identity::from_bytes([7u8; 32]);

    // Commit artifacts while reports are being generated; every report must
    // be internally consistent: NotFound carries no record fields, any other
    // outcome carries them
    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..50u8 {
                let fp = provenance_anchor::fingerprint::fingerprint(&[i]).unwrap();
                registry
                    .put(fp, NOW, vec![1], endorser, format!("cas://{}", i))
                    .unwrap();
            }
        })
    };

    let verifier = Verifier::new(&registry);
    for _ in 0..200 {
        for i in 0..50u8 {
            let report = verifier.report(&[i], &endorser).unwrap();
            match report.outcome {
                VerificationOutcome::NotFound => {
                    assert!(report.recorded_timestamp.is_none());
                    assert!(report.storage_locator.is_none());
                }
                _ => {
                    assert!(report.recorded_timestamp.is_some());
                    assert!(report.storage_locator.is_some());
                }
            }
        }
    }

    writer.join().unwrap();
}

#[test]
fn test_verification_report_file() {
    let dir = TempDir::new().unwrap();
    let registry = registry();
    let credential = Ed25519Credential::generate();
    let publisher = MockPublisher::new().with_locator("cas://report-test");
    let identity = credential.identity().unwrap();

    AnchorPipeline::new(&registry, &credential, &publisher)
        .with_policy(fast_policy())
        .run(b"reported artifact")
        .unwrap();

    let report = Verifier::new(&registry)
        .report(b"reported artifact", &identity)
        .unwrap();
    assert!(report.outcome.is_matched());
    assert_eq!(report.storage_locator.as_deref(), Some("cas://report-test"));

    let path = dir.path().join("verification.json");
    report.write_to_file(&path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["schema_id"], "provenance/verification@1");
    assert_eq!(parsed["result"], "matched");
    assert_eq!(parsed["expected_endorser"], identity.to_hex());
}
