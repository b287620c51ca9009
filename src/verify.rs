//! Read-only verification against the registry.
//!
//! The verifier recomputes the fingerprint from the artifact bytes rather
//! than trusting a caller-supplied one, so it cannot be fooled by a
//! mismatched (bytes, fingerprint) pair.
//!
//! Known trust-model gap, kept deliberately: a `Matched` outcome compares
//! the recorded endorser to the expected identity by field equality and does
//! not cryptographically re-derive the signer from the endorsement bytes.
//! Strengthening this would change the registry's trust model; callers that
//! need the stronger check can verify the endorsement against the claim
//! themselves (see `Ed25519Credential::verify`).

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::{Fingerprint, FingerprintEngine, FingerprintError};
use crate::identity::Identity;
use crate::provider::{NameResolver, ResolveError};
use crate::registry::ProvenanceRegistry;

/// Schema version for verification reports.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for verification reports.
pub const REPORT_SCHEMA_ID: &str = "provenance/verification@1";

/// Errors from verification.
///
/// Resolution failure is its own kind, distinct from a `NotFound` outcome:
/// the former means the expected identity could not be determined, the
/// latter that the artifact has no record.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("label resolution failed: {0}")]
    Resolution(#[from] ResolveError),
}

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Fingerprint exists and the recorded endorser equals the expected
    /// identity.
    Matched,

    /// Fingerprint absent from the registry.
    NotFound,

    /// Fingerprint exists but the recorded endorser differs.
    Mismatch { recorded: Identity },
}

impl VerificationOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, VerificationOutcome::Matched)
    }
}

/// Verification report artifact (verification.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When the verification was performed
    pub created_at: DateTime<Utc>,

    /// Recomputed fingerprint of the verified bytes
    pub fingerprint: Fingerprint,

    /// Identity the caller expected
    pub expected_endorser: Identity,

    /// Verification outcome
    #[serde(flatten)]
    pub outcome: VerificationOutcome,

    /// Recorded commit timestamp, when a record exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_timestamp: Option<u64>,

    /// Recorded storage locator, when a record exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_locator: Option<String>,
}

impl VerificationReport {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file.
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))?;
        fs::write(path, json)
    }
}

/// Read-only verifier over a registry.
pub struct Verifier<'a> {
    registry: &'a ProvenanceRegistry,
    engine: FingerprintEngine,
}

impl<'a> Verifier<'a> {
    /// Create a verifier with the default fingerprint engine.
    pub fn new(registry: &'a ProvenanceRegistry) -> Self {
        Self {
            registry,
            engine: FingerprintEngine::default(),
        }
    }

    /// Override the fingerprint engine.
    pub fn with_engine(mut self, engine: FingerprintEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Verify artifact bytes against an expected endorser identity.
    pub fn verify(
        &self,
        bytes: &[u8],
        expected: &Identity,
    ) -> Result<VerificationOutcome, VerifyError> {
        let fingerprint = self.engine.fingerprint(bytes)?;
        Ok(self.check(&fingerprint, expected))
    }

    /// Verify artifact bytes against a human-readable label, resolved to an
    /// identity first. Resolution failure surfaces as
    /// `VerifyError::Resolution`.
    pub fn verify_label(
        &self,
        bytes: &[u8],
        label: &str,
        resolver: &dyn NameResolver,
    ) -> Result<VerificationOutcome, VerifyError> {
        let expected = resolver.resolve(label)?;
        self.verify(bytes, &expected)
    }

    /// Verify and produce a full report artifact.
    pub fn report(
        &self,
        bytes: &[u8],
        expected: &Identity,
    ) -> Result<VerificationReport, VerifyError> {
        let fingerprint = self.engine.fingerprint(bytes)?;

        // Single lookup: outcome and record fields come from the same
        // registry read, so a commit racing this report cannot produce a
        // NotFound outcome with populated record fields
        let record = self.registry.get(&fingerprint).ok();
        let outcome = match &record {
            Some(r) if r.endorser == *expected => VerificationOutcome::Matched,
            Some(r) => VerificationOutcome::Mismatch {
                recorded: r.endorser,
            },
            None => VerificationOutcome::NotFound,
        };

        Ok(VerificationReport {
            schema_version: REPORT_SCHEMA_VERSION,
            schema_id: REPORT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            fingerprint,
            expected_endorser: *expected,
            outcome,
            recorded_timestamp: record.as_ref().map(|r| r.timestamp),
            storage_locator: record.map(|r| r.storage_locator),
        })
    }

    fn check(&self, fingerprint: &Fingerprint, expected: &Identity) -> VerificationOutcome {
        match self.registry.get(fingerprint) {
            Ok(record) if record.endorser == *expected => VerificationOutcome::Matched,
            Ok(record) => VerificationOutcome::Mismatch {
                recorded: record.endorser,
            },
            Err(_) => VerificationOutcome::NotFound,
        }
    }
}
