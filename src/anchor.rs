//! Anchoring orchestrator.
//!
//! Runs one artifact through the staged pipeline:
//! fingerprint → endorse → publish → commit.
//!
//! Fingerprint and endorse failures are fatal before any external effect.
//! Publish failures are retried per policy and then degrade: the run still
//! commits with an empty storage locator, carrying the publish failure in
//! the outcome so the caller can retry publishing independently later.
//! Commit failures are fatal and may leave a published-but-uncommitted
//! artifact in the storage network; content-addressed storage has no delete
//! semantics, so no un-publish is attempted.
//!
//! The orchestrator holds no persistent state: every run is derived from the
//! inputs given to it for that run. Progress is reported as discrete events
//! over an mpsc channel, one per stage transition plus one per publish
//! attempt.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::{Fingerprint, FingerprintEngine};
use crate::provider::{CredentialProvider, PublishError, Publisher};
use crate::registry::{ProvenanceRecord, ProvenanceRegistry};

/// Schema version for endorsement claims.
pub const CLAIM_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for endorsement claims.
pub const CLAIM_SCHEMA_ID: &str = "provenance/endorsement_claim@1";

/// Human-readable statement of intent embedded in every endorsement claim.
pub const CLAIM_STATEMENT: &str =
    "I endorse the artifact with this SHA-256 fingerprint as existing at the stated time";

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fingerprint,
    Endorse,
    Publish,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fingerprint => "fingerprint",
            Stage::Endorse => "endorse",
            Stage::Publish => "publish",
            Stage::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Anchoring errors. A failed run names the stage and reason; a rejected
/// retry policy is a configuration error surfaced before any stage starts.
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("stage {stage} failed: {reason}")]
    StageFailed { stage: Stage, reason: String },

    #[error("run cancelled during {stage}")]
    Cancelled { stage: Stage },

    #[error("invalid retry policy: {0}")]
    InvalidPolicy(#[from] PolicyValidationError),
}

impl AnchorError {
    fn failed(stage: Stage, reason: impl fmt::Display) -> Self {
        AnchorError::StageFailed {
            stage,
            reason: reason.to_string(),
        }
    }

    /// The stage the run failed in, if it got that far.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnchorError::StageFailed { stage, .. } => Some(*stage),
            AnchorError::Cancelled { stage } => Some(*stage),
            AnchorError::InvalidPolicy(_) => None,
        }
    }
}

/// Error from endorsement claim canonicalization.
#[derive(Debug, Error)]
#[error("claim canonicalization failed: {0}")]
pub struct ClaimError(String);

/// Errors from retry policy validation.
#[derive(Debug, Error)]
pub enum PolicyValidationError {
    #[error("max_retries {0} out of bounds: must be <= 100")]
    RetriesOutOfBounds(u32),

    #[error("attempt_timeout must be in (0, 3600] seconds, got {0}s")]
    TimeoutOutOfBounds(u64),
}

/// Publish retry policy. Explicit data, not hardcoded, so tests can inject
/// zero-delay policies for deterministic retry-exhaustion runs.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first (total attempts = max_retries + 1).
    pub max_retries: u32,

    /// Delay between attempts.
    pub retry_delay: Duration,

    /// Per-attempt timeout handed to the publisher.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Total publish attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Validate policy bounds.
    pub fn validate(&self) -> Result<(), PolicyValidationError> {
        if self.max_retries > 100 {
            return Err(PolicyValidationError::RetriesOutOfBounds(self.max_retries));
        }
        let timeout_secs = self.attempt_timeout.as_secs();
        if self.attempt_timeout.is_zero() || timeout_secs > 3600 {
            return Err(PolicyValidationError::TimeoutOutOfBounds(timeout_secs));
        }
        Ok(())
    }
}

/// Cooperative cancellation handle for a run.
///
/// Cancellation is observed between publish attempts, never mid-attempt: an
/// in-flight publish call completes or times out naturally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress events, one per stage transition plus one per publish attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    StageStarted {
        run_id: String,
        stage: Stage,
    },
    PublishAttempt {
        run_id: String,
        attempt: u32,
        max_attempts: u32,
    },
    PublishDegraded {
        run_id: String,
        reason: String,
    },
    Committed {
        run_id: String,
        published: bool,
    },
}

/// The claim signed by the endorsing identity.
///
/// Serialized as canonical JSON (RFC 8785) so the signed bytes are stable
/// across serializer versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndorsementClaim {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// Hex fingerprint of the endorsed artifact
    pub fingerprint: String,

    /// Human-readable statement of intent
    pub statement: String,

    /// Unix timestamp (seconds) the claim is anchored at
    pub anchored_at: u64,
}

impl EndorsementClaim {
    /// Build the claim for a fingerprint at a timestamp.
    pub fn new(fingerprint: &Fingerprint, anchored_at: u64) -> Self {
        Self {
            schema_version: CLAIM_SCHEMA_VERSION,
            schema_id: CLAIM_SCHEMA_ID.to_string(),
            fingerprint: fingerprint.to_hex(),
            statement: CLAIM_STATEMENT.to_string(),
            anchored_at,
        }
    }

    /// Canonical JSON bytes of the claim (the message handed to `sign`).
    pub fn message(&self) -> Result<Vec<u8>, ClaimError> {
        // JCS (RFC 8785) keeps the signed bytes stable across serializers
        serde_json_canonicalizer::to_vec(self).map_err(|e| ClaimError(e.to_string()))
    }
}

/// Terminal result of a successful run.
#[derive(Debug, Clone)]
pub struct AnchorOutcome {
    /// Run identifier (ULID, lowercase).
    pub run_id: String,

    /// The committed record.
    pub record: ProvenanceRecord,

    /// Whether the publish stage succeeded.
    pub published: bool,

    /// Reason the publish stage degraded, if it did.
    pub publish_failure: Option<String>,
}

/// Generate a new run_id using ULID (sortable, filesystem-safe).
pub fn generate_run_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// The anchoring pipeline.
///
/// Borrows its collaborators; holds no state across runs. Multiple pipelines
/// may run concurrently against the same registry.
pub struct AnchorPipeline<'a> {
    registry: &'a ProvenanceRegistry,
    credential: &'a dyn CredentialProvider,
    publisher: &'a dyn Publisher,
    engine: FingerprintEngine,
    policy: RetryPolicy,
    cancel: CancelToken,
    progress: Option<Sender<ProgressEvent>>,
}

impl<'a> AnchorPipeline<'a> {
    /// Create a pipeline with the default engine and retry policy.
    pub fn new(
        registry: &'a ProvenanceRegistry,
        credential: &'a dyn CredentialProvider,
        publisher: &'a dyn Publisher,
    ) -> Self {
        Self {
            registry,
            credential,
            publisher,
            engine: FingerprintEngine::default(),
            policy: RetryPolicy::default(),
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Override the fingerprint engine.
    pub fn with_engine(mut self, engine: FingerprintEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Override the publish retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach a progress event channel.
    pub fn with_progress(mut self, progress: Sender<ProgressEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.progress {
            // Receiver may have gone away; progress is best-effort
            let _ = tx.send(event);
        }
    }

    /// Run one artifact through the pipeline.
    pub fn run(&self, bytes: &[u8]) -> Result<AnchorOutcome, AnchorError> {
        self.policy.validate()?;

        let run_id = generate_run_id();

        // Fingerprint: pure, nothing external touched yet
        self.emit(ProgressEvent::StageStarted {
            run_id: run_id.clone(),
            stage: Stage::Fingerprint,
        });
        let fingerprint = self
            .engine
            .fingerprint(bytes)
            .map_err(|e| AnchorError::failed(Stage::Fingerprint, e))?;
        let timestamp = self.registry.now();

        // Endorse: the registry requires a non-empty endorsement, so a
        // failure here aborts before publish or commit
        self.emit(ProgressEvent::StageStarted {
            run_id: run_id.clone(),
            stage: Stage::Endorse,
        });
        let endorser = self
            .credential
            .identity()
            .map_err(|e| AnchorError::failed(Stage::Endorse, e))?;
        let claim = EndorsementClaim::new(&fingerprint, timestamp);
        let message = claim
            .message()
            .map_err(|e| AnchorError::failed(Stage::Endorse, e))?;
        let endorsement = self
            .credential
            .sign(&message)
            .map_err(|e| AnchorError::failed(Stage::Endorse, e))?;

        // Publish: transient failures retried per policy; exhaustion (and
        // permanent rejection) degrade to an empty locator
        self.emit(ProgressEvent::StageStarted {
            run_id: run_id.clone(),
            stage: Stage::Publish,
        });
        let (locator, publish_failure) = self.publish_with_retry(bytes, &run_id)?;

        if let Some(reason) = &publish_failure {
            self.emit(ProgressEvent::PublishDegraded {
                run_id: run_id.clone(),
                reason: reason.clone(),
            });
        }

        // Commit: the only stage that can fail after an external effect; a
        // published-but-uncommitted artifact stays orphaned in storage
        self.emit(ProgressEvent::StageStarted {
            run_id: run_id.clone(),
            stage: Stage::Commit,
        });
        self.registry
            .put(
                fingerprint,
                timestamp,
                endorsement.clone(),
                endorser,
                locator.clone(),
            )
            .map_err(|e| AnchorError::failed(Stage::Commit, e))?;

        let record = ProvenanceRecord {
            fingerprint,
            timestamp,
            endorser,
            endorsement,
            storage_locator: locator,
        };

        let published = record.is_published();
        self.emit(ProgressEvent::Committed {
            run_id: run_id.clone(),
            published,
        });

        Ok(AnchorOutcome {
            run_id,
            record,
            published,
            publish_failure,
        })
    }

    /// Publish with bounded retries.
    ///
    /// Returns the locator (empty on degradation) and the failure reason if
    /// the stage degraded. Cancellation is checked before each attempt.
    fn publish_with_retry(
        &self,
        bytes: &[u8],
        run_id: &str,
    ) -> Result<(String, Option<String>), AnchorError> {
        let max_attempts = self.policy.max_attempts();
        let mut last_failure = String::new();

        for attempt in 1..=max_attempts {
            if self.cancel.is_cancelled() {
                return Err(AnchorError::Cancelled {
                    stage: Stage::Publish,
                });
            }

            self.emit(ProgressEvent::PublishAttempt {
                run_id: run_id.to_string(),
                attempt,
                max_attempts,
            });

            match self.publisher.publish(bytes, self.policy.attempt_timeout) {
                Ok(locator) => return Ok((locator, None)),
                Err(PublishError::Transient(reason)) => {
                    last_failure = reason;
                    if attempt < max_attempts {
                        thread::sleep(self.policy.retry_delay);
                    }
                }
                Err(PublishError::Permanent(reason)) => {
                    // Same handling as retry exhaustion
                    last_failure = reason;
                    break;
                }
            }
        }

        Ok((String::new(), Some(last_failure)))
    }
}
