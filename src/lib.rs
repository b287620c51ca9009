//! Provenance anchoring for binary artifacts.
//!
//! This crate turns a raw file into an immutable, uniquely-keyed provenance
//! record: a SHA-256 fingerprint, an endorsement signed by a specific
//! identity, an optional storage locator, and a commit timestamp, stored in
//! an append-only content-addressed registry.
//!
//! - [`fingerprint`]: deterministic content digests
//! - [`registry`]: the append-only provenance registry and its invariants
//! - [`anchor`]: the staged endorse → publish → commit orchestrator with
//!   retry, degraded-publish semantics, and progress events
//! - [`verify`]: read-only verification (recompute and cross-check)
//! - [`provider`]: interfaces for the external credential, publishing, and
//!   name-resolution collaborators
//! - [`credential`]: an Ed25519-backed credential provider
//! - [`mock`]: configurable collaborator doubles with failure injection

pub mod anchor;
pub mod credential;
pub mod fingerprint;
pub mod identity;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod verify;

pub use anchor::{
    AnchorError, AnchorOutcome, AnchorPipeline, CancelToken, ProgressEvent, RetryPolicy, Stage,
};
pub use credential::Ed25519Credential;
pub use fingerprint::{Fingerprint, FingerprintEngine, FingerprintError};
pub use identity::Identity;
pub use provider::{
    CredentialError, CredentialProvider, NameResolver, PublishError, Publisher, ResolveError,
};
pub use registry::{ProvenanceRecord, ProvenanceRegistry, RegistryError};
pub use verify::{VerificationOutcome, VerificationReport, Verifier, VerifyError};
