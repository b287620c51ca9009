//! Collaborator interfaces at the pipeline's trust boundaries.
//!
//! The credential provider, publisher, and name resolver are external
//! services. Each is modeled as a trait with a closed error-kind set so the
//! orchestrator's failure classification (fatal vs. recoverable) is
//! exhaustive and testable without a live network.

use std::time::Duration;

use thiserror::Error;

use crate::identity::Identity;

/// Errors from a credential provider.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("no credential configured")]
    Unavailable,

    #[error("signing rejected: {0}")]
    Rejected(String),
}

/// A signing capability bound to an identity.
pub trait CredentialProvider: Send + Sync {
    /// Sign a message, producing opaque endorsement bytes.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CredentialError>;

    /// The public identity that `sign` binds to.
    fn identity(&self) -> Result<Identity, CredentialError>;
}

/// Errors from a publisher.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    /// Worth retrying (network flake, service busy).
    #[error("transient publish failure: {0}")]
    Transient(String),

    /// Not worth retrying (payload rejected outright). The orchestrator
    /// treats this the same as retry exhaustion.
    #[error("permanent publish failure: {0}")]
    Permanent(String),
}

/// Push artifact bytes into the content-addressed storage network.
///
/// Untrusted and retryable. The per-attempt timeout comes from the caller's
/// retry policy; an in-flight attempt completes or times out naturally and
/// is never forcibly aborted.
pub trait Publisher: Send + Sync {
    fn publish(&self, bytes: &[u8], timeout: Duration) -> Result<String, PublishError>;
}

/// Errors from name resolution.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("no identity registered for label {0:?}")]
    NotFound(String),
}

/// Resolve a human-readable label to an identity.
///
/// Used only by the verifier's optional indirection.
pub trait NameResolver: Send + Sync {
    fn resolve(&self, label: &str) -> Result<Identity, ResolveError>;
}
