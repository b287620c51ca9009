//! Mock collaborators for testing the anchoring pipeline.
//!
//! Configurable in-process doubles for the three external services, with
//! failure injection for exercising error paths:
//!
//! - `MockPublisher`: succeed, fail N times then succeed, always fail
//!   (transient or permanent); records every attempt.
//! - `MockCredentialProvider`: fixed identity and endorsement bytes, or
//!   injected `Unavailable`/`Rejected` failures.
//! - `MockResolver`: label map for the verifier's name indirection.

mod credential;
mod publisher;
mod resolver;

pub use credential::MockCredentialProvider;
pub use publisher::{MockPublisher, PublishFailure};
pub use resolver::MockResolver;
