//! Mock credential provider with failure injection.

use crate::identity::Identity;
use crate::provider::{CredentialError, CredentialProvider};

/// Mock credential provider. Returns a fixed identity and fixed endorsement
/// bytes unless a failure is injected.
pub struct MockCredentialProvider {
    identity: Identity,
    endorsement: Vec<u8>,
    failure: Option<CredentialError>,
}

impl MockCredentialProvider {
    /// Create a provider for the given identity.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            endorsement: vec![0xE0; 64],
            failure: None,
        }
    }

    /// Override the endorsement bytes returned by `sign`.
    pub fn with_endorsement(mut self, endorsement: Vec<u8>) -> Self {
        self.endorsement = endorsement;
        self
    }

    /// Provider with no credential configured.
    pub fn unavailable() -> Self {
        Self {
            identity: Identity::NULL,
            endorsement: Vec::new(),
            failure: Some(CredentialError::Unavailable),
        }
    }

    /// Provider that declines to sign.
    pub fn rejecting(identity: Identity, reason: impl Into<String>) -> Self {
        Self {
            identity,
            endorsement: Vec::new(),
            failure: Some(CredentialError::Rejected(reason.into())),
        }
    }
}

impl CredentialProvider for MockCredentialProvider {
    fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, CredentialError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.endorsement.clone()),
        }
    }

    fn identity(&self) -> Result<Identity, CredentialError> {
        match &self.failure {
            Some(CredentialError::Unavailable) => Err(CredentialError::Unavailable),
            _ => Ok(self.identity),
        }
    }
}
