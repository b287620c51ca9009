//! Ed25519-backed credential provider.
//!
//! Signs endorsement messages with an Ed25519 key; the identity is the
//! 32-byte verifying key. Key material can be generated fresh or imported
//! from base64 for storage in a host-side config. Key derivation schemes and
//! network parameter selection are outside this crate.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;

use crate::identity::Identity;
use crate::provider::{CredentialError, CredentialProvider};

/// Errors from key encoding and decoding.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// An in-process Ed25519 credential.
pub struct Ed25519Credential {
    signing_key: SigningKey,
}

impl Ed25519Credential {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Wrap an existing signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Import a signing key from base64.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = BASE64.decode(encoded)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidKey("signing key must be 32 bytes".to_string()))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&array),
        })
    }

    /// Export the signing key as base64 for storage.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.signing_key.to_bytes())
    }

    /// The verifying key for this credential.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Verify endorsement bytes against this credential's identity.
    ///
    /// Not used by the pipeline (the registry verifier compares recorded
    /// endorser fields, not signatures); provided for callers that want the
    /// stronger check.
    pub fn verify(&self, message: &[u8], endorsement: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(endorsement) else {
            return false;
        };
        self.verifying_key().verify(message, &signature).is_ok()
    }
}

impl CredentialProvider for Ed25519Credential {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CredentialError> {
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }

    fn identity(&self) -> Result<Identity, CredentialError> {
        Ok(Identity::from_bytes(self.verifying_key().to_bytes()))
    }
}

/// Decode a verifying key from base64.
pub fn decode_verifying_key(encoded: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = BASE64.decode(encoded)?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeyError::InvalidKey("verifying key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&array).map_err(|e| KeyError::InvalidKey(e.to_string()))
}

/// Encode a verifying key to base64 for storage.
pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    BASE64.encode(key.as_bytes())
}
