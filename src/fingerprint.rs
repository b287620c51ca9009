//! Content fingerprinting.
//!
//! A fingerprint is the SHA-256 digest of an artifact's raw bytes and acts as
//! the primary key of the provenance registry. Fingerprinting is pure and
//! deterministic: identical bytes produce the identical fingerprint on every
//! machine and every run (no salts, no per-instance state).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a fingerprint in bytes (SHA-256).
pub const FINGERPRINT_LEN: usize = 32;

/// Default ceiling on artifact size accepted for fingerprinting (1 GiB).
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 1 << 30;

/// Errors from fingerprinting operations.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("artifact too large: {size} bytes exceeds limit of {limit}")]
    InputTooLarge { size: u64, limit: u64 },

    #[error("invalid fingerprint hex: {0}")]
    InvalidHex(String),
}

/// A 32-byte content digest identifying an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a fingerprint from its hex rendering.
    pub fn from_hex(s: &str) -> Result<Self, FingerprintError> {
        let bytes = hex::decode(s).map_err(|e| FingerprintError::InvalidHex(e.to_string()))?;
        let array: [u8; FINGERPRINT_LEN] = bytes
            .try_into()
            .map_err(|_| FingerprintError::InvalidHex(format!("expected {} bytes", FINGERPRINT_LEN)))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Fingerprint engine with a configurable size ceiling.
///
/// The ceiling is enforced before any hashing work happens so an oversized
/// artifact is rejected cheaply.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintEngine {
    max_artifact_bytes: u64,
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self {
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
        }
    }
}

impl FingerprintEngine {
    /// Create an engine with the default size ceiling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the size ceiling.
    pub fn with_max_artifact_bytes(mut self, limit: u64) -> Self {
        self.max_artifact_bytes = limit;
        self
    }

    /// The configured size ceiling in bytes.
    pub fn max_artifact_bytes(&self) -> u64 {
        self.max_artifact_bytes
    }

    /// Compute the fingerprint of an artifact's bytes.
    pub fn fingerprint(&self, bytes: &[u8]) -> Result<Fingerprint, FingerprintError> {
        let size = bytes.len() as u64;
        if size > self.max_artifact_bytes {
            return Err(FingerprintError::InputTooLarge {
                size,
                limit: self.max_artifact_bytes,
            });
        }

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();

        let mut out = [0u8; FINGERPRINT_LEN];
        out.copy_from_slice(&digest);
        Ok(Fingerprint(out))
    }
}

/// Fingerprint bytes with the default engine.
pub fn fingerprint(bytes: &[u8]) -> Result<Fingerprint, FingerprintError> {
    FingerprintEngine::default().fingerprint(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint(b"hello provenance").unwrap();
        let b = fingerprint(b"hello provenance").unwrap();
        assert_eq!(a, b);

        // Independent engine instances agree
        let c = FingerprintEngine::new().fingerprint(b"hello provenance").unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_fingerprint_distinct_inputs() {
        let a = fingerprint(b"artifact-a").unwrap();
        let b = fingerprint(b"artifact-b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_known_digest() {
        // SHA-256 of the empty string
        let fp = fingerprint(b"").unwrap();
        assert_eq!(
            fp.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_size_ceiling() {
        let engine = FingerprintEngine::new().with_max_artifact_bytes(8);
        assert!(engine.fingerprint(&[0u8; 8]).is_ok());

        let err = engine.fingerprint(&[0u8; 9]).unwrap_err();
        assert!(matches!(
            err,
            FingerprintError::InputTooLarge { size: 9, limit: 8 }
        ));
    }

    #[test]
    fn test_hex_round_trip() {
        let fp = fingerprint(b"round trip").unwrap();
        let parsed = Fingerprint::from_hex(&fp.to_hex()).unwrap();
        assert_eq!(fp, parsed);

        assert!(Fingerprint::from_hex("not hex").is_err());
        assert!(Fingerprint::from_hex("abcd").is_err()); // too short
    }

    #[test]
    fn test_serde_as_hex_string() {
        let fp = fingerprint(b"serde").unwrap();
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", fp.to_hex()));

        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, back);
    }
}
