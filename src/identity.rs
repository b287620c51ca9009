//! Endorser identities.
//!
//! An identity is 32 bytes of public key material (an Ed25519 verifying key
//! in the shipped credential provider). The all-zero identity is reserved as
//! the null sentinel: registry existence is derived from "endorser is
//! non-null", so a null endorser can never be committed.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of an identity in bytes.
pub const IDENTITY_LEN: usize = 32;

/// Errors from identity parsing.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identity hex: {0}")]
    InvalidHex(String),
}

/// A 32-byte endorser identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// The null identity (all zero bytes). Forbidden as an endorser.
    pub const NULL: Identity = Identity([0u8; IDENTITY_LEN]);

    /// Wrap raw identity bytes.
    pub fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Whether this is the null identity.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse an identity from its hex rendering.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(s).map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
        let array: [u8; IDENTITY_LEN] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidHex(format!("expected {} bytes", IDENTITY_LEN)))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identity::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_identity() {
        assert!(Identity::NULL.is_null());
        assert!(!Identity::from_bytes([1u8; 32]).is_null());
    }

    #[test]
    fn test_hex_round_trip() {
        let id = Identity::from_bytes([0xab; 32]);
        let parsed = Identity::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);

        assert!(Identity::from_hex("zz").is_err());
        assert!(Identity::from_hex("abcd").is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let id = Identity::from_bytes([7u8; 32]);
        let json = serde_json::to_string(&id).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
