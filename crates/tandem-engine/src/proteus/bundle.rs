//! Prekey bundle encoding.
//!
//! A bundle is what a client publishes so that others can open a session
//! with it offline: the prekey id, the long-term identity key and the prekey
//! itself. Encoded as a CBOR map.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vodozemac::Curve25519PublicKey;

/// Prekey bundle decoding or encoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// CBOR structure did not match a bundle
    #[error("malformed prekey bundle: {0}")]
    Malformed(String),

    /// A key field does not hold a 32-byte Curve25519 key
    #[error("invalid {field} length {len}, expected 32")]
    InvalidKey {
        /// Field name
        field: &'static str,
        /// Actual length
        len: usize,
    },

    /// CBOR encoding failed
    #[error("failed to encode prekey bundle: {0}")]
    Encode(String),
}

/// Published prekey material of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrekeyBundle {
    /// Prekey id
    pub id: u16,
    /// Long-term identity key of the publishing client
    pub identity_key: Curve25519PublicKey,
    /// One-time or last-resort prekey
    pub prekey: Curve25519PublicKey,
}

#[derive(Serialize, Deserialize)]
struct WireBundle {
    id: u16,
    identity_key: Vec<u8>,
    prekey: Vec<u8>,
}

impl PrekeyBundle {
    /// Encode to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, BundleError> {
        let wire = WireBundle {
            id: self.id,
            identity_key: self.identity_key.to_bytes().to_vec(),
            prekey: self.prekey.to_bytes().to_vec(),
        };

        let mut bytes = Vec::new();
        ciborium::into_writer(&wire, &mut bytes).map_err(|e| BundleError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Decode from CBOR. Never panics on untrusted input.
    pub fn decode(bytes: &[u8]) -> Result<Self, BundleError> {
        let wire: WireBundle =
            ciborium::from_reader(bytes).map_err(|e| BundleError::Malformed(e.to_string()))?;

        Ok(Self {
            id: wire.id,
            identity_key: curve_key("identity_key", &wire.identity_key)?,
            prekey: curve_key("prekey", &wire.prekey)?,
        })
    }
}

/// Parse a raw 32-byte Curve25519 public key.
pub(crate) fn curve_key(
    field: &'static str,
    bytes: &[u8],
) -> Result<Curve25519PublicKey, BundleError> {
    let key: [u8; 32] =
        bytes.try_into().map_err(|_| BundleError::InvalidKey { field, len: bytes.len() })?;
    Ok(Curve25519PublicKey::from_bytes(key))
}
