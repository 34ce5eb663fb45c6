//! Proteus side of the engine, built on `vodozemac::olm`.
//!
//! # Components
//!
//! - [`envelope`]: Wire format of encrypted messages
//! - [`bundle`]: Prekey bundle encoding
//! - `records`: Encrypted at-rest form of the account and sessions
//! - `legacy`: Reader for legacy on-disk session stores

pub mod bundle;
pub mod envelope;
pub(crate) mod legacy;
pub(crate) mod records;

pub use bundle::{BundleError, PrekeyBundle};
pub use envelope::EnvelopeError;
use tandem_core::{EngineError, proteus::codes};
use vodozemac::olm::{DecryptionError, SessionCreationError};

use crate::keystore::KeystoreError;

/// Prekey id reserved for the last-resort prekey.
pub const LAST_RESORT_PREKEY_ID: u16 = u16::MAX;

/// A failed Proteus operation: the numeric code reported through
/// `last_error_code` and the error returned to the caller.
#[derive(Debug)]
pub(crate) struct Failure {
    pub(crate) code: u32,
    pub(crate) error: EngineError,
}

impl Failure {
    pub(crate) fn new(code: u32, error: EngineError) -> Self {
        Self { code, error }
    }

    pub(crate) fn not_initialized() -> Self {
        Self::new(codes::IDENTITY_ERROR, EngineError::NotInitialized)
    }

    pub(crate) fn session_not_found(session_id: &str) -> Self {
        Self::new(codes::SESSION_NOT_FOUND, EngineError::SessionNotFound(session_id.to_owned()))
    }

    /// Stored record exists but cannot be read back.
    pub(crate) fn corrupt_record(error: impl std::fmt::Display) -> Self {
        Self::new(codes::STORAGE_ERROR, EngineError::Keystore(error.to_string()))
    }
}

impl From<KeystoreError> for Failure {
    fn from(error: KeystoreError) -> Self {
        Self::new(codes::STORAGE_ERROR, EngineError::Keystore(error.to_string()))
    }
}

impl From<EnvelopeError> for Failure {
    fn from(error: EnvelopeError) -> Self {
        let code = match error {
            EnvelopeError::UnknownType(_) => codes::INVALID_MESSAGE_TYPE,
            EnvelopeError::Empty | EnvelopeError::Malformed(_) => codes::DECODE_ERROR,
        };
        Self::new(code, EngineError::Decode(error.to_string()))
    }
}

impl From<BundleError> for Failure {
    fn from(error: BundleError) -> Self {
        Self::new(codes::INVALID_PREKEY, EngineError::Decode(error.to_string()))
    }
}

impl From<DecryptionError> for Failure {
    fn from(error: DecryptionError) -> Self {
        let code = match error {
            // Key for this index was already used and discarded
            DecryptionError::MissingMessageKey(_) => codes::DUPLICATE_MESSAGE,
            DecryptionError::TooBigMessageGap(..) => codes::TOO_DISTANT_FUTURE,
            _ => codes::INVALID_MESSAGE,
        };
        Self::new(code, EngineError::Crypto(error.to_string()))
    }
}

impl From<SessionCreationError> for Failure {
    fn from(error: SessionCreationError) -> Self {
        match error {
            SessionCreationError::MissingOneTimeKey(_) => {
                Self::new(codes::PREKEY_NOT_FOUND, EngineError::Crypto(error.to_string()))
            },
            SessionCreationError::MismatchedIdentityKey(..) => {
                Self::new(codes::REMOTE_IDENTITY_CHANGED, EngineError::Crypto(error.to_string()))
            },
            SessionCreationError::Decryption(inner) => inner.into(),
            #[allow(unreachable_patterns)]
            _ => Self::new(codes::INVALID_MESSAGE, EngineError::Crypto(error.to_string())),
        }
    }
}
