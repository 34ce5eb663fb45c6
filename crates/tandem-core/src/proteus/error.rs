//! Error families for Proteus operations.
//!
//! Each operation family has its own closed enum so call sites can match
//! exhaustively on exactly the failures that operation can produce. Engine
//! detail is logged by the service and deliberately not carried here: the
//! variant name identifies which operation failed.
//!
//! Decrypt failures are the exception. They embed a [`ProteusError`] decoded
//! from the engine's last error code, because callers must tell a replayed
//! message apart from a changed remote identity.

use thiserror::Error;

/// Numeric Proteus error codes reported by the engine.
///
/// Shared by [`ProteusError::from_code`] and engine implementations.
pub mod codes {
    /// Last operation succeeded
    pub const SUCCESS: u32 = 0;
    /// Engine panicked internally
    pub const PANIC: u32 = 5;
    /// Malformed message or key encoding
    pub const DECODE_ERROR: u32 = 3;
    /// Invalid identity key encoding
    pub const INVALID_IDENTITY_KEY: u32 = 301;
    /// Invalid prekey encoding
    pub const INVALID_PREKEY: u32 = 302;
    /// Invalid envelope encoding
    pub const INVALID_ENVELOPE: u32 = 303;
    /// Prekey referenced by a message is unknown or already consumed
    pub const PREKEY_NOT_FOUND: u32 = 101;
    /// No session stored under the key
    pub const SESSION_NOT_FOUND: u32 = 102;
    /// Message failed structural validation
    pub const INVALID_MESSAGE: u32 = 200;
    /// Message carries an unexpected counter
    pub const INVALID_COUNTER: u32 = 201;
    /// Message refers to an unknown chain
    pub const UNKNOWN_CHAIN: u32 = 202;
    /// Remote identity differs from the one bound to the session
    pub const REMOTE_IDENTITY_CHANGED: u32 = 204;
    /// Message type not valid in this context
    pub const INVALID_MESSAGE_TYPE: u32 = 205;
    /// Authentication of the message failed
    pub const INVALID_MAC: u32 = 206;
    /// Signature over the message failed
    pub const INVALID_SIGNATURE: u32 = 207;
    /// Message key is older than the retained window
    pub const OUTDATED_MESSAGE: u32 = 208;
    /// Message was already decrypted
    pub const DUPLICATE_MESSAGE: u32 = 209;
    /// Signature over a prekey failed
    pub const INVALID_PREKEY_SIGNATURE: u32 = 210;
    /// Message counter is too far ahead of the chain
    pub const TOO_DISTANT_FUTURE: u32 = 211;
    /// Too many skipped message keys
    pub const TOO_MANY_SKIPPED: u32 = 212;
    /// Session has been degraded and cannot continue
    pub const DEGENERATED_SESSION: u32 = 213;
    /// Local identity is missing or invalid
    pub const IDENTITY_ERROR: u32 = 300;
    /// Persisted store failure
    pub const STORAGE_ERROR: u32 = 501;
}

/// Semantic category of a failed Proteus operation.
///
/// Produced by [`ProteusError::from_code`], which is total: every `u32`
/// resolves to exactly one variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProteusError {
    /// Persisted store failure
    #[error("storage error")]
    StorageError,

    /// No session for the identifier
    #[error("session not found")]
    SessionNotFound,

    /// Input could not be decoded
    #[error("decode error")]
    DecodeError,

    /// Remote party presented a different identity key
    #[error("remote identity changed")]
    RemoteIdentityChanged,

    /// Signature or MAC verification failed
    #[error("invalid signature")]
    InvalidSignature,

    /// Message failed validation
    #[error("invalid message")]
    InvalidMessage,

    /// Message was already processed (replay)
    #[error("duplicate message")]
    DuplicateMessage,

    /// Message is too far ahead of the ratchet
    #[error("message from too distant future")]
    TooDistantFuture,

    /// Message key has already been discarded
    #[error("outdated message")]
    OutdatedMessage,

    /// Local identity problem
    #[error("identity error")]
    IdentityError,

    /// Referenced prekey does not exist
    #[error("prekey not found")]
    PrekeyNotFound,

    /// Engine panicked
    #[error("engine panic")]
    Panic,

    /// Any code without a dedicated category
    #[error("unknown proteus error (code {0})")]
    Unknown(u32),
}

impl ProteusError {
    /// Decode an engine error code.
    pub fn from_code(code: u32) -> Self {
        use codes as c;

        match code {
            c::STORAGE_ERROR => Self::StorageError,
            c::SESSION_NOT_FOUND => Self::SessionNotFound,
            c::DECODE_ERROR | c::INVALID_IDENTITY_KEY | c::INVALID_PREKEY | c::INVALID_ENVELOPE => {
                Self::DecodeError
            },
            c::REMOTE_IDENTITY_CHANGED => Self::RemoteIdentityChanged,
            c::INVALID_MAC | c::INVALID_SIGNATURE | c::INVALID_PREKEY_SIGNATURE => {
                Self::InvalidSignature
            },
            c::INVALID_MESSAGE
            | c::INVALID_COUNTER
            | c::UNKNOWN_CHAIN
            | c::INVALID_MESSAGE_TYPE
            | c::DEGENERATED_SESSION => Self::InvalidMessage,
            c::DUPLICATE_MESSAGE => Self::DuplicateMessage,
            c::TOO_DISTANT_FUTURE | c::TOO_MANY_SKIPPED => Self::TooDistantFuture,
            c::OUTDATED_MESSAGE => Self::OutdatedMessage,
            c::IDENTITY_ERROR => Self::IdentityError,
            c::PREKEY_NOT_FOUND => Self::PrekeyNotFound,
            c::PANIC => Self::Panic,
            other => Self::Unknown(other),
        }
    }
}

/// Engine bootstrap failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitializationError {
    /// Engine could not enter a ready state
    #[error("cryptographic engine failed to initialize")]
    EngineNotReady,
}

/// Session establishment and deletion failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Prekey string is not valid base64; the engine was not called
    #[error("prekey is not base64 encoded")]
    PrekeyNotBase64Encoded,

    /// Engine rejected session creation
    #[error("failed to establish session")]
    EstablishmentFailed,

    /// Engine failed to delete the session
    #[error("failed to delete session")]
    DeletionFailed,
}

/// Encryption failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    /// Single-session encryption failed
    #[error("failed to encrypt data")]
    FailedToEncryptData,

    /// Batch encryption failed; no partial results are returned
    #[error("failed to encrypt data batch")]
    FailedToEncryptDataBatch,
}

/// Decryption failures, carrying the decoded engine error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionError {
    /// Decrypting with an existing session failed
    #[error("failed to decrypt data: {0}")]
    FailedToDecryptData(ProteusError),

    /// Establishing a session from the incoming message failed
    #[error("failed to establish session from message: {0}")]
    FailedToEstablishSessionFromMessage(ProteusError),
}

impl DecryptionError {
    /// Semantic engine error behind this failure.
    pub fn proteus_error(&self) -> ProteusError {
        match self {
            Self::FailedToDecryptData(error) | Self::FailedToEstablishSessionFromMessage(error) => {
                *error
            },
        }
    }
}

/// Prekey lifecycle failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrekeyError {
    /// Engine failed to generate a prekey
    #[error("failed to generate prekey")]
    FailedToGeneratePrekey,

    /// Zero prekeys requested; the engine was not called
    #[error("prekey count too low")]
    PrekeyCountTooLow,

    /// Engine failed to produce the last-resort prekey
    #[error("failed to get last resort prekey")]
    FailedToGetLastPrekey,

    /// Engine failed to report the last-resort prekey id
    #[error("failed to get last resort prekey id")]
    FailedToGetLastPrekeyId,
}

/// Fingerprint derivation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// Local identity fingerprint unavailable
    #[error("failed to get local fingerprint")]
    FailedToGetLocalFingerprint,

    /// Remote session fingerprint unavailable
    #[error("failed to get remote fingerprint")]
    FailedToGetRemoteFingerprint,

    /// Prekey bundle fingerprint unavailable
    #[error("failed to get fingerprint from prekey")]
    FailedToGetFingerprintFromPrekey,

    /// Prekey string is not valid base64; the engine was not called
    #[error("prekey is not base64 encoded")]
    PrekeyNotBase64Encoded,
}

/// Legacy store import failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// Engine could not import the legacy store
    #[error("failed to migrate legacy session data")]
    FailedToMigrateData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_code() {
        assert_eq!(ProteusError::from_code(209), ProteusError::DuplicateMessage);
    }

    #[test]
    fn grouped_codes_share_category() {
        for code in [3, 301, 302, 303] {
            assert_eq!(ProteusError::from_code(code), ProteusError::DecodeError);
        }
        for code in [200, 201, 202, 205, 213] {
            assert_eq!(ProteusError::from_code(code), ProteusError::InvalidMessage);
        }
        for code in [206, 207, 210] {
            assert_eq!(ProteusError::from_code(code), ProteusError::InvalidSignature);
        }
        for code in [211, 212] {
            assert_eq!(ProteusError::from_code(code), ProteusError::TooDistantFuture);
        }
    }

    #[test]
    fn single_codes() {
        assert_eq!(ProteusError::from_code(501), ProteusError::StorageError);
        assert_eq!(ProteusError::from_code(102), ProteusError::SessionNotFound);
        assert_eq!(ProteusError::from_code(204), ProteusError::RemoteIdentityChanged);
        assert_eq!(ProteusError::from_code(208), ProteusError::OutdatedMessage);
        assert_eq!(ProteusError::from_code(300), ProteusError::IdentityError);
        assert_eq!(ProteusError::from_code(101), ProteusError::PrekeyNotFound);
        assert_eq!(ProteusError::from_code(5), ProteusError::Panic);
    }

    #[test]
    fn unlisted_codes_fall_back_to_unknown() {
        assert_eq!(ProteusError::from_code(0), ProteusError::Unknown(0));
        assert_eq!(ProteusError::from_code(203), ProteusError::Unknown(203));
        assert_eq!(ProteusError::from_code(u32::MAX), ProteusError::Unknown(u32::MAX));
    }

    #[test]
    fn decryption_error_exposes_embedded_error() {
        let error = DecryptionError::FailedToEstablishSessionFromMessage(
            ProteusError::RemoteIdentityChanged,
        );
        assert_eq!(error.proteus_error(), ProteusError::RemoteIdentityChanged);
    }
}
