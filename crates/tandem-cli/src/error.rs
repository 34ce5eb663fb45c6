//! CLI error type.

use tandem_core::{
    EngineError, FingerprintError, InitializationError, MigrationError, PrekeyError,
    SessionError, SessionIdParseError,
};
use tandem_engine::KeystoreError;
use thiserror::Error;

/// Any failure while running a command.
#[derive(Error, Debug)]
pub enum CliError {
    /// Pickle key is not 32 hex-encoded bytes
    #[error("invalid pickle key: {0}")]
    InvalidPickleKey(String),

    /// Session id argument does not parse
    #[error("invalid session id: {0}")]
    InvalidSessionId(#[from] SessionIdParseError),

    /// Keystore could not be opened or read
    #[error("keystore: {0}")]
    Keystore(#[from] KeystoreError),

    /// Engine could not be constructed
    #[error("engine: {0}")]
    Engine(#[from] EngineError),

    /// Engine failed to initialize
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// Session command failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Prekey command failed
    #[error(transparent)]
    Prekey(#[from] PrekeyError),

    /// Fingerprint command failed
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// Legacy import failed
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Writing command output failed
    #[error("output: {0}")]
    Io(#[from] std::io::Error),
}
