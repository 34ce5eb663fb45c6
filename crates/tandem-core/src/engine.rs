//! Capability interface of the underlying cryptographic engine.
//!
//! The engine owns all protocol state (ratchets, prekeys, group key
//! schedules) and its persistence. This crate only orchestrates calls into
//! it. Implementations are expected to bind to an audited library; nothing
//! here reimplements cryptographic primitives.
//!
//! Methods take `&mut self` because every call is made under the exclusive
//! access granted by [`crate::EngineHandle::perform`].

use std::{collections::HashMap, path::Path};

use thiserror::Error;

/// Failure reported by the engine.
///
/// The service layer never exposes these to callers directly: each one is
/// logged and then re-expressed as an operation-specific error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Operation attempted before `proteus_init` completed
    #[error("engine is not initialized")]
    NotInitialized,

    /// No session stored under the given key
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// No group with the given id
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Input bytes could not be decoded (message, prekey bundle, pickle)
    #[error("decode error: {0}")]
    Decode(String),

    /// Cryptographic operation rejected by the underlying library
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Persisted store could not be read or written
    #[error("keystore error: {0}")]
    Keystore(String),

    /// Legacy store could not be imported
    #[error("migration error: {0}")]
    Migration(String),
}

/// Pairwise (Proteus) capability set.
///
/// Session ids are the canonical raw keys produced by
/// [`crate::ProteusSessionId::raw_value`].
pub trait ProteusEngine: Send {
    /// Bootstrap the engine into a ready state.
    fn proteus_init(&mut self) -> Result<(), EngineError>;

    /// Create a session from a remote prekey bundle.
    fn session_from_prekey(&mut self, session_id: &str, prekey: &[u8]) -> Result<(), EngineError>;

    /// Create a session from an incoming pre-key message and return the
    /// decrypted plaintext it carries.
    fn session_from_message(
        &mut self,
        session_id: &str,
        envelope: &[u8],
    ) -> Result<Vec<u8>, EngineError>;

    /// Remove a session. Deleting an unknown session is engine-defined.
    fn session_delete(&mut self, session_id: &str) -> Result<(), EngineError>;

    /// Whether a session exists for the key.
    fn session_exists(&mut self, session_id: &str) -> Result<bool, EngineError>;

    /// Encrypt for one existing session.
    fn encrypt(&mut self, session_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// Encrypt the same plaintext for every listed session in one call.
    ///
    /// Either every session gets a ciphertext or the call fails.
    fn encrypt_batched(
        &mut self,
        session_ids: &[String],
        plaintext: &[u8],
    ) -> Result<HashMap<String, Vec<u8>>, EngineError>;

    /// Decrypt with an existing session.
    fn decrypt(&mut self, session_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// Generate the prekey bundle for `prekey_id`.
    fn new_prekey(&mut self, prekey_id: u16) -> Result<Vec<u8>, EngineError>;

    /// Bundle of the reserved last-resort prekey.
    fn last_resort_prekey(&mut self) -> Result<Vec<u8>, EngineError>;

    /// Id reserved for the last-resort prekey.
    fn last_resort_prekey_id(&mut self) -> Result<u16, EngineError>;

    /// Fingerprint of the local identity.
    fn fingerprint(&mut self) -> Result<String, EngineError>;

    /// Fingerprint of the remote identity bound to a session.
    fn fingerprint_remote(&mut self, session_id: &str) -> Result<String, EngineError>;

    /// Fingerprint of the identity inside a prekey bundle.
    fn fingerprint_prekeybundle(&mut self, prekey: &[u8]) -> Result<String, EngineError>;

    /// One-time import of a legacy on-disk session store.
    fn cryptobox_migrate(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Numeric code of the most recent failed Proteus operation.
    ///
    /// Decoded by [`crate::ProteusError::from_code`].
    fn last_error_code(&self) -> u32;
}

/// Group (MLS) capability set.
pub trait MlsEngine: Send {
    /// Encrypt an application message for an existing group.
    fn encrypt_message(&mut self, group_id: &[u8], message: &[u8]) -> Result<Vec<u8>, EngineError>;
}
