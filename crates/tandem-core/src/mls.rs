//! MLS group message encryption.
//!
//! Group membership and key schedule are owned by the engine. This service
//! only encrypts application messages for a group the engine already knows.

use std::{fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

use crate::{engine::MlsEngine, handle::EngineHandle};

/// Opaque MLS group identifier.
///
/// Displayed as standard base64, which is also how it appears in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MlsGroupId(Vec<u8>);

impl MlsGroupId {
    /// Wrap raw group id bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw group id bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for MlsGroupId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for MlsGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(&self.0))
    }
}

/// Group encryption failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MlsEncryptionError {
    /// Engine failed to encrypt for the group
    #[error("failed to encrypt mls message")]
    FailedToEncryptMessage,
}

/// Group message encryption.
pub trait MlsEncryptionServiceInterface {
    /// Encrypt an application message for `group_id`.
    fn encrypt(&self, message: &[u8], group_id: &MlsGroupId)
    -> Result<Vec<u8>, MlsEncryptionError>;
}

/// Engine-backed [`MlsEncryptionServiceInterface`].
pub struct MlsEncryptionService<E> {
    engine: Arc<EngineHandle<E>>,
}

impl<E: MlsEngine> MlsEncryptionService<E> {
    /// Create a service over a shared engine handle.
    pub fn new(engine: Arc<EngineHandle<E>>) -> Self {
        Self { engine }
    }
}

impl<E: MlsEngine> MlsEncryptionServiceInterface for MlsEncryptionService<E> {
    fn encrypt(
        &self,
        message: &[u8],
        group_id: &MlsGroupId,
    ) -> Result<Vec<u8>, MlsEncryptionError> {
        tracing::debug!(
            message_size = message.len(),
            group_id = %group_id,
            "encrypting mls message"
        );

        self.engine
            .perform(|engine| engine.encrypt_message(group_id.as_bytes(), message))
            .map_err(|error| {
                tracing::error!(%error, group_id = %group_id, "failed to encrypt mls message");
                MlsEncryptionError::FailedToEncryptMessage
            })
    }
}
