//! Proteus session service.
//!
//! Stateless with respect to session contents: every method is a single
//! serialized engine operation plus input validation and error translation.

use std::{collections::HashMap, path::Path, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::{
    error::{
        DecryptionError, EncryptionError, FingerprintError, InitializationError, MigrationError,
        PrekeyError, ProteusError, SessionError,
    },
    prekeys::{Prekey, prekey_range},
};
use crate::{engine::ProteusEngine, handle::EngineHandle, session_id::ProteusSessionId};

/// Result of a successful decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    /// The message established a new session. The caller may need to do
    /// prekey bookkeeping (e.g. decrement a remaining-prekey counter).
    pub did_create_session: bool,
    /// Decrypted payload
    pub plaintext: Vec<u8>,
}

/// Pairwise session operations.
///
/// Implemented by [`ProteusService`]; tests can substitute their own
/// implementation without an engine.
pub trait ProteusServiceInterface {
    /// One-time engine bootstrap. Must complete before any other call.
    fn complete_initialization(&self) -> Result<(), InitializationError>;

    /// Establish a session from a base64 prekey bundle.
    ///
    /// An existing session for `id` is replaced.
    fn establish_session(
        &self,
        id: &ProteusSessionId,
        from_prekey: &str,
    ) -> Result<(), SessionError>;

    /// Remove a session.
    fn delete_session(&self, id: &ProteusSessionId) -> Result<(), SessionError>;

    /// Whether a session exists. Engine failures read as `false`.
    fn session_exists(&self, id: &ProteusSessionId) -> bool;

    /// Encrypt for one existing session.
    fn encrypt(&self, data: &[u8], id: &ProteusSessionId) -> Result<Vec<u8>, EncryptionError>;

    /// Encrypt the same data for every session, keyed by raw session id.
    fn encrypt_batched(
        &self,
        data: &[u8],
        sessions: &[ProteusSessionId],
    ) -> Result<HashMap<String, Vec<u8>>, EncryptionError>;

    /// Decrypt, establishing the session from the message if none exists.
    fn decrypt(&self, data: &[u8], id: &ProteusSessionId) -> Result<Decrypted, DecryptionError>;

    /// Generate the prekey with the given id, base64 encoded.
    fn generate_prekey(&self, id: u16) -> Result<String, PrekeyError>;

    /// Last-resort prekey, base64 encoded.
    fn last_prekey(&self) -> Result<String, PrekeyError>;

    /// Last-resort prekey id, or `u16::MAX` if the engine cannot tell.
    ///
    /// The fallback is indistinguishable from a real id of `u16::MAX`; use
    /// [`Self::try_last_prekey_id`] when that matters.
    fn last_prekey_id(&self) -> u16;

    /// Last-resort prekey id, surfacing engine failures.
    fn try_last_prekey_id(&self) -> Result<u16, PrekeyError>;

    /// Generate `count` prekeys starting at `start`, wrapping to id 0 when
    /// the range would reach past the last-resort id.
    fn generate_prekeys(&self, start: u16, count: u16) -> Result<Vec<Prekey>, PrekeyError>;

    /// Fingerprint of the local identity.
    fn local_fingerprint(&self) -> Result<String, FingerprintError>;

    /// Fingerprint of the remote identity of a session.
    fn remote_fingerprint(&self, id: &ProteusSessionId) -> Result<String, FingerprintError>;

    /// Fingerprint of the identity in a base64 prekey bundle.
    fn fingerprint_from_prekey(&self, prekey: &str) -> Result<String, FingerprintError>;

    /// Import a legacy on-disk session store into the engine.
    fn migrate_legacy_sessions(&self, path: &Path) -> Result<(), MigrationError>;
}

/// Engine-backed [`ProteusServiceInterface`].
pub struct ProteusService<E> {
    engine: Arc<EngineHandle<E>>,
}

impl<E: ProteusEngine> ProteusService<E> {
    /// Create a service over a shared engine handle.
    pub fn new(engine: Arc<EngineHandle<E>>) -> Self {
        Self { engine }
    }

    /// Engine handle this service runs on.
    pub fn engine(&self) -> &Arc<EngineHandle<E>> {
        &self.engine
    }
}

impl<E: ProteusEngine> ProteusServiceInterface for ProteusService<E> {
    fn complete_initialization(&self) -> Result<(), InitializationError> {
        tracing::info!("completing initialization of proteus service...");

        match self.engine.perform(ProteusEngine::proteus_init) {
            Ok(()) => {
                tracing::info!("completing initialization of proteus service... success");
                Ok(())
            },
            Err(error) => {
                tracing::error!(%error, "completing initialization of proteus service... failed");
                Err(InitializationError::EngineNotReady)
            },
        }
    }

    fn establish_session(
        &self,
        id: &ProteusSessionId,
        from_prekey: &str,
    ) -> Result<(), SessionError> {
        tracing::info!("establishing session from prekey");

        let Ok(prekey) = STANDARD.decode(from_prekey) else {
            tracing::error!("failed to establish session from prekey: prekey is not base64");
            return Err(SessionError::PrekeyNotBase64Encoded);
        };

        let raw = id.raw_value();
        self.engine
            .perform(|engine| {
                if session_exists_or_absent(engine, &raw) {
                    tracing::warn!("replacing existing session with one from prekey");
                }
                engine.session_from_prekey(&raw, &prekey)
            })
            .map_err(|error| {
                tracing::error!(%error, "failed to establish session from prekey");
                SessionError::EstablishmentFailed
            })
    }

    fn delete_session(&self, id: &ProteusSessionId) -> Result<(), SessionError> {
        tracing::info!("deleting session");

        let raw = id.raw_value();
        self.engine.perform(|engine| engine.session_delete(&raw)).map_err(|error| {
            tracing::error!(%error, "failed to delete session");
            SessionError::DeletionFailed
        })
    }

    fn session_exists(&self, id: &ProteusSessionId) -> bool {
        tracing::info!("checking if session exists");

        let raw = id.raw_value();
        self.engine.perform(|engine| session_exists_or_absent(engine, &raw))
    }

    fn encrypt(&self, data: &[u8], id: &ProteusSessionId) -> Result<Vec<u8>, EncryptionError> {
        tracing::info!("encrypting data");

        let raw = id.raw_value();
        self.engine.perform(|engine| engine.encrypt(&raw, data)).map_err(|error| {
            tracing::error!(%error, "failed to encrypt data");
            EncryptionError::FailedToEncryptData
        })
    }

    fn encrypt_batched(
        &self,
        data: &[u8],
        sessions: &[ProteusSessionId],
    ) -> Result<HashMap<String, Vec<u8>>, EncryptionError> {
        tracing::info!(sessions = sessions.len(), "encrypting data batch");

        let raw_ids: Vec<String> = sessions.iter().map(ProteusSessionId::raw_value).collect();
        self.engine.perform(|engine| engine.encrypt_batched(&raw_ids, data)).map_err(|error| {
            tracing::error!(%error, "failed to encrypt data batch");
            EncryptionError::FailedToEncryptDataBatch
        })
    }

    fn decrypt(&self, data: &[u8], id: &ProteusSessionId) -> Result<Decrypted, DecryptionError> {
        tracing::info!("decrypting data");

        let raw = id.raw_value();

        // Existence check and branch share one serialized operation, so no
        // other call on this session can run in between.
        self.engine.perform(|engine| {
            if session_exists_or_absent(engine, &raw) {
                tracing::info!("session exists, decrypting...");

                engine
                    .decrypt(&raw, data)
                    .map(|plaintext| Decrypted { did_create_session: false, plaintext })
                    .map_err(|error| {
                        tracing::error!(%error, "failed to decrypt data");
                        DecryptionError::FailedToDecryptData(last_proteus_error(engine))
                    })
            } else {
                tracing::info!("session doesn't exist, creating one then decrypting message...");

                engine
                    .session_from_message(&raw, data)
                    .map(|plaintext| Decrypted { did_create_session: true, plaintext })
                    .map_err(|error| {
                        tracing::error!(%error, "failed to establish session from message");
                        DecryptionError::FailedToEstablishSessionFromMessage(last_proteus_error(
                            engine,
                        ))
                    })
            }
        })
    }

    fn generate_prekey(&self, id: u16) -> Result<String, PrekeyError> {
        tracing::info!(prekey_id = id, "generating prekey");

        self.engine
            .perform(|engine| engine.new_prekey(id))
            .map(|prekey| STANDARD.encode(prekey))
            .map_err(|error| {
                tracing::error!(%error, "failed to generate prekey");
                PrekeyError::FailedToGeneratePrekey
            })
    }

    fn last_prekey(&self) -> Result<String, PrekeyError> {
        tracing::info!("getting last resort prekey");

        self.engine
            .perform(ProteusEngine::last_resort_prekey)
            .map(|prekey| STANDARD.encode(prekey))
            .map_err(|error| {
                tracing::error!(%error, "failed to get last resort prekey");
                PrekeyError::FailedToGetLastPrekey
            })
    }

    fn last_prekey_id(&self) -> u16 {
        self.try_last_prekey_id().unwrap_or(u16::MAX)
    }

    fn try_last_prekey_id(&self) -> Result<u16, PrekeyError> {
        tracing::info!("getting last resort prekey id");

        self.engine.perform(ProteusEngine::last_resort_prekey_id).map_err(|error| {
            tracing::error!(%error, "failed to get last resort prekey id");
            PrekeyError::FailedToGetLastPrekeyId
        })
    }

    fn generate_prekeys(&self, start: u16, count: u16) -> Result<Vec<Prekey>, PrekeyError> {
        tracing::info!(start, count, "generating prekeys");

        if count == 0 {
            return Err(PrekeyError::PrekeyCountTooLow);
        }

        let range = prekey_range(start, count, self.last_prekey_id());
        let prekeys = range
            .map(|id| self.generate_prekey(id).map(|data| Prekey { id, data }))
            .collect::<Result<Vec<_>, _>>()?;

        if prekeys.is_empty() {
            return Err(PrekeyError::FailedToGeneratePrekey);
        }

        Ok(prekeys)
    }

    fn local_fingerprint(&self) -> Result<String, FingerprintError> {
        tracing::info!("fetching local fingerprint");

        self.engine.perform(ProteusEngine::fingerprint).map_err(|error| {
            tracing::error!(%error, "failed to fetch local fingerprint");
            FingerprintError::FailedToGetLocalFingerprint
        })
    }

    fn remote_fingerprint(&self, id: &ProteusSessionId) -> Result<String, FingerprintError> {
        tracing::info!("fetching remote fingerprint");

        let raw = id.raw_value();
        self.engine.perform(|engine| engine.fingerprint_remote(&raw)).map_err(|error| {
            tracing::error!(%error, "failed to fetch remote fingerprint");
            FingerprintError::FailedToGetRemoteFingerprint
        })
    }

    fn fingerprint_from_prekey(&self, prekey: &str) -> Result<String, FingerprintError> {
        tracing::info!("getting fingerprint from prekey");

        let Ok(prekey) = STANDARD.decode(prekey) else {
            tracing::error!("failed to get fingerprint from prekey: prekey is not base64");
            return Err(FingerprintError::PrekeyNotBase64Encoded);
        };

        self.engine.perform(|engine| engine.fingerprint_prekeybundle(&prekey)).map_err(|error| {
            tracing::error!(%error, "failed to get fingerprint from prekey");
            FingerprintError::FailedToGetFingerprintFromPrekey
        })
    }

    fn migrate_legacy_sessions(&self, path: &Path) -> Result<(), MigrationError> {
        tracing::info!(path = %path.display(), "migrating legacy sessions");

        self.engine.perform(|engine| engine.cryptobox_migrate(path)).map_err(|error| {
            tracing::error!(%error, "failed to migrate legacy sessions");
            MigrationError::FailedToMigrateData
        })
    }
}

/// Existence query with engine failures read as "absent".
///
/// Only used to pick a code path whose other branch has its own error
/// handling, so a spurious `false` cannot hide a failure.
fn session_exists_or_absent<E: ProteusEngine>(engine: &mut E, raw: &str) -> bool {
    match engine.session_exists(raw) {
        Ok(exists) => exists,
        Err(error) => {
            tracing::error!(%error, "failed to check if session exists");
            false
        },
    }
}

fn last_proteus_error<E: ProteusEngine>(engine: &E) -> ProteusError {
    ProteusError::from_code(engine.last_error_code())
}
