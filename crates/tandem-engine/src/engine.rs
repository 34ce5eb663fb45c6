//! Keystore-backed engine implementing both capability sets.
//!
//! Proteus state is write-through: every operation loads the records it
//! needs from the keystore, and persists them before returning success. A
//! failed operation never writes, so the stored ratchet stays at its last
//! good state.

use std::{collections::HashMap, path::Path};

use tandem_core::{EngineError, MlsEngine, ProteusEngine, proteus::codes};
use vodozemac::olm::{OlmMessage, PreKeyMessage, SessionConfig};

use crate::{
    config::EngineConfig,
    keystore::Keystore,
    mls::MlsState,
    proteus::{
        Failure, LAST_RESORT_PREKEY_ID, PrekeyBundle, envelope, legacy,
        records::{LocalAccount, PeerSession},
    },
};

/// Concrete engine over keystore `K`.
///
/// Drive it through a [`tandem_core::EngineHandle`]; it is not internally
/// synchronized.
pub struct CoreEngine<K> {
    config: EngineConfig,
    keystore: K,
    account: Option<LocalAccount>,
    last_error: u32,
    mls: MlsState,
}

impl<K: Keystore> CoreEngine<K> {
    /// Create an engine. Proteus operations require `proteus_init` first.
    pub fn new(config: EngineConfig, keystore: K) -> Result<Self, EngineError> {
        let mls = MlsState::new(config.client_identity().to_vec(), config.ciphersuite())?;

        Ok(Self { config, keystore, account: None, last_error: codes::SUCCESS, mls })
    }

    /// Keystore this engine persists into.
    pub fn keystore(&self) -> &K {
        &self.keystore
    }

    /// MLS groups of this engine.
    pub fn mls(&self) -> &MlsState {
        &self.mls
    }

    /// Mutable access to the MLS groups (group creation, membership).
    pub fn mls_mut(&mut self) -> &mut MlsState {
        &mut self.mls
    }

    /// Record the outcome of a Proteus operation in `last_error_code`.
    fn track<T>(&mut self, result: Result<T, Failure>) -> Result<T, EngineError> {
        match result {
            Ok(value) => {
                self.last_error = codes::SUCCESS;
                Ok(value)
            },
            Err(Failure { code, error }) => {
                tracing::debug!(code, %error, "proteus operation failed");
                self.last_error = code;
                Err(error)
            },
        }
    }

    fn account(&self) -> Result<&LocalAccount, Failure> {
        self.account.as_ref().ok_or_else(Failure::not_initialized)
    }

    fn load_session(&self, session_id: &str) -> Result<Option<PeerSession>, Failure> {
        self.account()?;

        self.keystore
            .load_session(session_id)?
            .map(|bytes| PeerSession::open(&bytes, self.config.pickle_key()))
            .transpose()
    }

    fn existing_session(&self, session_id: &str) -> Result<PeerSession, Failure> {
        self.load_session(session_id)?.ok_or_else(|| Failure::session_not_found(session_id))
    }

    fn store_session(&self, session_id: &str, session: &PeerSession) -> Result<(), Failure> {
        let sealed = session.seal(self.config.pickle_key())?;
        self.keystore.store_session(session_id, &sealed)?;
        Ok(())
    }

    fn store_account(&self, account: &LocalAccount) -> Result<(), Failure> {
        let sealed = account.seal(self.config.pickle_key())?;
        self.keystore.store_account(&sealed)?;
        Ok(())
    }

    fn init(&mut self) -> Result<(), Failure> {
        if self.account.is_some() {
            return Ok(());
        }

        let account = match self.keystore.load_account()? {
            Some(bytes) => LocalAccount::open(&bytes, self.config.pickle_key())?,
            None => {
                tracing::info!("no stored identity, generating a new one");
                let account = LocalAccount::generate()?;
                self.store_account(&account)?;
                account
            },
        };

        self.account = Some(account);
        Ok(())
    }

    fn from_prekey(&mut self, session_id: &str, prekey: &[u8]) -> Result<(), Failure> {
        let bundle = PrekeyBundle::decode(prekey)?;
        let account = self.account()?;

        let session = PeerSession {
            session: account.account().create_outbound_session(
                SessionConfig::version_2(),
                bundle.identity_key,
                bundle.prekey,
            ),
            remote_identity: bundle.identity_key,
        };

        self.store_session(session_id, &session)
    }

    fn from_message(&mut self, session_id: &str, envelope: &[u8]) -> Result<Vec<u8>, Failure> {
        let OlmMessage::PreKey(message) = envelope::decode(envelope)? else {
            return Err(Failure::session_not_found(session_id));
        };

        self.inbound(session_id, &message)
    }

    /// Create a session from `message`, replacing any stored under
    /// `session_id`, and consume its one-time prekey.
    fn inbound(&mut self, session_id: &str, message: &PreKeyMessage) -> Result<Vec<u8>, Failure> {
        let mut account = self.account.take().ok_or_else(Failure::not_initialized)?;
        let outcome = account
            .account_mut()
            .create_inbound_session(message.identity_key(), message)
            .map_err(Failure::from)
            .and_then(|created| {
                let session = PeerSession {
                    session: created.session,
                    remote_identity: message.identity_key(),
                };
                // Session first: a crash in between leaves the prekey unconsumed
                self.store_session(session_id, &session)?;
                self.store_account(&account)?;
                Ok(created.plaintext)
            });

        match outcome {
            Ok(plaintext) => {
                self.account = Some(account);
                Ok(plaintext)
            },
            Err(failure) => {
                // In-memory account may have consumed the prekey; reload the
                // persisted one so memory and keystore agree.
                self.account = None;
                if let Err(reload) = self.init() {
                    tracing::error!(
                        code = reload.code,
                        error = %reload.error,
                        "failed to reload identity after failed session creation"
                    );
                }
                Err(failure)
            },
        }
    }

    fn encrypt_session(
        &self,
        session_id: &str,
        session: &mut PeerSession,
        plaintext: &[u8],
    ) -> Vec<u8> {
        tracing::trace!(session_id, size = plaintext.len(), "encrypting");
        envelope::encode(&session.session.encrypt(plaintext))
    }

    fn encrypt_one(&mut self, session_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, Failure> {
        let mut session = self.existing_session(session_id)?;
        let envelope = self.encrypt_session(session_id, &mut session, plaintext);
        self.store_session(session_id, &session)?;
        Ok(envelope)
    }

    fn encrypt_many(
        &mut self,
        session_ids: &[String],
        plaintext: &[u8],
    ) -> Result<HashMap<String, Vec<u8>>, Failure> {
        // Resolve every session before advancing any ratchet
        let mut sessions = session_ids
            .iter()
            .map(|id| self.existing_session(id).map(|session| (id, session)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut envelopes = HashMap::with_capacity(sessions.len());
        for (id, session) in &mut sessions {
            envelopes.insert((*id).clone(), self.encrypt_session(id.as_str(), session, plaintext));
        }
        for (id, session) in &sessions {
            self.store_session(id.as_str(), session)?;
        }

        Ok(envelopes)
    }

    fn decrypt_existing(&mut self, session_id: &str, envelope: &[u8]) -> Result<Vec<u8>, Failure> {
        let mut session = self.existing_session(session_id)?;
        let message = envelope::decode(envelope)?;

        if let OlmMessage::PreKey(prekey_message) = &message {
            if prekey_message.identity_key() != session.remote_identity {
                return Err(Failure::new(
                    codes::REMOTE_IDENTITY_CHANGED,
                    EngineError::Crypto("pre-key message from a different identity".to_owned()),
                ));
            }
            // Same peer, new Olm session: the peer lost its side and started over
            if prekey_message.session_id() != session.session.session_id() {
                tracing::info!(session_id, "peer re-established session, replacing it");
                return self.inbound(session_id, prekey_message);
            }
        }

        let plaintext = session.session.decrypt(&message)?;
        self.store_session(session_id, &session)?;
        Ok(plaintext)
    }

    fn prekey(&mut self, prekey_id: u16) -> Result<Vec<u8>, Failure> {
        if prekey_id == LAST_RESORT_PREKEY_ID {
            return Err(Failure::new(
                codes::INVALID_PREKEY,
                EngineError::Crypto("prekey id is reserved for the last-resort prekey".to_owned()),
            ));
        }

        let mut account = self.account.take().ok_or_else(Failure::not_initialized)?;
        let outcome = account.new_prekey(prekey_id).and_then(|bundle| {
            self.store_account(&account)?;
            Ok(bundle.encode()?)
        });
        self.account = Some(account);

        outcome
    }

    fn migrate(&mut self, path: &Path) -> Result<(), Failure> {
        let store = legacy::read(path, self.config.legacy_passphrase()).map_err(|reason| {
            Failure::new(codes::STORAGE_ERROR, EngineError::Migration(reason))
        })?;

        let account = LocalAccount::from_account(store.account)?;
        let key = self.config.pickle_key();

        // Seal everything before the first write
        let sealed_account = account.seal(key)?;
        let sealed_sessions = store
            .sessions
            .into_iter()
            .map(|legacy| {
                let session = PeerSession {
                    session: legacy.session,
                    remote_identity: legacy.remote_identity,
                };
                session.seal(key).map(|sealed| (legacy.session_id, sealed))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (session_id, sealed) in &sealed_sessions {
            self.keystore.store_session(session_id, sealed)?;
        }
        self.keystore.store_account(&sealed_account)?;
        self.account = Some(account);

        tracing::info!(sessions = sealed_sessions.len(), "imported legacy session store");
        Ok(())
    }
}

impl<K: Keystore> ProteusEngine for CoreEngine<K> {
    fn proteus_init(&mut self) -> Result<(), EngineError> {
        let result = self.init();
        self.track(result)
    }

    fn session_from_prekey(&mut self, session_id: &str, prekey: &[u8]) -> Result<(), EngineError> {
        let result = self.from_prekey(session_id, prekey);
        self.track(result)
    }

    fn session_from_message(
        &mut self,
        session_id: &str,
        envelope: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        let result = self.from_message(session_id, envelope);
        self.track(result)
    }

    fn session_delete(&mut self, session_id: &str) -> Result<(), EngineError> {
        let result = self
            .account()
            .and_then(|_| Ok(self.keystore.delete_session(session_id)?))
            .map(|existed| {
                if !existed {
                    tracing::debug!(session_id, "deleted session that did not exist");
                }
            });
        self.track(result)
    }

    fn session_exists(&mut self, session_id: &str) -> Result<bool, EngineError> {
        let result = self
            .account()
            .and_then(|_| Ok(self.keystore.load_session(session_id)?.is_some()));
        self.track(result)
    }

    fn encrypt(&mut self, session_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, EngineError> {
        let result = self.encrypt_one(session_id, plaintext);
        self.track(result)
    }

    fn encrypt_batched(
        &mut self,
        session_ids: &[String],
        plaintext: &[u8],
    ) -> Result<HashMap<String, Vec<u8>>, EngineError> {
        let result = self.encrypt_many(session_ids, plaintext);
        self.track(result)
    }

    fn decrypt(&mut self, session_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, EngineError> {
        let result = self.decrypt_existing(session_id, ciphertext);
        self.track(result)
    }

    fn new_prekey(&mut self, prekey_id: u16) -> Result<Vec<u8>, EngineError> {
        let result = self.prekey(prekey_id);
        self.track(result)
    }

    fn last_resort_prekey(&mut self) -> Result<Vec<u8>, EngineError> {
        let result =
            self.account().and_then(|account| Ok(account.last_resort_bundle().encode()?));
        self.track(result)
    }

    fn last_resort_prekey_id(&mut self) -> Result<u16, EngineError> {
        let result = self.account().map(|_| LAST_RESORT_PREKEY_ID);
        self.track(result)
    }

    fn fingerprint(&mut self) -> Result<String, EngineError> {
        let result = self.account().map(|account| hex::encode(account.identity_key().to_bytes()));
        self.track(result)
    }

    fn fingerprint_remote(&mut self, session_id: &str) -> Result<String, EngineError> {
        let result = self
            .existing_session(session_id)
            .map(|session| hex::encode(session.remote_identity.to_bytes()));
        self.track(result)
    }

    fn fingerprint_prekeybundle(&mut self, prekey: &[u8]) -> Result<String, EngineError> {
        let result = self.account().and_then(|_| {
            let bundle = PrekeyBundle::decode(prekey)?;
            Ok(hex::encode(bundle.identity_key.to_bytes()))
        });
        self.track(result)
    }

    fn cryptobox_migrate(&mut self, path: &Path) -> Result<(), EngineError> {
        let result = self.migrate(path);
        self.track(result)
    }

    fn last_error_code(&self) -> u32 {
        self.last_error
    }
}

impl<K: Keystore> MlsEngine for CoreEngine<K> {
    fn encrypt_message(&mut self, group_id: &[u8], message: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.mls.encrypt_message(group_id, message)
    }
}
