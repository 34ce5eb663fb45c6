//! Scriptable engine double.
//!
//! [`MockEngine`] implements both capability traits. Each method answers
//! from a closure installed with the matching `with_*` builder; methods
//! without a stub fail with [`EngineError::Crypto`]. Every call is recorded
//! in order as an [`EngineCall`], so tests can assert both what reached the
//! engine and what did not.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::engine::{EngineError, MlsEngine, ProteusEngine};

type Stub<A, R> = Box<dyn FnMut(A) -> Result<R, EngineError> + Send>;

/// One recorded engine invocation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum EngineCall {
    ProteusInit,
    SessionFromPrekey { session_id: String, prekey: Vec<u8> },
    SessionFromMessage { session_id: String, envelope: Vec<u8> },
    SessionDelete { session_id: String },
    SessionExists { session_id: String },
    Encrypt { session_id: String, plaintext: Vec<u8> },
    EncryptBatched { session_ids: Vec<String>, plaintext: Vec<u8> },
    Decrypt { session_id: String, ciphertext: Vec<u8> },
    NewPrekey { prekey_id: u16 },
    LastResortPrekey,
    LastResortPrekeyId,
    Fingerprint,
    FingerprintRemote { session_id: String },
    FingerprintPrekeybundle { prekey: Vec<u8> },
    CryptoboxMigrate { path: PathBuf },
    MlsEncryptMessage { group_id: Vec<u8>, message: Vec<u8> },
}

/// Engine double answering from installed closures.
#[derive(Default)]
pub struct MockEngine {
    calls: Vec<EngineCall>,
    last_error_code: u32,
    proteus_init: Option<Stub<(), ()>>,
    session_from_prekey: Option<Stub<(String, Vec<u8>), ()>>,
    session_from_message: Option<Stub<(String, Vec<u8>), Vec<u8>>>,
    session_delete: Option<Stub<String, ()>>,
    session_exists: Option<Stub<String, bool>>,
    encrypt: Option<Stub<(String, Vec<u8>), Vec<u8>>>,
    encrypt_batched: Option<Stub<(Vec<String>, Vec<u8>), HashMap<String, Vec<u8>>>>,
    decrypt: Option<Stub<(String, Vec<u8>), Vec<u8>>>,
    new_prekey: Option<Stub<u16, Vec<u8>>>,
    last_resort_prekey: Option<Stub<(), Vec<u8>>>,
    last_resort_prekey_id: Option<Stub<(), u16>>,
    fingerprint: Option<Stub<(), String>>,
    fingerprint_remote: Option<Stub<String, String>>,
    fingerprint_prekeybundle: Option<Stub<Vec<u8>, String>>,
    cryptobox_migrate: Option<Stub<PathBuf, ()>>,
    mls_encrypt_message: Option<Stub<(Vec<u8>, Vec<u8>), Vec<u8>>>,
}

fn answer<A, R>(stub: &mut Option<Stub<A, R>>, name: &str, args: A) -> Result<R, EngineError> {
    match stub {
        Some(stub) => stub(args),
        None => Err(EngineError::Crypto(format!("no stub for {name}"))),
    }
}

impl MockEngine {
    /// Engine with no stubs installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Set the code reported by `last_error_code`.
    pub fn set_last_error_code(&mut self, code: u32) {
        self.last_error_code = code;
    }

    /// Builder form of [`Self::set_last_error_code`].
    #[must_use]
    pub fn with_last_error_code(mut self, code: u32) -> Self {
        self.last_error_code = code;
        self
    }

    /// Stub `proteus_init`.
    #[must_use]
    pub fn with_proteus_init(
        mut self,
        mut stub: impl FnMut() -> Result<(), EngineError> + Send + 'static,
    ) -> Self {
        self.proteus_init = Some(Box::new(move |()| stub()));
        self
    }

    /// Stub `session_from_prekey`.
    #[must_use]
    pub fn with_session_from_prekey(
        mut self,
        mut stub: impl FnMut(String, Vec<u8>) -> Result<(), EngineError> + Send + 'static,
    ) -> Self {
        self.session_from_prekey = Some(Box::new(move |(id, prekey)| stub(id, prekey)));
        self
    }

    /// Stub `session_from_message`.
    #[must_use]
    pub fn with_session_from_message(
        mut self,
        mut stub: impl FnMut(String, Vec<u8>) -> Result<Vec<u8>, EngineError> + Send + 'static,
    ) -> Self {
        self.session_from_message = Some(Box::new(move |(id, envelope)| stub(id, envelope)));
        self
    }

    /// Stub `session_delete`.
    #[must_use]
    pub fn with_session_delete(
        mut self,
        stub: impl FnMut(String) -> Result<(), EngineError> + Send + 'static,
    ) -> Self {
        self.session_delete = Some(Box::new(stub));
        self
    }

    /// Stub `session_exists`.
    #[must_use]
    pub fn with_session_exists(
        mut self,
        stub: impl FnMut(String) -> Result<bool, EngineError> + Send + 'static,
    ) -> Self {
        self.session_exists = Some(Box::new(stub));
        self
    }

    /// Stub `encrypt`.
    #[must_use]
    pub fn with_encrypt(
        mut self,
        mut stub: impl FnMut(String, Vec<u8>) -> Result<Vec<u8>, EngineError> + Send + 'static,
    ) -> Self {
        self.encrypt = Some(Box::new(move |(id, plaintext)| stub(id, plaintext)));
        self
    }

    /// Stub `encrypt_batched`.
    #[must_use]
    pub fn with_encrypt_batched(
        mut self,
        mut stub: impl FnMut(Vec<String>, Vec<u8>) -> Result<HashMap<String, Vec<u8>>, EngineError>
        + Send
        + 'static,
    ) -> Self {
        self.encrypt_batched = Some(Box::new(move |(ids, plaintext)| stub(ids, plaintext)));
        self
    }

    /// Stub `decrypt`.
    #[must_use]
    pub fn with_decrypt(
        mut self,
        mut stub: impl FnMut(String, Vec<u8>) -> Result<Vec<u8>, EngineError> + Send + 'static,
    ) -> Self {
        self.decrypt = Some(Box::new(move |(id, ciphertext)| stub(id, ciphertext)));
        self
    }

    /// Stub `new_prekey`.
    #[must_use]
    pub fn with_new_prekey(
        mut self,
        stub: impl FnMut(u16) -> Result<Vec<u8>, EngineError> + Send + 'static,
    ) -> Self {
        self.new_prekey = Some(Box::new(stub));
        self
    }

    /// Stub `last_resort_prekey`.
    #[must_use]
    pub fn with_last_resort_prekey(
        mut self,
        mut stub: impl FnMut() -> Result<Vec<u8>, EngineError> + Send + 'static,
    ) -> Self {
        self.last_resort_prekey = Some(Box::new(move |()| stub()));
        self
    }

    /// Stub `last_resort_prekey_id`.
    #[must_use]
    pub fn with_last_resort_prekey_id(
        mut self,
        mut stub: impl FnMut() -> Result<u16, EngineError> + Send + 'static,
    ) -> Self {
        self.last_resort_prekey_id = Some(Box::new(move |()| stub()));
        self
    }

    /// Stub `fingerprint`.
    #[must_use]
    pub fn with_fingerprint(
        mut self,
        mut stub: impl FnMut() -> Result<String, EngineError> + Send + 'static,
    ) -> Self {
        self.fingerprint = Some(Box::new(move |()| stub()));
        self
    }

    /// Stub `fingerprint_remote`.
    #[must_use]
    pub fn with_fingerprint_remote(
        mut self,
        stub: impl FnMut(String) -> Result<String, EngineError> + Send + 'static,
    ) -> Self {
        self.fingerprint_remote = Some(Box::new(stub));
        self
    }

    /// Stub `fingerprint_prekeybundle`.
    #[must_use]
    pub fn with_fingerprint_prekeybundle(
        mut self,
        stub: impl FnMut(Vec<u8>) -> Result<String, EngineError> + Send + 'static,
    ) -> Self {
        self.fingerprint_prekeybundle = Some(Box::new(stub));
        self
    }

    /// Stub `cryptobox_migrate`.
    #[must_use]
    pub fn with_cryptobox_migrate(
        mut self,
        stub: impl FnMut(PathBuf) -> Result<(), EngineError> + Send + 'static,
    ) -> Self {
        self.cryptobox_migrate = Some(Box::new(stub));
        self
    }

    /// Stub the MLS `encrypt_message`.
    #[must_use]
    pub fn with_mls_encrypt_message(
        mut self,
        mut stub: impl FnMut(Vec<u8>, Vec<u8>) -> Result<Vec<u8>, EngineError> + Send + 'static,
    ) -> Self {
        self.mls_encrypt_message = Some(Box::new(move |(group, message)| stub(group, message)));
        self
    }
}

impl ProteusEngine for MockEngine {
    fn proteus_init(&mut self) -> Result<(), EngineError> {
        self.calls.push(EngineCall::ProteusInit);
        answer(&mut self.proteus_init, "proteus_init", ())
    }

    fn session_from_prekey(&mut self, session_id: &str, prekey: &[u8]) -> Result<(), EngineError> {
        self.calls.push(EngineCall::SessionFromPrekey {
            session_id: session_id.to_owned(),
            prekey: prekey.to_vec(),
        });
        answer(
            &mut self.session_from_prekey,
            "session_from_prekey",
            (session_id.to_owned(), prekey.to_vec()),
        )
    }

    fn session_from_message(
        &mut self,
        session_id: &str,
        envelope: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        self.calls.push(EngineCall::SessionFromMessage {
            session_id: session_id.to_owned(),
            envelope: envelope.to_vec(),
        });
        answer(
            &mut self.session_from_message,
            "session_from_message",
            (session_id.to_owned(), envelope.to_vec()),
        )
    }

    fn session_delete(&mut self, session_id: &str) -> Result<(), EngineError> {
        self.calls.push(EngineCall::SessionDelete { session_id: session_id.to_owned() });
        answer(&mut self.session_delete, "session_delete", session_id.to_owned())
    }

    fn session_exists(&mut self, session_id: &str) -> Result<bool, EngineError> {
        self.calls.push(EngineCall::SessionExists { session_id: session_id.to_owned() });
        answer(&mut self.session_exists, "session_exists", session_id.to_owned())
    }

    fn encrypt(&mut self, session_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.calls.push(EngineCall::Encrypt {
            session_id: session_id.to_owned(),
            plaintext: plaintext.to_vec(),
        });
        answer(&mut self.encrypt, "encrypt", (session_id.to_owned(), plaintext.to_vec()))
    }

    fn encrypt_batched(
        &mut self,
        session_ids: &[String],
        plaintext: &[u8],
    ) -> Result<HashMap<String, Vec<u8>>, EngineError> {
        self.calls.push(EngineCall::EncryptBatched {
            session_ids: session_ids.to_vec(),
            plaintext: plaintext.to_vec(),
        });
        answer(
            &mut self.encrypt_batched,
            "encrypt_batched",
            (session_ids.to_vec(), plaintext.to_vec()),
        )
    }

    fn decrypt(&mut self, session_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.calls.push(EngineCall::Decrypt {
            session_id: session_id.to_owned(),
            ciphertext: ciphertext.to_vec(),
        });
        answer(&mut self.decrypt, "decrypt", (session_id.to_owned(), ciphertext.to_vec()))
    }

    fn new_prekey(&mut self, prekey_id: u16) -> Result<Vec<u8>, EngineError> {
        self.calls.push(EngineCall::NewPrekey { prekey_id });
        answer(&mut self.new_prekey, "new_prekey", prekey_id)
    }

    fn last_resort_prekey(&mut self) -> Result<Vec<u8>, EngineError> {
        self.calls.push(EngineCall::LastResortPrekey);
        answer(&mut self.last_resort_prekey, "last_resort_prekey", ())
    }

    fn last_resort_prekey_id(&mut self) -> Result<u16, EngineError> {
        self.calls.push(EngineCall::LastResortPrekeyId);
        answer(&mut self.last_resort_prekey_id, "last_resort_prekey_id", ())
    }

    fn fingerprint(&mut self) -> Result<String, EngineError> {
        self.calls.push(EngineCall::Fingerprint);
        answer(&mut self.fingerprint, "fingerprint", ())
    }

    fn fingerprint_remote(&mut self, session_id: &str) -> Result<String, EngineError> {
        self.calls.push(EngineCall::FingerprintRemote { session_id: session_id.to_owned() });
        answer(&mut self.fingerprint_remote, "fingerprint_remote", session_id.to_owned())
    }

    fn fingerprint_prekeybundle(&mut self, prekey: &[u8]) -> Result<String, EngineError> {
        self.calls.push(EngineCall::FingerprintPrekeybundle { prekey: prekey.to_vec() });
        answer(&mut self.fingerprint_prekeybundle, "fingerprint_prekeybundle", prekey.to_vec())
    }

    fn cryptobox_migrate(&mut self, path: &Path) -> Result<(), EngineError> {
        self.calls.push(EngineCall::CryptoboxMigrate { path: path.to_path_buf() });
        answer(&mut self.cryptobox_migrate, "cryptobox_migrate", path.to_path_buf())
    }

    fn last_error_code(&self) -> u32 {
        self.last_error_code
    }
}

impl MlsEngine for MockEngine {
    fn encrypt_message(&mut self, group_id: &[u8], message: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.calls.push(EngineCall::MlsEncryptMessage {
            group_id: group_id.to_vec(),
            message: message.to_vec(),
        });
        answer(
            &mut self.mls_encrypt_message,
            "mls_encrypt_message",
            (group_id.to_vec(), message.to_vec()),
        )
    }
}
