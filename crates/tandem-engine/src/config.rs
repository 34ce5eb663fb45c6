//! Engine configuration.

use openmls::prelude::Ciphersuite;
use zeroize::Zeroize;

/// Length of the at-rest pickle key.
pub const PICKLE_KEY_LEN: usize = 32;

/// Configuration for a [`crate::CoreEngine`].
///
/// ```
/// use tandem_engine::EngineConfig;
///
/// let config = EngineConfig::new(b"alice@example.com/phone".to_vec(), [7; 32])
///     .with_legacy_passphrase("old secret");
/// assert_eq!(config.legacy_passphrase(), b"old secret");
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    client_identity: Vec<u8>,
    pickle_key: [u8; PICKLE_KEY_LEN],
    legacy_passphrase: Vec<u8>,
    ciphersuite: Ciphersuite,
}

impl EngineConfig {
    /// Configuration with the default ciphersuite and no legacy passphrase.
    ///
    /// `client_identity` becomes the MLS basic credential. `pickle_key`
    /// encrypts every account and session record before it is stored.
    pub fn new(client_identity: Vec<u8>, pickle_key: [u8; PICKLE_KEY_LEN]) -> Self {
        Self {
            client_identity,
            pickle_key,
            legacy_passphrase: Vec::new(),
            ciphersuite: Ciphersuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519,
        }
    }

    /// Passphrase of libolm-format pickles in a legacy store.
    #[must_use]
    pub fn with_legacy_passphrase(mut self, passphrase: impl Into<Vec<u8>>) -> Self {
        self.legacy_passphrase = passphrase.into();
        self
    }

    /// MLS ciphersuite for new groups and key packages.
    #[must_use]
    pub fn with_ciphersuite(mut self, ciphersuite: Ciphersuite) -> Self {
        self.ciphersuite = ciphersuite;
        self
    }

    /// MLS credential identity.
    pub fn client_identity(&self) -> &[u8] {
        &self.client_identity
    }

    /// At-rest pickle key.
    pub fn pickle_key(&self) -> &[u8; PICKLE_KEY_LEN] {
        &self.pickle_key
    }

    /// Legacy libolm pickle passphrase. Empty if unset.
    pub fn legacy_passphrase(&self) -> &[u8] {
        &self.legacy_passphrase
    }

    /// MLS ciphersuite.
    pub fn ciphersuite(&self) -> Ciphersuite {
        self.ciphersuite
    }
}

impl Drop for EngineConfig {
    fn drop(&mut self) {
        self.pickle_key.zeroize();
        self.legacy_passphrase.zeroize();
    }
}

// Keys stay out of logs and panic messages
impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("client_identity", &String::from_utf8_lossy(&self.client_identity))
            .field("ciphersuite", &self.ciphersuite)
            .finish_non_exhaustive()
    }
}
