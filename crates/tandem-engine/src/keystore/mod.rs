//! Keystore abstraction for engine state
//!
//! The engine persists two kinds of opaque blobs: the local account (identity
//! and prekeys) and one record per pairwise session, keyed by the canonical
//! raw session id. Blobs are already encrypted by the engine before they get
//! here, so implementations never see key material in the clear.
//!
//! The trait is synchronous. Every call happens inside an engine operation,
//! which is already serialized by the engine handle.

mod memory;
mod redb;

pub use memory::MemoryKeystore;
use thiserror::Error;

pub use self::redb::RedbKeystore;

/// Keystore failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeystoreError {
    /// Underlying store could not be read or written
    #[error("keystore I/O error: {0}")]
    Io(String),

    /// Shared in-memory state was poisoned by a panicking writer
    #[error("keystore lock poisoned")]
    Poisoned,
}

/// Persisted store for account and session blobs.
///
/// Must be Clone (engines and tools can share one store), Send + Sync, and
/// synchronous. Implementations share internal state via Arc, so clones
/// access the same underlying data.
pub trait Keystore: Clone + Send + Sync + 'static {
    /// Load the account blob. `None` on a fresh store.
    fn load_account(&self) -> Result<Option<Vec<u8>>, KeystoreError>;

    /// Store the account blob, replacing any previous one.
    fn store_account(&self, account: &[u8]) -> Result<(), KeystoreError>;

    /// Load the session blob stored under `session_id`.
    fn load_session(&self, session_id: &str) -> Result<Option<Vec<u8>>, KeystoreError>;

    /// Store a session blob, replacing any previous one under the same key.
    fn store_session(&self, session_id: &str, session: &[u8]) -> Result<(), KeystoreError>;

    /// Remove a session. Returns whether a session was stored under the key.
    fn delete_session(&self, session_id: &str) -> Result<bool, KeystoreError>;

    /// Keys of all stored sessions. Order is not guaranteed.
    fn list_sessions(&self) -> Result<Vec<String>, KeystoreError>;
}
