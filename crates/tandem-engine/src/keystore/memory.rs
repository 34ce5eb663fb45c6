#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{Keystore, KeystoreError};

/// In-memory keystore for tests and ephemeral engines.
///
/// All state sits behind one `Arc<Mutex<..>>`, so clones share it. A poisoned
/// lock is reported as [`KeystoreError::Poisoned`] rather than panicking.
#[derive(Clone, Default)]
pub struct MemoryKeystore {
    inner: Arc<Mutex<MemoryKeystoreInner>>,
}

#[derive(Default)]
struct MemoryKeystoreInner {
    account: Option<Vec<u8>>,
    sessions: HashMap<String, Vec<u8>>,
}

impl MemoryKeystore {
    /// Create an empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn session_count(&self) -> Result<usize, KeystoreError> {
        Ok(self.lock()?.sessions.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryKeystoreInner>, KeystoreError> {
        self.inner.lock().map_err(|_| KeystoreError::Poisoned)
    }
}

impl Keystore for MemoryKeystore {
    fn load_account(&self) -> Result<Option<Vec<u8>>, KeystoreError> {
        Ok(self.lock()?.account.clone())
    }

    fn store_account(&self, account: &[u8]) -> Result<(), KeystoreError> {
        self.lock()?.account = Some(account.to_vec());
        Ok(())
    }

    fn load_session(&self, session_id: &str) -> Result<Option<Vec<u8>>, KeystoreError> {
        Ok(self.lock()?.sessions.get(session_id).cloned())
    }

    fn store_session(&self, session_id: &str, session: &[u8]) -> Result<(), KeystoreError> {
        self.lock()?.sessions.insert(session_id.to_owned(), session.to_vec());
        Ok(())
    }

    fn delete_session(&self, session_id: &str) -> Result<bool, KeystoreError> {
        Ok(self.lock()?.sessions.remove(session_id).is_some())
    }

    fn list_sessions(&self) -> Result<Vec<String>, KeystoreError> {
        Ok(self.lock()?.sessions.keys().cloned().collect())
    }
}
