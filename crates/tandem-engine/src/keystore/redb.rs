//! Redb-backed durable keystore.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Each
//! mutation is its own write transaction, so a session update is either
//! fully persisted or not at all.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};

use super::{Keystore, KeystoreError};

/// Table: account
/// Key: fixed `ACCOUNT_KEY`
/// Value: engine-encoded account record
const ACCOUNT: TableDefinition<&str, &[u8]> = TableDefinition::new("account");

/// Table: sessions
/// Key: canonical raw session id
/// Value: engine-encoded session record
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

const ACCOUNT_KEY: &str = "local";

/// Durable keystore backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbKeystore {
    db: Arc<Database>,
}

fn io(error: impl std::fmt::Display) -> KeystoreError {
    KeystoreError::Io(error.to_string())
}

impl RedbKeystore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the `account` and `sessions` tables if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeystoreError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(ACCOUNT).map_err(io)?;
            let _ = txn.open_table(SESSIONS).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Keystore for RedbKeystore {
    fn load_account(&self) -> Result<Option<Vec<u8>>, KeystoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(ACCOUNT).map_err(io)?;

        Ok(table.get(ACCOUNT_KEY).map_err(io)?.map(|value| value.value().to_vec()))
    }

    fn store_account(&self, account: &[u8]) -> Result<(), KeystoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(ACCOUNT).map_err(io)?;
            table.insert(ACCOUNT_KEY, account).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn load_session(&self, session_id: &str) -> Result<Option<Vec<u8>>, KeystoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(SESSIONS).map_err(io)?;

        Ok(table.get(session_id).map_err(io)?.map(|value| value.value().to_vec()))
    }

    fn store_session(&self, session_id: &str, session: &[u8]) -> Result<(), KeystoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(SESSIONS).map_err(io)?;
            table.insert(session_id, session).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn delete_session(&self, session_id: &str) -> Result<bool, KeystoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        let existed = {
            let mut table = txn.open_table(SESSIONS).map_err(io)?;
            table.remove(session_id).map_err(io)?.is_some()
        };
        txn.commit().map_err(io)?;

        Ok(existed)
    }

    fn list_sessions(&self) -> Result<Vec<String>, KeystoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(SESSIONS).map_err(io)?;

        let mut sessions = Vec::new();
        for entry in table.iter().map_err(io)? {
            let (key, _) = entry.map_err(io)?;
            sessions.push(key.value().to_owned());
        }

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keystore.redb");

        {
            let store = RedbKeystore::open(&path).unwrap();
            store.store_account(b"account").unwrap();
            store.store_session("example.com_alice_phone", b"session").unwrap();
        }

        let store = RedbKeystore::open(&path).unwrap();
        assert_eq!(store.load_account().unwrap(), Some(b"account".to_vec()));
        assert_eq!(
            store.load_session("example.com_alice_phone").unwrap(),
            Some(b"session".to_vec())
        );
    }
}
