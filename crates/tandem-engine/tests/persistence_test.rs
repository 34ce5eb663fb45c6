//! Engine state across restarts and legacy imports.
//!
//! A restarted engine must resume every ratchet exactly where the previous
//! process left it. A legacy store is imported whole or not at all.

use std::{fs, path::Path, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tandem_core::{
    EngineHandle, InitializationError, MigrationError, ProteusService, ProteusServiceInterface,
    ProteusSessionId,
};
use tandem_engine::{
    CoreEngine, EngineConfig, Keystore, MemoryKeystore, RedbKeystore, proteus::envelope,
};
use vodozemac::olm::{Account, OlmMessage, SessionConfig};

const PICKLE_KEY: [u8; 32] = [0x42; 32];

fn service<K: Keystore>(keystore: K, config: EngineConfig) -> ProteusService<CoreEngine<K>> {
    let engine = CoreEngine::new(config, keystore).unwrap();
    ProteusService::new(Arc::new(EngineHandle::new(engine)))
}

fn config(name: &str) -> EngineConfig {
    EngineConfig::new(name.as_bytes().to_vec(), PICKLE_KEY)
}

fn redb_service(path: &Path) -> ProteusService<CoreEngine<RedbKeystore>> {
    service(RedbKeystore::open(path).unwrap(), config("alice"))
}

fn memory_service(name: &str) -> ProteusService<CoreEngine<MemoryKeystore>> {
    let proteus = service(MemoryKeystore::new(), config(name));
    proteus.complete_initialization().unwrap();
    proteus
}

fn id(user: &str) -> ProteusSessionId {
    ProteusSessionId::new("example.com", user, "desktop")
}

/// INVARIANT: Identity and sessions survive a process restart.
#[test]
fn redb_engine_resumes_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keystore.redb");
    let bob = memory_service("bob");

    let fingerprint = {
        let alice = redb_service(&path);
        alice.complete_initialization().unwrap();
        let prekey = bob.generate_prekey(1).unwrap();
        alice.establish_session(&id("bob"), &prekey).unwrap();

        let hello = alice.encrypt(b"before restart", &id("bob")).unwrap();
        assert_eq!(bob.decrypt(&hello, &id("alice")).unwrap().plaintext, b"before restart");

        alice.local_fingerprint().unwrap()
    };

    let alice = redb_service(&path);
    alice.complete_initialization().unwrap();

    assert_eq!(alice.local_fingerprint().unwrap(), fingerprint);
    assert!(alice.session_exists(&id("bob")));

    let reply = bob.encrypt(b"welcome back", &id("alice")).unwrap();
    let received = alice.decrypt(&reply, &id("bob")).unwrap();
    assert!(!received.did_create_session);
    assert_eq!(received.plaintext, b"welcome back");

    let hello = alice.encrypt(b"after restart", &id("bob")).unwrap();
    assert_eq!(bob.decrypt(&hello, &id("alice")).unwrap().plaintext, b"after restart");
}

/// INVARIANT: A consumed prekey stays consumed after restart.
#[test]
fn consumed_prekey_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keystore.redb");
    let carol = memory_service("carol");
    let dave = memory_service("dave");

    {
        let alice = redb_service(&path);
        alice.complete_initialization().unwrap();
        let prekey = alice.generate_prekey(5).unwrap();
        carol.establish_session(&id("alice"), &prekey).unwrap();
        dave.establish_session(&id("alice"), &prekey).unwrap();

        let hello = carol.encrypt(b"hi", &id("alice")).unwrap();
        assert!(alice.decrypt(&hello, &id("carol")).unwrap().did_create_session);
    }

    let alice = redb_service(&path);
    alice.complete_initialization().unwrap();
    let hello = dave.encrypt(b"hi", &id("alice")).unwrap();

    assert!(alice.decrypt(&hello, &id("dave")).is_err());
}

#[test]
fn wrong_pickle_key_fails_initialization() {
    let keystore = MemoryKeystore::new();
    service(keystore.clone(), config("alice")).complete_initialization().unwrap();

    let other_key = EngineConfig::new(b"alice".to_vec(), [0; 32]);
    let result = service(keystore, other_key).complete_initialization();

    assert_eq!(result, Err(InitializationError::EngineNotReady));
}

/// Write a legacy store holding `account` and one outbound session to `peer`.
fn write_legacy_store(dir: &Path, account: &Account, peer: &Account, session_id: &str) {
    let peer_identity = peer.curve25519_key();
    let one_time_key = peer.one_time_keys().values().copied().next().unwrap();
    let session =
        account.create_outbound_session(SessionConfig::version_2(), peer_identity, one_time_key);

    fs::write(dir.join("identity.pickle"), serde_json::to_string(&account.pickle()).unwrap())
        .unwrap();

    let record = serde_json::json!({
        "remote_identity": STANDARD.encode(peer_identity.to_bytes()),
        "pickle": session.pickle(),
    });
    fs::create_dir_all(dir.join("sessions")).unwrap();
    fs::write(dir.join("sessions").join(session_id), record.to_string()).unwrap();
}

/// INVARIANT: Imported sessions keep working with the original peer.
#[test]
fn legacy_store_is_imported() {
    let dir = tempfile::tempdir().unwrap();
    let legacy_account = Account::new();
    let mut peer = Account::new();
    peer.generate_one_time_keys(1);
    let peer_id = id("peer");
    write_legacy_store(dir.path(), &legacy_account, &peer, &peer_id.raw_value());

    let keystore = MemoryKeystore::new();
    let alice = service(keystore.clone(), config("alice"));
    alice.migrate_legacy_sessions(dir.path()).unwrap();

    // Migration installs the legacy identity without a separate init
    let expected = vodozemac_fingerprint(&legacy_account);
    assert_eq!(alice.local_fingerprint().unwrap(), expected);
    assert_eq!(keystore.session_count().unwrap(), 1);
    assert_eq!(alice.remote_fingerprint(&peer_id).unwrap(), vodozemac_fingerprint(&peer));

    // The imported ratchet still produces messages the peer can open
    let sealed = alice.encrypt(b"migrated", &peer_id).unwrap();
    let OlmMessage::PreKey(message) = envelope::decode(&sealed).unwrap() else {
        panic!("first message of an outbound session is a pre-key message");
    };
    let inbound = peer.create_inbound_session(legacy_account.curve25519_key(), &message).unwrap();
    assert_eq!(inbound.plaintext, b"migrated");

    // And the identity persists for a later init
    alice.complete_initialization().unwrap();
    assert_eq!(alice.local_fingerprint().unwrap(), expected);
}

/// INVARIANT: A broken legacy store writes nothing.
#[test]
fn broken_legacy_store_is_rejected_whole() {
    let dir = tempfile::tempdir().unwrap();
    let mut peer = Account::new();
    peer.generate_one_time_keys(1);
    write_legacy_store(dir.path(), &Account::new(), &peer, &id("peer").raw_value());
    fs::write(dir.path().join("sessions").join("friend_phone"), "{ not json").unwrap();

    let keystore = MemoryKeystore::new();
    let alice = service(keystore.clone(), config("alice"));

    assert_eq!(
        alice.migrate_legacy_sessions(dir.path()),
        Err(MigrationError::FailedToMigrateData)
    );
    assert_eq!(keystore.session_count().unwrap(), 0);
    assert_eq!(keystore.load_account().unwrap(), None);
}

#[test]
fn missing_legacy_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let alice = service(MemoryKeystore::new(), config("alice"));

    let result = alice.migrate_legacy_sessions(&dir.path().join("cryptobox"));

    assert_eq!(result, Err(MigrationError::FailedToMigrateData));
}

fn vodozemac_fingerprint(account: &Account) -> String {
    hex::encode(account.curve25519_key().to_bytes())
}
