//! MLS application messages through the service layer.
//!
//! Group setup goes through `CoreEngine::mls_mut` under the handle; message
//! encryption goes through `MlsEncryptionService`.

use std::sync::Arc;

use tandem_core::{
    EngineHandle, MlsEncryptionError, MlsEncryptionService, MlsEncryptionServiceInterface,
    MlsGroupId,
};
use tandem_engine::{CoreEngine, EngineConfig, MemoryKeystore};

type Handle = Arc<EngineHandle<CoreEngine<MemoryKeystore>>>;

fn member(name: &str) -> Handle {
    let config = EngineConfig::new(name.as_bytes().to_vec(), [1; 32]);
    Arc::new(EngineHandle::new(CoreEngine::new(config, MemoryKeystore::new()).unwrap()))
}

/// `owner` creates `group` and adds every joiner.
fn form_group(group: &MlsGroupId, owner: &Handle, joiners: &[&Handle]) {
    owner.perform(|engine| engine.mls_mut().create_group(group.as_bytes())).unwrap();

    for joiner in joiners {
        let key_package = joiner.perform(|engine| engine.mls_mut().generate_key_package()).unwrap();
        let welcome = owner
            .perform(|engine| engine.mls_mut().add_members(group.as_bytes(), &[key_package]))
            .unwrap();
        let joined = joiner.perform(|engine| engine.mls_mut().join_from_welcome(&welcome)).unwrap();
        assert_eq!(joined, group.as_bytes());
    }
}

/// INVARIANT: Every member decrypts what any member encrypts.
#[test]
fn members_exchange_application_messages() {
    let group = MlsGroupId::new(b"team-room".to_vec());
    let alice = member("alice");
    let bob = member("bob");
    form_group(&group, &alice, &[&bob]);

    let alice_mls = MlsEncryptionService::new(Arc::clone(&alice));
    let bob_mls = MlsEncryptionService::new(Arc::clone(&bob));

    let ciphertext = alice_mls.encrypt(b"hello group", &group).unwrap();
    let plaintext =
        bob.perform(|engine| engine.mls_mut().decrypt_message(group.as_bytes(), &ciphertext));
    assert_eq!(plaintext.unwrap(), Some(b"hello group".to_vec()));

    let ciphertext = bob_mls.encrypt(b"hello alice", &group).unwrap();
    let plaintext =
        alice.perform(|engine| engine.mls_mut().decrypt_message(group.as_bytes(), &ciphertext));
    assert_eq!(plaintext.unwrap(), Some(b"hello alice".to_vec()));
}

#[test]
fn ciphertext_hides_plaintext() {
    let group = MlsGroupId::new(b"quiet".to_vec());
    let alice = member("alice");
    form_group(&group, &alice, &[]);

    let ciphertext =
        MlsEncryptionService::new(Arc::clone(&alice)).encrypt(b"secret words", &group).unwrap();

    assert!(!ciphertext.windows(b"secret words".len()).any(|w| w == b"secret words"));
}

#[test]
fn unknown_group_fails() {
    let alice = member("alice");
    let service = MlsEncryptionService::new(alice);

    let result = service.encrypt(b"hi", &MlsGroupId::new(b"nowhere".to_vec()));

    assert_eq!(result, Err(MlsEncryptionError::FailedToEncryptMessage));
}

#[test]
fn third_member_joins_later_epoch() {
    let group = MlsGroupId::new(b"growing".to_vec());
    let alice = member("alice");
    let bob = member("bob");
    let carol = member("carol");
    form_group(&group, &alice, &[&bob]);

    // Bob never receives the commit adding carol and stays one epoch behind
    let key_package = carol.perform(|engine| engine.mls_mut().generate_key_package()).unwrap();
    let welcome = alice
        .perform(|engine| engine.mls_mut().add_members(group.as_bytes(), &[key_package]))
        .unwrap();
    carol.perform(|engine| engine.mls_mut().join_from_welcome(&welcome)).unwrap();

    let epoch = |handle: &Handle| handle.perform(|engine| engine.mls().epoch(group.as_bytes()));
    assert_eq!(epoch(&alice).unwrap(), 2);
    assert_eq!(epoch(&carol).unwrap(), 2);
    assert_eq!(epoch(&bob).unwrap(), 1);

    let ciphertext = MlsEncryptionService::new(Arc::clone(&alice)).encrypt(b"hi", &group).unwrap();
    let plaintext =
        carol.perform(|engine| engine.mls_mut().decrypt_message(group.as_bytes(), &ciphertext));
    assert_eq!(plaintext.unwrap(), Some(b"hi".to_vec()));
}
