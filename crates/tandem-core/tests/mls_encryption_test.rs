//! MLS encryption service against a scripted engine.

use std::sync::Arc;

use tandem_core::{
    EngineError, EngineHandle, MlsEncryptionError, MlsEncryptionService,
    MlsEncryptionServiceInterface, MlsGroupId,
    test_utils::{EngineCall, MockEngine},
};

#[test]
fn encrypt_passes_group_and_message() {
    let engine = MockEngine::new().with_mls_encrypt_message(|group, message| {
        let mut out = group;
        out.extend(message);
        Ok(out)
    });
    let handle = Arc::new(EngineHandle::new(engine));
    let service = MlsEncryptionService::new(Arc::clone(&handle));
    let group = MlsGroupId::new(vec![0xAB, 0xCD]);

    let ciphertext = service.encrypt(b"hi", &group).unwrap();

    assert_eq!(ciphertext, vec![0xAB, 0xCD, b'h', b'i']);
    let calls = handle.perform(|engine| engine.calls().to_vec());
    assert_eq!(
        calls,
        vec![EngineCall::MlsEncryptMessage { group_id: vec![0xAB, 0xCD], message: b"hi".to_vec() }]
    );
}

#[test]
fn encrypt_failure_maps_to_single_variant() {
    let engine = MockEngine::new().with_mls_encrypt_message(|group, _| {
        Err(EngineError::GroupNotFound(format!("{group:?}")))
    });
    let service = MlsEncryptionService::new(Arc::new(EngineHandle::new(engine)));

    let result = service.encrypt(b"hi", &MlsGroupId::new(vec![1]));

    assert_eq!(result, Err(MlsEncryptionError::FailedToEncryptMessage));
}

/// Both services can share one engine handle.
#[test]
fn services_share_one_engine() {
    use tandem_core::{ProteusService, ProteusServiceInterface};

    let engine = MockEngine::new()
        .with_mls_encrypt_message(|_, m| Ok(m))
        .with_encrypt(|_, m| Ok(m));
    let handle = Arc::new(EngineHandle::new(engine));
    let mls = MlsEncryptionService::new(Arc::clone(&handle));
    let proteus = ProteusService::new(Arc::clone(&handle));

    mls.encrypt(b"group", &MlsGroupId::new(vec![7])).unwrap();
    proteus.encrypt(b"pair", &tandem_core::ProteusSessionId::without_domain("u", "c")).unwrap();

    let calls = handle.perform(|engine| engine.calls().to_vec());
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], EngineCall::MlsEncryptMessage { .. }));
    assert!(matches!(calls[1], EngineCall::Encrypt { .. }));
}
