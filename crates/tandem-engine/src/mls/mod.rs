//! MLS side of the engine.
//!
//! One signing identity per engine, any number of groups keyed by group id.
//! Commits created locally are merged immediately: this engine has no
//! delivery service to wait on.

mod provider;

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use openmls::{
    key_packages::KeyPackageIn,
    prelude::{MlsMessageIn, *},
};
use openmls_basic_credential::SignatureKeyPair;
pub use provider::MlsProvider;
use tandem_core::EngineError;
use tls_codec::{Deserialize, Serialize};

/// Groups and signing identity of the local client.
pub struct MlsState {
    provider: MlsProvider,
    signer: SignatureKeyPair,
    client_identity: Vec<u8>,
    ciphersuite: Ciphersuite,
    groups: HashMap<Vec<u8>, MlsGroup>,
}

fn crypto(context: &str, error: impl std::fmt::Display) -> EngineError {
    EngineError::Crypto(format!("{context}: {error}"))
}

fn decode(context: &str, error: impl std::fmt::Display) -> EngineError {
    EngineError::Decode(format!("{context}: {error}"))
}

fn group_not_found(group_id: &[u8]) -> EngineError {
    EngineError::GroupNotFound(STANDARD.encode(group_id))
}

impl MlsState {
    /// Create the signing identity for `client_identity`.
    pub fn new(client_identity: Vec<u8>, ciphersuite: Ciphersuite) -> Result<Self, EngineError> {
        let signer = SignatureKeyPair::new(ciphersuite.signature_algorithm())
            .map_err(|e| crypto("failed to generate signature keypair", e))?;

        Ok(Self {
            provider: MlsProvider::default(),
            signer,
            client_identity,
            ciphersuite,
            groups: HashMap::new(),
        })
    }

    fn credential_with_key(&self) -> CredentialWithKey {
        CredentialWithKey {
            credential: BasicCredential::new(self.client_identity.clone()).into(),
            signature_key: self.signer.public().into(),
        }
    }

    /// Whether a group with this id exists.
    pub fn has_group(&self, group_id: &[u8]) -> bool {
        self.groups.contains_key(group_id)
    }

    /// Current epoch of a group.
    pub fn epoch(&self, group_id: &[u8]) -> Result<u64, EngineError> {
        self.groups
            .get(group_id)
            .map(|group| group.epoch().as_u64())
            .ok_or_else(|| group_not_found(group_id))
    }

    /// Create a group with the local client as its only member.
    pub fn create_group(&mut self, group_id: &[u8]) -> Result<(), EngineError> {
        if self.groups.contains_key(group_id) {
            return Err(crypto("failed to create group", "group already exists"));
        }

        let config = MlsGroupCreateConfig::builder()
            .ciphersuite(self.ciphersuite)
            .use_ratchet_tree_extension(true)
            .build();

        let group = MlsGroup::new_with_group_id(
            &self.provider,
            &self.signer,
            &config,
            GroupId::from_slice(group_id),
            self.credential_with_key(),
        )
        .map_err(|e| crypto("failed to create group", e))?;

        self.groups.insert(group_id.to_vec(), group);
        Ok(())
    }

    /// Serialized key package others can use to add this client.
    pub fn generate_key_package(&mut self) -> Result<Vec<u8>, EngineError> {
        let bundle = KeyPackage::builder()
            .build(self.ciphersuite, &self.provider, &self.signer, self.credential_with_key())
            .map_err(|e| crypto("failed to build key package", e))?;

        bundle
            .key_package()
            .tls_serialize_detached()
            .map_err(|e| crypto("failed to serialize key package", e))
    }

    /// Add members by serialized key package. Returns the Welcome message.
    pub fn add_members(
        &mut self,
        group_id: &[u8],
        key_packages: &[Vec<u8>],
    ) -> Result<Vec<u8>, EngineError> {
        let key_packages = key_packages
            .iter()
            .map(|bytes| {
                let key_package = KeyPackageIn::tls_deserialize(&mut bytes.as_slice())
                    .map_err(|e| decode("invalid key package", e))?;
                key_package
                    .validate(self.provider.crypto(), ProtocolVersion::Mls10)
                    .map_err(|e| crypto("invalid key package signature", e))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let group = self.groups.get_mut(group_id).ok_or_else(|| group_not_found(group_id))?;

        let (_commit, welcome, _group_info) = group
            .add_members(&self.provider, &self.signer, &key_packages)
            .map_err(|e| crypto("failed to add members", e))?;
        group
            .merge_pending_commit(&self.provider)
            .map_err(|e| crypto("failed to merge commit", e))?;

        welcome.tls_serialize_detached().map_err(|e| crypto("failed to serialize welcome", e))
    }

    /// Join a group from a Welcome. Returns the group id.
    pub fn join_from_welcome(&mut self, welcome: &[u8]) -> Result<Vec<u8>, EngineError> {
        let message = MlsMessageIn::tls_deserialize(&mut &welcome[..])
            .map_err(|e| decode("failed to deserialize welcome", e))?;

        let MlsMessageBodyIn::Welcome(welcome) = message.extract() else {
            return Err(EngineError::Decode("message is not a welcome".to_owned()));
        };

        let config = MlsGroupJoinConfig::builder().use_ratchet_tree_extension(true).build();
        let group = StagedWelcome::new_from_welcome(&self.provider, &config, welcome, None)
            .map_err(|e| crypto("failed to stage welcome", e))?
            .into_group(&self.provider)
            .map_err(|e| crypto("failed to join group from welcome", e))?;

        let group_id = group.group_id().as_slice().to_vec();
        self.groups.insert(group_id.clone(), group);

        Ok(group_id)
    }

    /// Encrypt an application message.
    pub fn encrypt_message(
        &mut self,
        group_id: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        let group = self.groups.get_mut(group_id).ok_or_else(|| group_not_found(group_id))?;

        group
            .create_message(&self.provider, &self.signer, message)
            .map_err(|e| crypto("failed to create message", e))?
            .tls_serialize_detached()
            .map_err(|e| crypto("failed to serialize message", e))
    }

    /// Process an incoming group message.
    ///
    /// Returns the plaintext of an application message. Commits are merged
    /// and yield `None`; proposals are stored for a later commit.
    pub fn decrypt_message(
        &mut self,
        group_id: &[u8],
        message: &[u8],
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let group = self.groups.get_mut(group_id).ok_or_else(|| group_not_found(group_id))?;

        let message = MlsMessageIn::tls_deserialize_exact(message)
            .map_err(|e| decode("failed to deserialize message", e))?;
        let protocol_message: ProtocolMessage =
            message.try_into().map_err(|e| decode("invalid message type", format!("{e:?}")))?;

        let processed = group
            .process_message(&self.provider, protocol_message)
            .map_err(|e| crypto("failed to process message", e))?;

        match processed.into_content() {
            ProcessedMessageContent::ApplicationMessage(message) => Ok(Some(message.into_bytes())),
            ProcessedMessageContent::StagedCommitMessage(commit) => {
                group
                    .merge_staged_commit(&self.provider, *commit)
                    .map_err(|e| crypto("failed to merge commit", e))?;
                Ok(None)
            },
            ProcessedMessageContent::ProposalMessage(proposal) => {
                group
                    .store_pending_proposal(self.provider.storage(), *proposal)
                    .map_err(|e| crypto("failed to store proposal", e))?;
                Ok(None)
            },
            ProcessedMessageContent::ExternalJoinProposalMessage(_) => Ok(None),
        }
    }
}
