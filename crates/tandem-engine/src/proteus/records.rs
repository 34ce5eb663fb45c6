//! At-rest records for the local account and pairwise sessions.
//!
//! Each record is a CBOR map holding a vodozemac pickle encrypted with the
//! configured pickle key plus the public data the engine needs without
//! unpickling (last-resort prekey, remote identity).

use serde::{Deserialize, Serialize};
use vodozemac::{
    Curve25519PublicKey,
    olm::{Account, AccountPickle, Session, SessionPickle},
};

use super::{
    Failure, LAST_RESORT_PREKEY_ID,
    bundle::{PrekeyBundle, curve_key},
};
use crate::config::PICKLE_KEY_LEN;

type PickleKey = [u8; PICKLE_KEY_LEN];

#[derive(Serialize, Deserialize)]
struct StoredAccount {
    pickle: String,
    last_resort: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    pickle: String,
    remote_identity: Vec<u8>,
}

fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, Failure> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(Failure::corrupt_record)?;
    Ok(bytes)
}

/// Local identity with its last-resort prekey.
pub(crate) struct LocalAccount {
    account: Account,
    last_resort: Curve25519PublicKey,
}

impl LocalAccount {
    /// Fresh identity.
    pub(crate) fn generate() -> Result<Self, Failure> {
        Self::from_account(Account::new())
    }

    /// Adopt an existing identity, issuing it a new last-resort prekey.
    pub(crate) fn from_account(mut account: Account) -> Result<Self, Failure> {
        account.generate_fallback_key();
        let last_resort = account
            .fallback_key()
            .into_values()
            .next()
            .ok_or_else(|| Failure::corrupt_record("account did not produce a fallback key"))?;
        account.mark_keys_as_published();

        Ok(Self { account, last_resort })
    }

    pub(crate) fn identity_key(&self) -> Curve25519PublicKey {
        self.account.curve25519_key()
    }

    pub(crate) fn account(&self) -> &Account {
        &self.account
    }

    pub(crate) fn account_mut(&mut self) -> &mut Account {
        &mut self.account
    }

    /// Generate one prekey and return its bundle.
    pub(crate) fn new_prekey(&mut self, id: u16) -> Result<PrekeyBundle, Failure> {
        self.account.generate_one_time_keys(1);
        let prekey = self
            .account
            .one_time_keys()
            .into_values()
            .next()
            .ok_or_else(|| Failure::corrupt_record("account did not produce a one-time key"))?;
        self.account.mark_keys_as_published();

        Ok(PrekeyBundle { id, identity_key: self.identity_key(), prekey })
    }

    pub(crate) fn last_resort_bundle(&self) -> PrekeyBundle {
        PrekeyBundle {
            id: LAST_RESORT_PREKEY_ID,
            identity_key: self.identity_key(),
            prekey: self.last_resort,
        }
    }

    pub(crate) fn seal(&self, key: &PickleKey) -> Result<Vec<u8>, Failure> {
        to_cbor(&StoredAccount {
            pickle: self.account.pickle().encrypt(key),
            last_resort: self.last_resort.to_bytes().to_vec(),
        })
    }

    pub(crate) fn open(bytes: &[u8], key: &PickleKey) -> Result<Self, Failure> {
        let stored: StoredAccount =
            ciborium::from_reader(bytes).map_err(Failure::corrupt_record)?;
        let pickle =
            AccountPickle::from_encrypted(&stored.pickle, key).map_err(Failure::corrupt_record)?;
        let last_resort =
            curve_key("last_resort", &stored.last_resort).map_err(Failure::corrupt_record)?;

        Ok(Self { account: Account::from_pickle(pickle), last_resort })
    }
}

/// Ratchet state of one pairwise session and the identity it is bound to.
pub(crate) struct PeerSession {
    pub(crate) session: Session,
    pub(crate) remote_identity: Curve25519PublicKey,
}

impl PeerSession {
    pub(crate) fn seal(&self, key: &PickleKey) -> Result<Vec<u8>, Failure> {
        to_cbor(&StoredSession {
            pickle: self.session.pickle().encrypt(key),
            remote_identity: self.remote_identity.to_bytes().to_vec(),
        })
    }

    pub(crate) fn open(bytes: &[u8], key: &PickleKey) -> Result<Self, Failure> {
        let stored: StoredSession =
            ciborium::from_reader(bytes).map_err(Failure::corrupt_record)?;
        let pickle =
            SessionPickle::from_encrypted(&stored.pickle, key).map_err(Failure::corrupt_record)?;
        let remote_identity = curve_key("remote_identity", &stored.remote_identity)
            .map_err(Failure::corrupt_record)?;

        Ok(Self { session: Session::from_pickle(pickle), remote_identity })
    }
}
