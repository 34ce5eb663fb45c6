//! Reader for legacy on-disk session stores.
//!
//! Layout:
//!
//! ```text
//! <dir>/identity.pickle          local account pickle
//! <dir>/sessions/<raw id>        one JSON record per session
//! ```
//!
//! A session record is `{ "remote_identity": <base64 key>, "pickle": <p> }`
//! where `p` is either a libolm pickle string or a vodozemac JSON pickle
//! object. The account pickle file holds either form as text.
//!
//! The whole store is read and validated before the caller writes anything.

use std::{fs, path::Path};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tandem_core::ProteusSessionId;
use vodozemac::{
    Curve25519PublicKey,
    olm::{Account, AccountPickle, Session, SessionPickle},
};

use super::bundle::curve_key;

const IDENTITY_FILE: &str = "identity.pickle";
const SESSIONS_DIR: &str = "sessions";

/// A fully decoded legacy store.
pub(crate) struct LegacyStore {
    pub(crate) account: Account,
    pub(crate) sessions: Vec<LegacySession>,
}

pub(crate) struct LegacySession {
    pub(crate) session_id: String,
    pub(crate) session: Session,
    pub(crate) remote_identity: Curve25519PublicKey,
}

#[derive(Deserialize)]
struct SessionRecord {
    remote_identity: String,
    pickle: serde_json::Value,
}

/// Read and decode the store at `dir`.
///
/// `passphrase` unlocks libolm-format pickles.
pub(crate) fn read(dir: &Path, passphrase: &[u8]) -> Result<LegacyStore, String> {
    if !dir.is_dir() {
        return Err(format!("{} is not a directory", dir.display()));
    }

    let identity = fs::read_to_string(dir.join(IDENTITY_FILE))
        .map_err(|e| format!("failed to read {IDENTITY_FILE}: {e}"))?;
    let account = decode_account(identity.trim(), passphrase)?;

    let mut sessions = Vec::new();
    let sessions_dir = dir.join(SESSIONS_DIR);
    if sessions_dir.is_dir() {
        let entries =
            fs::read_dir(&sessions_dir).map_err(|e| format!("failed to list sessions: {e}"))?;

        for entry in entries {
            let entry = entry.map_err(|e| format!("failed to list sessions: {e}"))?;
            let name = entry.file_name();
            let session_id = name
                .to_str()
                .ok_or_else(|| format!("session file name {name:?} is not UTF-8"))?
                .to_owned();

            // Reject names that could never have come from a session id
            session_id
                .parse::<ProteusSessionId>()
                .map_err(|e| format!("invalid session file name {session_id:?}: {e}"))?;

            let record = fs::read_to_string(entry.path())
                .map_err(|e| format!("failed to read session {session_id:?}: {e}"))?;
            sessions.push(decode_session(session_id, &record, passphrase)?);
        }
    }

    sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    Ok(LegacyStore { account, sessions })
}

fn decode_account(text: &str, passphrase: &[u8]) -> Result<Account, String> {
    if let Ok(account) = Account::from_libolm_pickle(text, passphrase) {
        return Ok(account);
    }

    let pickle: AccountPickle = serde_json::from_str(text)
        .map_err(|e| format!("identity pickle is neither libolm nor JSON: {e}"))?;
    Ok(Account::from_pickle(pickle))
}

fn decode_session(
    session_id: String,
    record: &str,
    passphrase: &[u8],
) -> Result<LegacySession, String> {
    let record: SessionRecord = serde_json::from_str(record)
        .map_err(|e| format!("malformed session record {session_id:?}: {e}"))?;

    let identity = STANDARD
        .decode(&record.remote_identity)
        .map_err(|e| format!("remote identity of {session_id:?} is not base64: {e}"))?;
    let remote_identity = curve_key("remote_identity", &identity).map_err(|e| e.to_string())?;

    let session = match record.pickle {
        serde_json::Value::String(libolm) => Session::from_libolm_pickle(&libolm, passphrase)
            .map_err(|e| format!("libolm pickle of {session_id:?} failed to decode: {e}"))?,
        value => {
            let pickle: SessionPickle = serde_json::from_value(value)
                .map_err(|e| format!("JSON pickle of {session_id:?} failed to decode: {e}"))?;
            Session::from_pickle(pickle)
        },
    };

    Ok(LegacySession { session_id, session, remote_identity })
}
