//! Tandem operator CLI.
//!
//! Inspects and maintains a client's Proteus keystore: identity fingerprint,
//! prekey generation, session lookup and deletion, and legacy store import.
//! Every command runs through [`ProteusService`], the same path a messaging
//! client takes.

#![forbid(unsafe_code)]

pub mod error;

use std::{io::Write, path::PathBuf};

use clap::{Parser, Subcommand};
pub use error::CliError;
use tandem_core::{ProteusService, ProteusServiceInterface, ProteusSessionId};
use tandem_engine::{CoreEngine, Keystore, config::PICKLE_KEY_LEN};

/// Tandem keystore tool
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(about = "Inspect and maintain a tandem Proteus keystore")]
#[command(version)]
pub struct Args {
    /// Path to the redb keystore
    #[arg(long, env = "TANDEM_KEYSTORE", default_value = "tandem.redb")]
    pub keystore: PathBuf,

    /// Hex-encoded 32-byte key sealing stored pickles
    #[arg(long, env = "TANDEM_PICKLE_KEY", hide_env_values = true)]
    pub pickle_key: String,

    /// Client identity used for MLS credentials
    #[arg(long, default_value = "tandem")]
    pub client_identity: String,

    /// Passphrase of libolm-format legacy pickles
    #[arg(long, env = "TANDEM_LEGACY_PASSPHRASE", hide_env_values = true)]
    pub legacy_passphrase: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Keystore commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Initialize the identity and print its fingerprint
    Init,

    /// Print a fingerprint (local identity by default)
    Fingerprint {
        /// Fingerprint of a base64 prekey bundle instead
        #[arg(long, conflicts_with = "session")]
        prekey: Option<String>,

        /// Fingerprint of the remote identity of a session instead
        #[arg(long)]
        session: Option<String>,
    },

    /// Generate prekeys and print `id base64` lines
    Prekeys {
        /// First prekey id
        #[arg(long, default_value_t = 0)]
        start: u16,

        /// Number of prekeys
        #[arg(long, default_value_t = 100)]
        count: u16,
    },

    /// Print the last-resort prekey as `id base64`
    LastPrekey,

    /// Inspect or delete sessions
    Session {
        /// Session action
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Import a legacy session store directory
    Migrate {
        /// Legacy store directory
        dir: PathBuf,
    },
}

/// Per-session commands. Ids are raw session keys.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Print whether a session exists
    Exists {
        /// Raw session id
        id: String,
    },

    /// Delete a session
    Delete {
        /// Raw session id
        id: String,
    },

    /// List stored session ids
    List,
}

/// Decode a hex pickle key.
pub fn parse_pickle_key(hex_key: &str) -> Result<[u8; PICKLE_KEY_LEN], CliError> {
    let bytes =
        hex::decode(hex_key.trim()).map_err(|e| CliError::InvalidPickleKey(e.to_string()))?;

    bytes.try_into().map_err(|bytes: Vec<u8>| {
        CliError::InvalidPickleKey(format!("expected {PICKLE_KEY_LEN} bytes, got {}", bytes.len()))
    })
}

/// Run `command`, writing its output to `out`.
pub fn run<K: Keystore>(
    command: &Command,
    proteus: &ProteusService<CoreEngine<K>>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if let Command::Migrate { dir } = command {
        proteus.migrate_legacy_sessions(dir)?;
        writeln!(out, "{}", proteus.local_fingerprint()?)?;
        return Ok(());
    }

    proteus.complete_initialization()?;

    match command {
        Command::Init => writeln!(out, "{}", proteus.local_fingerprint()?)?,
        Command::Fingerprint { prekey: Some(prekey), .. } => {
            writeln!(out, "{}", proteus.fingerprint_from_prekey(prekey)?)?;
        },
        Command::Fingerprint { session: Some(raw), .. } => {
            let id: ProteusSessionId = raw.parse()?;
            writeln!(out, "{}", proteus.remote_fingerprint(&id)?)?;
        },
        Command::Fingerprint { .. } => writeln!(out, "{}", proteus.local_fingerprint()?)?,
        Command::Prekeys { start, count } => {
            for prekey in proteus.generate_prekeys(*start, *count)? {
                writeln!(out, "{} {}", prekey.id, prekey.data)?;
            }
        },
        Command::LastPrekey => {
            let id = proteus.try_last_prekey_id()?;
            writeln!(out, "{id} {}", proteus.last_prekey()?)?;
        },
        Command::Session { action: SessionAction::Exists { id } } => {
            let id: ProteusSessionId = id.parse()?;
            writeln!(out, "{}", proteus.session_exists(&id))?;
        },
        Command::Session { action: SessionAction::Delete { id } } => {
            let id: ProteusSessionId = id.parse()?;
            proteus.delete_session(&id)?;
            writeln!(out, "deleted {id}")?;
        },
        Command::Session { action: SessionAction::List } => {
            let sessions = proteus.engine().perform(|engine| engine.keystore().list_sessions())?;
            for session in sessions {
                writeln!(out, "{session}")?;
            }
        },
        // Runs before initialization, above
        Command::Migrate { .. } => {},
    }

    Ok(())
}
