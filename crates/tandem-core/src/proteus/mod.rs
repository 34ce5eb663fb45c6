//! Pairwise session orchestration over the Proteus protocol.
//!
//! # Components
//!
//! - [`service`]: [`ProteusServiceInterface`] and its engine-backed
//!   implementation [`ProteusService`]
//! - [`error`]: Per-operation error families and the [`ProteusError`] code
//!   decode
//! - [`prekeys`]: Prekey id range resolution

pub mod error;
pub mod prekeys;
pub mod service;

pub use error::{
    DecryptionError, EncryptionError, FingerprintError, InitializationError, MigrationError,
    PrekeyError, ProteusError, SessionError, codes,
};
pub use prekeys::Prekey;
pub use service::{Decrypted, ProteusService, ProteusServiceInterface};
