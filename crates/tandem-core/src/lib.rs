//! Tandem Core
//!
//! Session and group cryptographic operation layer. Orchestrates pairwise
//! Proteus sessions and MLS group encryption on top of an external
//! cryptographic engine, with well-defined error translation and recovery.
//!
//! # Architecture
//!
//! The crate holds no cryptographic state of its own. All ratchet and group
//! state lives inside the engine, which is reached exclusively through an
//! [`EngineHandle`]:
//!
//! ```text
//! caller ──▶ ProteusService / MlsEncryptionService
//!                      │
//!                      ▼
//!            EngineHandle::perform   (one operation at a time,
//!                      │              in submission order)
//!                      ▼
//!            ProteusEngine / MlsEngine (capability traits)
//! ```
//!
//! Correctness of the layer therefore reduces to two things: the handle's
//! serialization guarantee and the translation of engine failures into the
//! per-operation error families in [`proteus::error`] and [`mls`].
//!
//! # Components
//!
//! - [`ProteusSessionId`]: Canonical, injective naming of pairwise sessions
//! - [`EngineHandle`]: Serialized exclusive access to the engine
//! - [`ProteusService`]: Pairwise session lifecycle, including the
//!   self-healing decrypt path
//! - [`MlsEncryptionService`]: Group message encryption
//! - [`ProteusError`]: Total decode of engine error codes
//! - [`test_utils`]: Scriptable engine double for tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod engine;
pub mod handle;
pub mod mls;
pub mod proteus;
pub mod session_id;
pub mod test_utils;

pub use engine::{EngineError, MlsEngine, ProteusEngine};
pub use handle::EngineHandle;
pub use mls::{MlsEncryptionError, MlsEncryptionService, MlsEncryptionServiceInterface, MlsGroupId};
pub use proteus::{
    Decrypted, DecryptionError, EncryptionError, FingerprintError, InitializationError,
    MigrationError, Prekey, PrekeyError, ProteusError, ProteusService, ProteusServiceInterface,
    SessionError,
};
pub use session_id::{ProteusSessionId, SessionIdParseError};
