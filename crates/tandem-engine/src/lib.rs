//! Tandem Engine
//!
//! Concrete cryptographic engine for `tandem-core`. Implements
//! [`tandem_core::ProteusEngine`] with `vodozemac`'s Olm ratchet and
//! [`tandem_core::MlsEngine`] with `openmls`, persisting Proteus state through
//! a pluggable [`Keystore`].
//!
//! # Components
//!
//! - [`CoreEngine`]: Engine over a keystore, driven through an engine handle
//! - [`EngineConfig`]: Client identity, pickle key, legacy passphrase
//! - [`keystore`]: `Keystore` trait with in-memory and redb backends
//! - [`proteus`]: Envelope and prekey bundle formats
//! - [`mls`]: Group state and `OpenMLS` provider
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tandem_core::{EngineHandle, ProteusService, ProteusServiceInterface};
//! use tandem_engine::{CoreEngine, EngineConfig, RedbKeystore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let keystore = RedbKeystore::open("keystore.redb")?;
//! let engine = CoreEngine::new(EngineConfig::new(b"client".to_vec(), [0; 32]), keystore)?;
//!
//! let proteus = ProteusService::new(Arc::new(EngineHandle::new(engine)));
//! proteus.complete_initialization()?;
//! println!("{}", proteus.local_fingerprint()?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod engine;
pub mod keystore;
pub mod mls;
pub mod proteus;

pub use config::EngineConfig;
pub use engine::CoreEngine;
pub use keystore::{Keystore, KeystoreError, MemoryKeystore, RedbKeystore};
pub use mls::{MlsProvider, MlsState};
pub use proteus::{BundleError, EnvelopeError, LAST_RESORT_PREKEY_ID, PrekeyBundle};
