//! Tandem keystore tool.
//!
//! # Usage
//!
//! ```bash
//! export TANDEM_PICKLE_KEY=$(openssl rand -hex 32)
//!
//! # Create the identity and print its fingerprint
//! tandem --keystore alice.redb init
//!
//! # Publish prekeys 0..100
//! tandem --keystore alice.redb prekeys --start 0 --count 100
//!
//! # Import a legacy store
//! tandem --keystore alice.redb --legacy-passphrase secret migrate ./cryptobox
//! ```

use std::{io, sync::Arc};

use clap::Parser;
use tandem_cli::{Args, parse_pickle_key, run};
use tandem_core::{EngineHandle, ProteusService};
use tandem_engine::{CoreEngine, EngineConfig, RedbKeystore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Command output owns stdout
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let pickle_key = parse_pickle_key(&args.pickle_key)?;
    let mut config = EngineConfig::new(args.client_identity.into_bytes(), pickle_key);
    if let Some(passphrase) = args.legacy_passphrase {
        config = config.with_legacy_passphrase(passphrase);
    }

    tracing::info!(keystore = %args.keystore.display(), "opening keystore");
    let keystore = RedbKeystore::open(&args.keystore)?;
    let engine = CoreEngine::new(config, keystore)?;
    let proteus = ProteusService::new(Arc::new(EngineHandle::new(engine)));

    run(&args.command, &proteus, &mut io::stdout().lock())?;

    Ok(())
}
