//! CLI configuration and tracing setup, adapted from the node's original
//! `setup_tracing` into a `clap`-derived config struct (spec §4.11 ambient
//! stack).

use crate::chain::Chain;
use clap::Parser;
use std::error::Error;

/// Top-level CLI configuration: which chain to interpret data as, and how
/// verbosely to log.
#[derive(Parser, Debug, Clone)]
#[command(name = "btc-protocol-cli", about = "Bitcoin-family protocol core CLI")]
pub struct Config {
    /// Which chain's wire/consensus parameters to use.
    #[arg(long, value_enum, default_value_t = Chain::Bitcoin)]
    pub chain: Chain,

    /// Tracing filter directive, e.g. "info" or "btc_protocol_core=debug".
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Install a `tracing` subscriber reading the env filter, falling back to
/// `config.log_level` when `RUST_LOG` is unset.
pub fn init_tracing(config: &Config) -> Result<(), Box<dyn Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
