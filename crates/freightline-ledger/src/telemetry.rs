//! Logging bootstrap.
//!
//! `RUST_LOG` wins over the configured filter when it is set.

use freightline_types::{FreightError, LogConfig, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber described by `config`.
///
/// Returns `Ok(false)` if a subscriber was already installed; the existing
/// one is kept.
///
/// # Errors
/// `Configuration` if the filter directive does not parse.
pub fn init(config: &LogConfig) -> Result<bool> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| FreightError::Configuration(format!("log filter '{}': {e}", config.filter)))?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
    Ok(installed.is_ok())
}
