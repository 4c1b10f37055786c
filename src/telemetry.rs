use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::IngestConfig;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured filter. Fails if a global subscriber is
/// already installed.
pub fn init_tracing(config: &IngestConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("Failed to create log filter")?;

    let installed = if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
    };

    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
