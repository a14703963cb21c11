//! Structured logging setup built on tracing.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use super::config::LoggingConfig;

/// Initialize the global subscriber. `RUST_LOG` overrides the configured
/// level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(true)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow!("failed to init logging: {e}"))?;
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow!("failed to init logging: {e}"))?;
        }
        other => return Err(anyhow!("unknown log format: {other}")),
    }
    Ok(())
}
