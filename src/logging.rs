//! Structured logging setup
//!
//! Installs the global `tracing` subscriber. The filter comes from
//! `RUST_LOG` and defaults to `info`.

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber
///
/// Fails if a global subscriber is already set.
pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
