//! Logging setup for the binary.
//!
//! Library code logs through the `log` facade; the subscriber installed
//! here bridges those records into `tracing-subscriber` output.

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;
use wa_dispatch::{DispatchError, DispatchResult};

/// Install the global subscriber. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, format: LogFormat) -> DispatchResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match format {
        LogFormat::Json => subscriber.json().try_init(),
        LogFormat::Compact => subscriber.compact().try_init(),
        LogFormat::Pretty => subscriber.pretty().try_init(),
    };
    result.map_err(|e| DispatchError::internal(format!("Logging init failed: {}", e)))
}
