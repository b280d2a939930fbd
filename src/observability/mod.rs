//! # Observability
//!
//! Structured logging for the optfin backend via the tracing ecosystem.
//! Metrics and distributed-trace export are intentionally out of scope; the
//! subscriber installed here is the whole stack.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// The filter honours `RUST_LOG` when set and falls back to the configured
/// log level otherwise. Safe to call once per process; a second call fails
/// with a configuration error rather than panicking (test binaries install
/// their own subscribers).
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let result = if config.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| Error::config(format!("Failed to initialize tracing: {}", e)))?;

    tracing::info!(
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Observability initialized"
    );
    Ok(())
}
