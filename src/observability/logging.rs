//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level when set
//! - Initialization is idempotent so test binaries can call it freely

use tracing_subscriber::EnvFilter;

use crate::config::schema::ObservabilityConfig;

/// Initialize the global tracing subscriber.
///
/// Later calls are no-ops; the first subscriber installed wins.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
