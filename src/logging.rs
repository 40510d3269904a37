//! Tracing initialization.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initializes the global subscriber. `RUST_LOG` overrides the configured
/// level when set.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match config.format {
        LogFormat::Json => {
            fmt()
                .with_env_filter(filter)
                .json()
                .with_current_span(false)
                .init();
        }
        LogFormat::Plain => {
            fmt().with_env_filter(filter).init();
        }
    }
}
