//! Tracing initialization.

use tracing_subscriber::{fmt, EnvFilter};

/// Telemetry configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_format: false,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Safe to call once
/// per process; later calls are ignored so tests can initialize freely.
pub fn init(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_format {
        let _ = fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}
