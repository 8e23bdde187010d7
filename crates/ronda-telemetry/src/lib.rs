//! # Ronda Telemetry
//!
//! Structured logging for the patrol round engine and its runtime.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ronda_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(TelemetryConfig::from_env())?;
//!     tracing::info!("Ready");
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `ronda` | Service name on every log line |
//! | `RONDA_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RONDA_JSON_LOGS` | `false` | JSON lines instead of compact text |
//! | `RONDA_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
mod subscriber;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call fails with `AlreadyInitialized`.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    subscriber::init_subscriber(&config)?;
    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Telemetry initialized"
    );
    Ok(())
}
