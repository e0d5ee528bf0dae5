//! # Scope Telemetry
//!
//! Logging and metrics shared by every scopebus crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scope_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("telemetry");
//!     // logs and metrics are now collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `scopebus` | Service name in logs |
//! | `SB_LOG_LEVEL` | `info` | Log level filter, falls back to `RUST_LOG` |
//! | `SB_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `SB_JSON_LOGS` | `false` | JSON formatted logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, register_metrics, CONNECTIONS_ACTIVE, CONNECTION_FAILURES, CONVERTER_ERRORS,
    NOTIFICATIONS_RECEIVED, NOTIFICATIONS_SENT,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Logging already initialised")]
    AlreadyInitialized,

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install logging.
///
/// A subscriber that is already installed is not an error here.
///
/// # Errors
///
/// Returns the first metrics or configuration failure.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    match init_logging(config) {
        Ok(()) | Err(TelemetryError::AlreadyInitialized) => Ok(()),
        Err(e) => Err(e),
    }
}
