//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber: an `EnvFilter` built from the
//! configured level plus a `fmt` layer, either human readable or JSON.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// - [`TelemetryError::Config`] if the log level is not a valid filter.
/// - [`TelemetryError::AlreadyInitialized`] if a global subscriber is
///   already installed, by this function or by someone else. Callers that
///   only care about logs being on can ignore this variant.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("invalid log level {:?}: {e}", config.log_level)))?;

    if INITIALIZED.load(Ordering::Acquire) {
        return Err(TelemetryError::AlreadyInitialized);
    }

    let fmt_layer = if !config.console_output {
        fmt::layer().with_writer(std::io::sink).boxed()
    } else if config.json_logs {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).with_thread_names(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialized)?;

    INITIALIZED.store(true, Ordering::Release);
    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Logging initialised"
    );
    Ok(())
}
