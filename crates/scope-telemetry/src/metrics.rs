//! Prometheus metrics for the bus.
//!
//! All metrics follow the naming convention: `sb_<layer>_<metric>_<unit>`
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `sb_transport_notifications_sent_total` | counter | `role` |
//! | `sb_transport_notifications_received_total` | counter | `role` |
//! | `sb_transport_connections_active` | gauge | |
//! | `sb_transport_connection_failures_total` | counter | `reason` |
//! | `sb_converter_errors_total` | counter | `direction` |

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::TelemetryError;

lazy_static! {
    /// Registry holding every scopebus metric
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSPORT METRICS
    // =========================================================================

    /// Notifications written to a connection
    pub static ref NOTIFICATIONS_SENT: CounterVec = CounterVec::new(
        Opts::new("sb_transport_notifications_sent_total", "Notifications written to bus connections"),
        &["role"]  // role: server/client
    ).expect("metric creation failed");

    /// Notifications read from a connection
    pub static ref NOTIFICATIONS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("sb_transport_notifications_received_total", "Notifications read from bus connections"),
        &["role"]
    ).expect("metric creation failed");

    /// Connections currently past their handshake
    pub static ref CONNECTIONS_ACTIVE: Gauge = Gauge::new(
        "sb_transport_connections_active",
        "Number of bus connections currently active"
    ).expect("metric creation failed");

    /// Connections that failed or were lost
    pub static ref CONNECTION_FAILURES: CounterVec = CounterVec::new(
        Opts::new("sb_transport_connection_failures_total", "Bus connection failures by reason"),
        &["reason"]  // reason: handshake/connect/bind/io/accept
    ).expect("metric creation failed");

    // =========================================================================
    // CONVERTER METRICS
    // =========================================================================

    /// Payloads that could not be converted
    pub static ref CONVERTER_ERRORS: CounterVec = CounterVec::new(
        Opts::new("sb_converter_errors_total", "Conversion failures by direction"),
        &["direction"]  // direction: serialize/deserialize
    ).expect("metric creation failed");
}

static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register all metrics with [`REGISTRY`]. Calling this more than once is a
/// no-op.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] if the registry rejects a metric.
pub fn register_metrics() -> Result<(), TelemetryError> {
    if REGISTERED.swap(true, Ordering::AcqRel) {
        return Ok(());
    }

    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(NOTIFICATIONS_SENT.clone()),
        Box::new(NOTIFICATIONS_RECEIVED.clone()),
        Box::new(CONNECTIONS_ACTIVE.clone()),
        Box::new(CONNECTION_FAILURES.clone()),
        Box::new(CONVERTER_ERRORS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] if encoding fails.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
