//! Observability for skyfeed.
//!
//! - **Logging**: structured JSON (or pretty) logs via `tracing-subscriber`
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `skyfeed_requests_total` | Counter | `endpoint`, `status` | Total request count |
//! | `skyfeed_request_duration_seconds` | Histogram | `endpoint` | Request latency |
//! | `skyfeed_in_flight_requests` | Gauge | - | Currently processing requests |
//! | `skyfeed_feed_errors_total` | Counter | `code` | Error responses by XRPC code |
//! | `skyfeed_interactions_total` | Counter | `event` | Received interactions |
//!
//! # Example
//!
//! ```rust,ignore
//! use skyfeed_config::ConfigLoader;
//! use skyfeed_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().with_env_prefix("SKYFEED").load()?;
//!     let _guard = init_telemetry(TelemetryConfig::from_config(&config))?;
//!
//!     tracing::info!("Telemetry is now active");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{
    init_metrics, record_feed_error, record_interaction, record_request, InFlightGuard,
    MetricsConfig, MetricsRegistry,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Keeps the telemetry subsystems of a running service.
///
/// Hold it for the lifetime of the application.
#[derive(Debug, Default)]
pub struct TelemetryGuard {
    metrics: Option<MetricsRegistry>,
}

impl TelemetryGuard {
    /// Creates a new telemetry guard.
    #[must_use]
    pub fn new(metrics: Option<MetricsRegistry>) -> Self {
        Self { metrics }
    }

    /// Returns the metrics registry, if metrics are enabled.
    #[must_use]
    pub fn metrics(&self) -> Option<&MetricsRegistry> {
        self.metrics.as_ref()
    }
}

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if any subsystem fails to initialize.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryResult<TelemetryGuard> {
    init_logging(&config.logging)?;
    let metrics = init_metrics(&config.metrics)?;
    Ok(TelemetryGuard::new(metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_guard_without_metrics() {
        let guard = TelemetryGuard::new(None);
        assert!(guard.metrics().is_none());
    }

    #[test]
    fn test_init_telemetry_disabled() {
        let config = TelemetryConfig::builder()
            .logging(LogConfig {
                enabled: false,
                ..LogConfig::default()
            })
            .build();

        let guard = init_telemetry(config).unwrap();
        assert!(guard.metrics().is_none());
    }
}
