//! Prometheus metrics for skyfeed.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `skyfeed_requests_total` | Counter | `endpoint`, `status` | Total requests |
//! | `skyfeed_request_duration_seconds` | Histogram | `endpoint` | Request latency |
//! | `skyfeed_in_flight_requests` | Gauge | - | In-flight requests |
//! | `skyfeed_feed_errors_total` | Counter | `code` | Error responses by wire code |
//! | `skyfeed_interactions_total` | Counter | `event` | Received interactions |
//!
//! The recording functions are no-ops until [`init_metrics`] installs a
//! recorder.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

const REQUESTS_TOTAL: &str = "skyfeed_requests_total";
const REQUEST_DURATION: &str = "skyfeed_request_duration_seconds";
const IN_FLIGHT: &str = "skyfeed_in_flight_requests";
const FEED_ERRORS_TOTAL: &str = "skyfeed_feed_errors_total";
const INTERACTIONS_TOTAL: &str = "skyfeed_interactions_total";

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ],
        }
    }
}

/// Handle to the installed Prometheus recorder.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with the given handle.
    #[must_use]
    pub fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the Prometheus recorder and starts the scrape endpoint.
///
/// Must be called from within a Tokio runtime, which runs the exporter.
/// Returns `Ok(None)` when metrics are disabled.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for a bad listen address and
/// `TelemetryError::MetricsInit` if the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<Option<MetricsRegistry>> {
    if !config.enabled {
        return Ok(None);
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
        TelemetryError::MetricsInit("the metrics exporter needs a Tokio runtime".to_string())
    })?;
    let _entered = runtime.enter();

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .build()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    runtime.spawn(async move {
        if let Err(e) = exporter.await {
            tracing::error!(error = ?e, "Prometheus exporter stopped");
        }
    });

    let _ = METRICS_HANDLE.set(handle.clone());
    register_metric_descriptions();

    tracing::info!(addr = %addr, "Prometheus exporter listening");
    Ok(Some(MetricsRegistry::new(handle)))
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests processed");
    describe_histogram!(REQUEST_DURATION, "HTTP request duration in seconds");
    describe_gauge!(
        IN_FLIGHT,
        "Number of HTTP requests currently being processed"
    );
    describe_counter!(FEED_ERRORS_TOTAL, "Error responses by XRPC error code");
    describe_counter!(INTERACTIONS_TOTAL, "Feed interactions received, by event");
}

/// Records a completed request.
///
/// # Arguments
///
/// * `endpoint` - The endpoint name (e.g., "getFeedSkeleton")
/// * `status_code` - HTTP status code
/// * `duration` - Request duration
pub fn record_request(endpoint: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "endpoint" => endpoint.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION, "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

/// Records an error response by its wire code.
pub fn record_feed_error(code: &str) {
    counter!(FEED_ERRORS_TOTAL, "code" => code.to_string()).increment(1);
}

/// Records one received interaction.
pub fn record_interaction(event: &str) {
    counter!(INTERACTIONS_TOTAL, "event" => event.to_string()).increment(1);
}

/// Guard that tracks one in-flight request.
///
/// The gauge is decremented on drop, including when the request panics.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight counter.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert!(config.duration_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_disabled_metrics() {
        let result = init_metrics(&MetricsConfig::default());
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
            ..Default::default()
        };
        let result = init_metrics(&config);
        assert!(matches!(result, Err(TelemetryError::InvalidAddress(_))));
    }

    #[test]
    fn test_requires_runtime() {
        let config = MetricsConfig {
            enabled: true,
            addr: "127.0.0.1:0".to_string(),
            ..Default::default()
        };
        let result = init_metrics(&config);
        assert!(matches!(result, Err(TelemetryError::MetricsInit(_))));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_request("getFeedSkeleton", 200, Duration::from_millis(10));
        record_feed_error("UnsupportedAlgorithm");
        record_interaction("app.bsky.feed.defs#requestMore");
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
