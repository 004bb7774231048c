//! Telemetry configuration.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;
use skyfeed_config::{LogFormat, SkyfeedConfig};

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Metrics configuration.
    pub metrics: MetricsConfig,

    /// Logging configuration.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }

    /// Derives the telemetry settings from a loaded [`SkyfeedConfig`].
    #[must_use]
    pub fn from_config(config: &SkyfeedConfig) -> Self {
        let logging = LogConfig {
            enabled: config.logging.enabled,
            level: config.logging.level.clone(),
            json_format: config.logging.format == LogFormat::Json,
            file_line_info: config.logging.include_location,
            ..LogConfig::default()
        };

        let metrics = MetricsConfig {
            enabled: config.metrics.enabled,
            addr: config.metrics.addr.clone(),
            ..MetricsConfig::default()
        };

        Self { metrics, logging }
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    metrics: Option<MetricsConfig>,
    logging: Option<LogConfig>,
}

impl TelemetryConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = Some(config);
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn logging(mut self, config: LogConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Enables metrics on the given address.
    #[must_use]
    pub fn metrics_addr(mut self, addr: &str) -> Self {
        let config = self.metrics.take().unwrap_or_default();
        self.metrics = Some(MetricsConfig {
            enabled: true,
            addr: addr.to_string(),
            ..config
        });
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        TelemetryConfig {
            metrics: self.metrics.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }
}
