//! Main configuration types.
//!
//! This module provides the top-level [`SkyfeedConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, FeedConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig};

/// Complete skyfeed configuration.
///
/// This is the root configuration type that contains all configuration
/// sections. Use [`ConfigLoader`](crate::ConfigLoader) to load it from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use skyfeed_config::{FeedConfig, SkyfeedConfig};
///
/// let config = SkyfeedConfig::builder()
///     .feed(FeedConfig {
///         publisher_did: "did:plc:abc123".to_string(),
///         hostname: "feeds.example.com".to_string(),
///         ..Default::default()
///     })
///     .build_validated()
///     .unwrap();
///
/// assert_eq!(config.service_did(), "did:web:feeds.example.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SkyfeedConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Feed generator identity and behavior.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl SkyfeedConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SkyfeedConfigBuilder {
        SkyfeedConfigBuilder::new()
    }

    /// Returns the DID of this feed generator service, `did:web:<hostname>`.
    #[must_use]
    pub fn service_did(&self) -> String {
        format!("did:web:{}", self.feed.hostname)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `feed.publisher_did` or `feed.hostname` is missing
    /// - `feed.publisher_did` is not a DID
    /// - `feed.hostname` includes a scheme, a path or whitespace
    /// - the server or metrics address is not a socket address
    /// - `server.request_timeout_ms` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        let publisher_did = self.feed.publisher_did.trim();
        if publisher_did.is_empty() {
            return Err(ConfigError::missing_field("feed.publisher_did"));
        }
        if !publisher_did.starts_with("did:") || publisher_did.len() <= "did:".len() {
            return Err(ConfigError::invalid_value(
                "feed.publisher_did",
                format!("not a DID: {publisher_did}"),
            ));
        }

        let hostname = self.feed.hostname.trim();
        if hostname.is_empty() {
            return Err(ConfigError::missing_field("feed.hostname"));
        }
        if hostname.contains("://") {
            return Err(ConfigError::invalid_value(
                "feed.hostname",
                "must not include a scheme",
            ));
        }
        if hostname.contains('/') || hostname.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid_value(
                "feed.hostname",
                format!("not a bare hostname: {hostname}"),
            ));
        }

        if self.metrics.enabled
            && self
                .metrics
                .addr
                .parse::<std::net::SocketAddr>()
                .is_err()
        {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, debug-level logs with source locations, and internal error
    /// details included in responses.
    ///
    /// # Example
    ///
    /// ```
    /// use skyfeed_config::SkyfeedConfig;
    ///
    /// let config = SkyfeedConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;

        config.feed.expose_error_details = true;

        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON info-level logs and the Prometheus exporter enabled.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.metrics.enabled = true;

        config
    }
}

/// Builder for [`SkyfeedConfig`].
#[derive(Debug, Default)]
pub struct SkyfeedConfigBuilder {
    server: Option<ServerConfig>,
    feed: Option<FeedConfig>,
    logging: Option<LoggingConfig>,
    metrics: Option<MetricsConfig>,
}

impl SkyfeedConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the feed configuration.
    #[must_use]
    pub fn feed(mut self, feed: FeedConfig) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> SkyfeedConfig {
        SkyfeedConfig {
            server: self.server.unwrap_or_default(),
            feed: self.feed.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<SkyfeedConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> FeedConfig {
        FeedConfig {
            publisher_did: "did:plc:abc123".to_string(),
            hostname: "feeds.example.com".to_string(),
            ..Default::default()
        }
    }

    fn with_feed(feed: FeedConfig) -> Result<(), ConfigError> {
        SkyfeedConfig::builder().feed(feed).build().validate()
    }

    #[test]
    fn test_default_config() {
        let config = SkyfeedConfig::default();
        assert_eq!(config.server.http_addr, "0.0.0.0:3000");
        assert!(!config.feed.enable_unsafe_auth);
        assert!(config.logging.enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_default_config_needs_feed_identity() {
        let err = SkyfeedConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { ref field } if field == "feed.publisher_did"
        ));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(with_feed(feed()).is_ok());
    }

    #[test]
    fn test_service_did() {
        let config = SkyfeedConfig::builder().feed(feed()).build();
        assert_eq!(config.service_did(), "did:web:feeds.example.com");
    }

    #[test]
    fn test_missing_hostname() {
        let err = with_feed(FeedConfig {
            hostname: String::new(),
            ..feed()
        })
        .unwrap_err();
        assert!(err.to_string().contains("feed.hostname"));
    }

    #[test]
    fn test_publisher_must_be_did() {
        for did in ["plc:abc", "did:", "https://example.com"] {
            let err = with_feed(FeedConfig {
                publisher_did: did.to_string(),
                ..feed()
            })
            .unwrap_err();
            assert!(err.to_string().contains("feed.publisher_did"), "did: {did}");
        }
    }

    #[test]
    fn test_hostname_must_be_bare() {
        for hostname in ["https://feeds.example.com", "feeds.example.com/xrpc", "feeds example"] {
            let err = with_feed(FeedConfig {
                hostname: hostname.to_string(),
                ..feed()
            })
            .unwrap_err();
            assert!(err.to_string().contains("feed.hostname"), "hostname: {hostname}");
        }
    }

    #[test]
    fn test_validate_invalid_server_addr() {
        let result = SkyfeedConfig::builder()
            .feed(feed())
            .server(ServerConfig {
                http_addr: "not-an-address".to_string(),
                ..Default::default()
            })
            .build_validated();

        assert!(result.unwrap_err().to_string().contains("http_addr"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let result = SkyfeedConfig::builder()
            .feed(feed())
            .server(ServerConfig {
                request_timeout_ms: 0,
                ..Default::default()
            })
            .build_validated();

        assert!(result.unwrap_err().to_string().contains("request_timeout_ms"));
    }

    #[test]
    fn test_validate_invalid_metrics_addr() {
        let result = SkyfeedConfig::builder()
            .feed(feed())
            .metrics(MetricsConfig {
                enabled: true,
                addr: "invalid".to_string(),
            })
            .build_validated();

        assert!(result.unwrap_err().to_string().contains("metrics.addr"));
    }

    #[test]
    fn test_metrics_addr_ignored_when_disabled() {
        let result = SkyfeedConfig::builder()
            .feed(feed())
            .metrics(MetricsConfig {
                enabled: false,
                addr: "invalid".to_string(),
            })
            .build_validated();

        assert!(result.is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = SkyfeedConfig::development();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.include_location);
        assert!(config.feed.expose_error_details);
    }

    #[test]
    fn test_production_preset() {
        let config = SkyfeedConfig::production();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.metrics.enabled);
        assert!(!config.feed.expose_error_details);
    }

    #[test]
    fn test_toml_round_trip_sections() {
        let config = SkyfeedConfig::builder().feed(feed()).build();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[feed]"));

        let parsed: SkyfeedConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r#"
            [feed]
            publisher_did = "did:plc:abc123"
            hostname = "feeds.example.com"
            service_did = "did:web:feeds.example.com"
        "#;

        let result: Result<SkyfeedConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
