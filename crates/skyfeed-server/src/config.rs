//! Server and feed settings.
//!
//! [`ServerConfig`] controls the listener, [`FeedSettings`] the identity of
//! the feed generator. Both are immutable once the server is built and can
//! be derived from a loaded [`SkyfeedConfig`].
//!
//! # Example
//!
//! ```rust
//! use skyfeed_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .request_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:3000");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use skyfeed_config::SkyfeedConfig;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default maximum request body size (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Listener configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:3000")
    http_addr: String,

    /// How long to wait for open connections on shutdown
    shutdown_timeout: Duration,

    /// Upper bound for handling one request
    request_timeout: Duration,

    /// Largest request body read into memory
    max_body_size: usize,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Derives the listener configuration from a loaded [`SkyfeedConfig`].
    #[must_use]
    pub fn from_config(config: &SkyfeedConfig) -> Self {
        Self::builder()
            .http_addr(config.server.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
            .request_timeout(Duration::from_millis(config.server.request_timeout_ms))
            .max_body_size(config.server.max_body_size)
            .build()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses and returns the HTTP address as a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the maximum request body size in bytes.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    max_body_size: usize,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    ///
    /// This is the maximum time the server waits for open connections
    /// once shutdown has been triggered.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    ///
    /// Requests still running after this long are answered with
    /// `504 Gateway Timeout`.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum request body size in bytes.
    ///
    /// Larger bodies are answered with `413 Payload Too Large`.
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
            max_body_size: self.max_body_size,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity and behavior of the feed generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSettings {
    publisher_did: String,
    hostname: String,
    enable_unsafe_auth: bool,
    expose_error_details: bool,
}

impl FeedSettings {
    /// Creates settings for a publisher DID and a public hostname.
    #[must_use]
    pub fn new(publisher_did: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            publisher_did: publisher_did.into(),
            hostname: hostname.into(),
            enable_unsafe_auth: false,
            expose_error_details: false,
        }
    }

    /// Derives feed settings from a loaded [`SkyfeedConfig`].
    #[must_use]
    pub fn from_config(config: &SkyfeedConfig) -> Self {
        Self {
            publisher_did: config.feed.publisher_did.trim().to_string(),
            hostname: config.feed.hostname.trim().to_string(),
            enable_unsafe_auth: config.feed.enable_unsafe_auth,
            expose_error_details: config.feed.expose_error_details,
        }
    }

    /// Enables or disables unsafe auth mode.
    #[must_use]
    pub fn with_unsafe_auth(mut self, enabled: bool) -> Self {
        self.enable_unsafe_auth = enabled;
        self
    }

    /// Includes internal error details in responses.
    #[must_use]
    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    /// Returns the publisher DID.
    #[must_use]
    pub fn publisher_did(&self) -> &str {
        &self.publisher_did
    }

    /// Returns the public hostname.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns `true` if unsafe auth mode is enabled.
    #[must_use]
    pub fn unsafe_auth_enabled(&self) -> bool {
        self.enable_unsafe_auth
    }

    /// Returns `true` if internal error details are sent to clients.
    #[must_use]
    pub fn expose_error_details(&self) -> bool {
        self.expose_error_details
    }

    /// Returns the service DID, `did:web:<hostname>`.
    #[must_use]
    pub fn service_did(&self) -> String {
        format!("did:web:{}", self.hostname)
    }

    /// Returns the public service endpoint, `https://<hostname>`.
    #[must_use]
    pub fn service_endpoint(&self) -> String {
        format!("https://{}", self.hostname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfeed_config::FeedConfig;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(
            config.shutdown_timeout(),
            Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_body_size(), DEFAULT_MAX_BODY_SIZE);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::builder()
            .http_addr("0.0.0.0:9090")
            .shutdown_timeout(Duration::from_secs(45))
            .request_timeout(Duration::from_millis(250))
            .build();

        assert_eq!(config.http_addr(), "0.0.0.0:9090");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(45));
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_socket_addr_parsing() {
        let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
        assert!(addr.ip().is_loopback());

        let config = ServerConfig::builder().http_addr("localhost").build();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_server_config_from_config() {
        let mut config = SkyfeedConfig::default();
        config.server.http_addr = "127.0.0.1:4000".to_string();
        config.server.shutdown_timeout_secs = 5;
        config.server.request_timeout_ms = 1500;
        config.server.max_body_size = 2048;

        let server = ServerConfig::from_config(&config);
        assert_eq!(server.http_addr(), "127.0.0.1:4000");
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(server.request_timeout(), Duration::from_millis(1500));
        assert_eq!(server.max_body_size(), 2048);
    }

    #[test]
    fn test_feed_settings_derived_values() {
        let settings = FeedSettings::new("did:plc:abc", "feeds.example.com");

        assert_eq!(settings.service_did(), "did:web:feeds.example.com");
        assert_eq!(settings.service_endpoint(), "https://feeds.example.com");
        assert!(!settings.unsafe_auth_enabled());
        assert!(!settings.expose_error_details());
    }

    #[test]
    fn test_feed_settings_from_config() {
        let config = SkyfeedConfig::builder()
            .feed(FeedConfig {
                publisher_did: " did:plc:abc ".to_string(),
                hostname: "feeds.example.com".to_string(),
                enable_unsafe_auth: true,
                expose_error_details: true,
            })
            .build();

        let settings = FeedSettings::from_config(&config);
        assert_eq!(settings.publisher_did(), "did:plc:abc");
        assert!(settings.unsafe_auth_enabled());
        assert!(settings.expose_error_details());
    }
}
