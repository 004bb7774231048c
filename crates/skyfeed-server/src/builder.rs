//! Assembling a feed generator.

use std::time::Duration;

use skyfeed_config::{ConfigError, SkyfeedConfig};
use skyfeed_core::{
    FeedError, FeedHandle, FeedRegistry, FeedResult, Interaction, InteractionDispatcher,
    InteractionHandler, RequestContext,
};

use crate::config::{FeedSettings, ServerConfigBuilder};
use crate::error::ServerError;
use crate::server::Server;
use crate::service::FeedService;

/// Builder for a feed generator [`Server`].
///
/// Feed registration errors are kept until [`build`](Self::build), so feeds
/// can be chained.
///
/// # Example
///
/// ```rust
/// use skyfeed_core::{FeedArgs, FeedHandle, FeedPage};
/// use skyfeed_server::{FeedSettings, Server};
///
/// let server = Server::builder()
///     .settings(FeedSettings::new("did:plc:abc123", "feeds.example.com"))
///     .feed("hot", FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())))
///     .build()
///     .unwrap();
///
/// assert_eq!(server.service().description().feeds.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct FeedGeneratorBuilder {
    config_builder: ServerConfigBuilder,
    settings: FeedSettings,
    registry: FeedRegistry,
    interactions: InteractionDispatcher,
    registration_error: Option<FeedError>,
}

impl FeedGeneratorBuilder {
    /// Creates a builder with default listener settings and no feeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &SkyfeedConfig) -> Self {
        Self {
            config_builder: ServerConfigBuilder::new()
                .http_addr(config.server.http_addr.clone())
                .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
                .request_timeout(Duration::from_millis(config.server.request_timeout_ms))
                .max_body_size(config.server.max_body_size),
            settings: FeedSettings::from_config(config),
            ..Self::default()
        }
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.http_addr(addr);
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.shutdown_timeout(timeout);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.request_timeout(timeout);
        self
    }

    /// Sets the maximum request body size in bytes.
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.config_builder = self.config_builder.max_body_size(bytes);
        self
    }

    /// Sets the feed generator identity and flags.
    #[must_use]
    pub fn settings(mut self, settings: FeedSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers a feed under `key`.
    ///
    /// An invalid key fails [`build`](Self::build).
    #[must_use]
    pub fn feed(mut self, key: impl Into<String>, handle: FeedHandle) -> Self {
        if self.registration_error.is_none() {
            if let Err(e) = self.registry.register(key, handle) {
                self.registration_error = Some(e);
            }
        }
        self
    }

    /// Replaces all feeds with a prepared registry.
    #[must_use]
    pub fn registry(mut self, registry: FeedRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Installs the `sendInteractions` handler.
    #[must_use]
    pub fn interaction_handler(mut self, handler: impl InteractionHandler) -> Self {
        self.interactions = InteractionDispatcher::with_handler(handler);
        self
    }

    /// Installs a closure as the `sendInteractions` handler.
    #[must_use]
    pub fn on_interactions<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Interaction], &RequestContext) -> FeedResult<()> + Send + Sync + 'static,
    {
        self.interactions = InteractionDispatcher::from_fn(f);
        self
    }

    /// Builds the server.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Setup`] if a feed key was rejected
    /// - [`ServerError::Config`] if the publisher DID or hostname is missing
    pub fn build(self) -> Result<Server, ServerError> {
        if let Some(e) = self.registration_error {
            return Err(e.into());
        }
        if self.settings.publisher_did().is_empty() {
            return Err(ConfigError::missing_field("feed.publisher_did").into());
        }
        if self.settings.hostname().is_empty() {
            return Err(ConfigError::missing_field("feed.hostname").into());
        }

        if self.registry.is_empty() {
            tracing::warn!("Building a feed generator without feeds");
        }

        let service = FeedService::new(self.settings, self.registry, self.interactions);
        Ok(Server::new(self.config_builder.build(), service))
    }
}
