//! Typed configuration system for skyfeed.
//!
//! This crate provides a strongly-typed configuration system for feed
//! generator servers with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! The configuration system is built around the [`SkyfeedConfig`] struct:
//!
//! - [`ServerConfig`] - HTTP listener settings (address, timeouts)
//! - [`FeedConfig`] - Publisher DID, hostname and feed behavior flags
//! - [`LoggingConfig`] - Log level and format
//! - [`MetricsConfig`] - Prometheus exporter
//!
//! # Example
//!
//! ```no_run
//! use skyfeed_config::ConfigLoader;
//!
//! # fn main() -> Result<(), skyfeed_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("skyfeed.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("SKYFEED")
//!     .load()?;
//!
//! println!("Server will listen on: {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:3000"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! max_body_size = 1048576
//!
//! [feed]
//! publisher_did = "did:plc:abc123"
//! hostname = "feeds.example.com"
//! enable_unsafe_auth = false
//! expose_error_details = false
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment Variable Overrides
//!
//! All configuration values can be overridden via environment variables using
//! the format `PREFIX__SECTION__KEY`. For example:
//!
//! - `SKYFEED__SERVER__HTTP_ADDR=0.0.0.0:8000`
//! - `SKYFEED__FEED__PUBLISHER_DID=did:plc:abc123`
//! - `SKYFEED__METRICS__ENABLED=false`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
