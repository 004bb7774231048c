//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, LogFormat, SkyfeedConfig};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code), or a preset
/// 2. Configuration files and strings (TOML or JSON), merged key by key
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use skyfeed_config::ConfigLoader;
///
/// # fn main() -> Result<(), skyfeed_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("skyfeed.toml")?
///     .with_env_prefix("SKYFEED")
///     .load()?;
///
/// println!("Serving feeds for {}", config.service_did());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: SkyfeedConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader, starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SkyfeedConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    ///
    /// This is called automatically by `new()`, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = SkyfeedConfig::default();
        self
    }

    /// Start with the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use skyfeed_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load_unvalidated();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = SkyfeedConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = SkyfeedConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// Supports TOML (.toml) and JSON (.json) formats.
    /// The file format is determined by the file extension. Keys present in
    /// the file override the current values; absent keys keep them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some(format @ ("toml" | "json")) => self.with_string(&content, format),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    /// Load configuration from an optional file.
    ///
    /// If the file exists, loads it. If not, silently continues.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string.
    ///
    /// # Arguments
    ///
    /// * `content` - Configuration content as a string
    /// * `format` - File format ("toml" or "json")
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the content has unknown
    /// fields.
    ///
    /// # Example
    ///
    /// ```
    /// use skyfeed_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [feed]
    ///     publisher_did = "did:plc:abc123"
    ///     hostname = "feeds.example.com"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.service_did(), "did:web:feeds.example.com");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, layer);
        self.config = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`.
    /// For example, with prefix "SKYFEED":
    /// - `SKYFEED__SERVER__HTTP_ADDR=0.0.0.0:8000`
    /// - `SKYFEED__FEED__PUBLISHER_DID=did:plc:abc123`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment.
    ///
    /// A missing `.env` file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::validation_error(format!(
                "failed to load .env file: {e}"
            ))),
        }
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Environment variable parsing fails
    /// - Configuration validation fails
    pub fn load(self) -> Result<SkyfeedConfig, ConfigError> {
        let config = self.resolve()?;
        config.validate()?;
        Ok(config)
    }

    /// Finalize without validation.
    ///
    /// Environment overrides that fail to parse are skipped.
    #[must_use]
    pub fn load_unvalidated(mut self) -> SkyfeedConfig {
        if let Some(prefix) = self.env_prefix.take() {
            for (key, value) in prefixed_env_vars(&prefix) {
                let _ = self.apply_env_var(&key, &value, &prefix);
            }
        }
        self.config
    }

    fn resolve(mut self) -> Result<SkyfeedConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            for (key, value) in prefixed_env_vars(&prefix) {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }
        Ok(self.config)
    }

    // Apply a single environment variable
    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            // Server section
            ["SERVER", "HTTP_ADDR"] => {
                self.config.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                self.config.server.request_timeout_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["SERVER", "MAX_BODY_SIZE"] => {
                self.config.server.max_body_size = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }

            // Feed section
            ["FEED", "PUBLISHER_DID"] => {
                self.config.feed.publisher_did = value.to_string();
            }
            ["FEED", "HOSTNAME"] => {
                self.config.feed.hostname = value.to_string();
            }
            ["FEED", "ENABLE_UNSAFE_AUTH"] => {
                self.config.feed.enable_unsafe_auth = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["FEED", "EXPOSE_ERROR_DETAILS"] => {
                self.config.feed.expose_error_details = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            // Logging section
            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                self.config.logging.include_location = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            // Metrics section
            ["METRICS", "ENABLED"] => {
                self.config.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["METRICS", "ADDR"] => {
                self.config.metrics.addr = value.to_string();
            }

            _ => {
                tracing::debug!(var = %key, "Ignoring unknown configuration variable");
            }
        }

        Ok(())
    }
}

// Sorted so overrides apply in a stable order.
fn prefixed_env_vars(prefix: &str) -> BTreeMap<String, String> {
    let with_separator = format!("{prefix}__");
    env::vars()
        .filter(|(k, _)| k.starts_with(&with_separator))
        .collect()
}

// Objects merge recursively; any other value replaces the base.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FEED_TOML: &str = r#"
        [feed]
        publisher_did = "did:plc:abc123"
        hostname = "feeds.example.com"
    "#;

    #[test]
    fn test_loader_defaults_need_feed_identity() {
        let result = ConfigLoader::new().load();
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_loader_with_string_toml() {
        let config = ConfigLoader::new()
            .with_string(FEED_TOML, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.feed.publisher_did, "did:plc:abc123");
        assert_eq!(config.server.http_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"feed": {"publisher_did": "did:plc:abc123", "hostname": "feeds.example.com", "enable_unsafe_auth": true}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.feed.enable_unsafe_auth);
    }

    #[test]
    fn test_loader_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: b", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_layers_merge_key_by_key() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string(FEED_TOML, "toml")
            .unwrap()
            .with_string("[server]\nrequest_timeout_ms = 5000", "toml")
            .unwrap()
            .load()
            .unwrap();

        // Preset survives the file layers
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.feed.hostname, "feeds.example.com");
        assert_eq!(config.server.request_timeout_ms, 5000);
        assert_eq!(config.server.http_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_unknown_field_in_layer_rejected() {
        let result = ConfigLoader::new().with_string("[feed]\nalgorithm = \"hot\"", "toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(FEED_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.service_did(), "did:web:feeds.example.com");
    }

    #[test]
    fn test_loader_with_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"feed": {"publisher_did": "did:plc:abc123", "hostname": "h.example"}}"#)
            .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.feed.hostname, "h.example");
    }

    #[test]
    fn test_loader_with_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/skyfeed.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/skyfeed.toml")
            .unwrap()
            .load_unvalidated();

        assert_eq!(config.server.http_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_env_prefix_overrides() {
        // Unique prefix so parallel tests never see these variables.
        env::set_var("SKYFEEDLOADERTEST__FEED__PUBLISHER_DID", "did:plc:fromenv");
        env::set_var("SKYFEEDLOADERTEST__FEED__HOSTNAME", "env.example.com");
        env::set_var("SKYFEEDLOADERTEST__SERVER__REQUEST_TIMEOUT_MS", "1500");
        env::set_var("SKYFEEDLOADERTEST__SERVER__MAX_BODY_SIZE", "4096");

        let config = ConfigLoader::new()
            .with_string(FEED_TOML, "toml")
            .unwrap()
            .with_env_prefix("skyfeedloadertest")
            .load()
            .unwrap();

        assert_eq!(config.feed.publisher_did, "did:plc:fromenv");
        assert_eq!(config.feed.hostname, "env.example.com");
        assert_eq!(config.server.request_timeout_ms, 1500);
        assert_eq!(config.server.max_body_size, 4096);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));

        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));

        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_apply_env_var_feed_flags() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__FEED__ENABLE_UNSAFE_AUTH", "yes", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__FEED__EXPOSE_ERROR_DETAILS", "on", "TEST")
            .unwrap();
        assert!(loader.config.feed.enable_unsafe_auth);
        assert!(loader.config.feed.expose_error_details);
    }

    #[test]
    fn test_apply_env_var_invalid_boolean() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__METRICS__ENABLED", "sometimes", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_apply_env_var_invalid_integer() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__SERVER__SHUTDOWN_TIMEOUT_SECS", "soon", "TEST");
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_env_var_log_format() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__LOGGING__FORMAT", "pretty", "TEST")
            .unwrap();
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);

        let result = loader.apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST");
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_env_var_unknown_key_ignored() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__FEED__ALGORITHM", "hot", "TEST")
            .is_ok());
    }

    #[test]
    fn test_merge_values() {
        let mut base = serde_json::json!({ "a": { "x": 1, "y": 2 }, "b": 1 });
        merge_values(&mut base, serde_json::json!({ "a": { "y": 3 }, "c": 4 }));
        assert_eq!(base, serde_json::json!({ "a": { "x": 1, "y": 3 }, "b": 1, "c": 4 }));
    }
}
