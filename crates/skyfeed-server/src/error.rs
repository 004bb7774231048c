//! Server error types.

use thiserror::Error;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("Bind error: {0}")]
    BindError(String),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The feed generator could not be assembled.
    #[error("Feed setup error: {0}")]
    Setup(#[from] skyfeed_core::FeedError),

    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] skyfeed_config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let bind_err = ServerError::BindError("Address in use".to_string());
        assert_eq!(bind_err.to_string(), "Bind error: Address in use");

        let io_err = ServerError::from(std::io::Error::other("Connection reset"));
        assert!(io_err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_setup_error_from_feed_error() {
        let err = ServerError::from(skyfeed_core::FeedError::invalid_key(
            "a/b",
            "must not contain '/'",
        ));
        assert!(matches!(err, ServerError::Setup(_)));
        assert!(err.to_string().contains("a/b"));
    }
}
