//! Error types and handling for the `Kidson` application

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = KidsonError> = std::result::Result<T, E>;

/// Main error type for the `Kidson` application
#[derive(Error, Debug)]
pub enum KidsonError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream search-provider errors (non-2xx, network failure)
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// Suitability-classifier errors (timeout, malformed response)
    #[error("Classifier error: {message}")]
    Classifier { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl KidsonError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create a new classifier error
    pub fn classifier<S: Into<String>>(message: S) -> Self {
        Self::Classifier {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            KidsonError::Config { .. } => {
                "Configuration error. Please check your environment variables.".to_string()
            }
            KidsonError::Provider { .. } => {
                "Unable to reach the place-search provider. Please try again.".to_string()
            }
            KidsonError::Classifier { .. } => {
                "Place classification is temporarily unavailable.".to_string()
            }
            KidsonError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            KidsonError::Cache { .. } => "Cache operation failed.".to_string(),
            KidsonError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            KidsonError::General { message } => message.clone(),
        }
    }
}

/// Recover a typed error carried inside an `anyhow` chain; anything else
/// becomes a general error with the full context string.
impl From<anyhow::Error> for KidsonError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<KidsonError>() {
            Ok(typed) => typed,
            Err(other) => KidsonError::general(format!("{other:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = KidsonError::config("missing client id");
        assert!(matches!(config_err, KidsonError::Config { .. }));

        let provider_err = KidsonError::provider("connection failed");
        assert!(matches!(provider_err, KidsonError::Provider { .. }));

        let validation_err = KidsonError::validation("invalid coordinates");
        assert!(matches!(validation_err, KidsonError::Validation { .. }));
    }

    #[test]
    fn test_user_messages() {
        let config_err = KidsonError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let provider_err = KidsonError::provider("test");
        assert!(provider_err.user_message().contains("place-search provider"));

        let validation_err = KidsonError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let kidson_err: KidsonError = io_err.into();
        assert!(matches!(kidson_err, KidsonError::Io { .. }));
    }

    #[test]
    fn test_anyhow_downcast_recovers_typed_error() {
        let wrapped: anyhow::Error = KidsonError::provider("naver down").into();
        let recovered: KidsonError = wrapped.into();
        assert!(matches!(recovered, KidsonError::Provider { .. }));

        let plain: KidsonError = anyhow::anyhow!("boom").into();
        assert!(matches!(plain, KidsonError::General { .. }));
    }
}
