// Central Error Type for the Application

use thiserror::Error;

/// Generic message for tokens that fail validation, whichever check failed
pub const INVALID_TOKEN_MESSAGE: &str =
    "Invalid endpoint. Install or reinstall the extension to generate a valid webhook URL.";

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("{}", INVALID_TOKEN_MESSAGE)]
    InvalidToken,

    #[error("Missing link(s). Provide ?link=example.com or POST {{\"links\":[...]}}")]
    NoLinks { examples: Vec<String> },

    #[error("Queue limit reached for this endpoint. Wait for delivery or reduce incoming links.")]
    QuotaExceeded { limit: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures a caller may retry later without changing the request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Storage(_) | AppError::Delivery(_) | AppError::Io(_)
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error and reqwest::Error conversions are handled in the adapter
// crates by mapping to AppError::Storage(String)

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_token_message_is_generic() {
        let msg = AppError::InvalidToken.to_string();
        assert_eq!(msg, INVALID_TOKEN_MESSAGE);
        assert!(!msg.contains("length"));
        assert!(!msg.contains("marker"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(AppError::Storage("down".into()).is_transient());
        assert!(!AppError::QuotaExceeded { limit: 100 }.is_transient());
        assert!(!AppError::InvalidToken.is_transient());
    }
}
