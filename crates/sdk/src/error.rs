//! SDK Error Types

use linkrelay_core::error::AppError;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with `{ok: false, ...}`
    #[error("Server rejected request ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        limit: Option<usize>,
        examples: Vec<String>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl SdkError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            SdkError::Connection(e.to_string())
        } else if e.is_timeout() {
            SdkError::Transport(format!("Request timed out: {}", e))
        } else if e.is_decode() {
            SdkError::Transport(format!("Unreadable response: {}", e))
        } else {
            SdkError::Transport(e.to_string())
        }
    }
}

/// Poll failures surface to the scheduler as delivery errors
impl From<SdkError> for AppError {
    fn from(e: SdkError) -> Self {
        AppError::Delivery(e.to_string())
    }
}
