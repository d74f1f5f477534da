// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    #[error("Invalid queue settings: {0}")]
    InvalidQueueSettings(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
