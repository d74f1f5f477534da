//! HTTP Error Mapping
//!
//! Maps application errors to status codes and the `{ok: false, ...}` body.

use crate::types::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use linkrelay_core::application::DocsInfo;
use linkrelay_core::error::AppError;
use tracing::{error, warn};

const STORAGE_UNAVAILABLE: &str = "Storage temporarily unavailable. Try again shortly.";
const INTERNAL_ERROR: &str = "Internal server error.";

/// An application error on its way out, plus the docs block when the route has one
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub docs: Option<DocsInfo>,
}

impl ApiError {
    pub fn new(error: AppError, docs: Option<DocsInfo>) -> Self {
        Self { error, docs }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self { error, docs: None }
    }
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::InvalidToken | AppError::NoLinks { .. } => StatusCode::BAD_REQUEST,
        AppError::Domain(_) | AppError::Serialization(_) => StatusCode::BAD_REQUEST,
        AppError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        AppError::Storage(_) | AppError::Io(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Delivery(_) => StatusCode::BAD_GATEWAY,
        AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);

        // Backend details stay in the log
        let message = match &self.error {
            AppError::Storage(_) | AppError::Io(_) => {
                error!(error = %self.error, "Storage failure while serving request");
                STORAGE_UNAVAILABLE.to_string()
            }
            AppError::Config(_) | AppError::Internal(_) | AppError::Delivery(_) => {
                error!(error = %self.error, "Request failed");
                INTERNAL_ERROR.to_string()
            }
            other => {
                warn!(status = status.as_u16(), error = %other, "Request rejected");
                other.to_string()
            }
        };

        let (examples, limit) = match self.error {
            AppError::NoLinks { examples } => (Some(examples), None),
            AppError::QuotaExceeded { limit } => (None, Some(limit)),
            _ => (None, None),
        };

        let body = ErrorResponse {
            ok: false,
            error: message,
            examples,
            limit,
            docs: self.docs,
        };
        (status, Json(body)).into_response()
    }
}
