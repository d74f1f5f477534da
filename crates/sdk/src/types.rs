//! SDK Request/Response Types
//!
//! Mirrors the JSON bodies served by the api-http crate.

use serde::{Deserialize, Serialize};

/// `POST /{token}` body
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueRequest {
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Docs {
    pub hyperlink: String,
    pub note: String,
}

/// Response from the enqueue endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueResponse {
    pub ok: bool,
    pub queued: usize,
    pub links: Vec<String>,
    pub message: String,
    #[serde(default)]
    pub docs: Option<Docs>,
}

/// Response from the poll endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PollResponse {
    pub ok: bool,
    pub delivered: usize,
    pub links: Vec<String>,
}

/// Body of a rejected request
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(default)]
    pub examples: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<usize>,
}
