//! HTTP Request/Response Types

use linkrelay_core::application::{DocsInfo, EnqueueOutcome, PollOutcome};
use serde::{Deserialize, Serialize};

/// `GET|POST /{token}` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub ok: bool,
    pub queued: usize,
    pub links: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<DocsInfo>,
}

impl EnqueueResponse {
    pub fn new(outcome: EnqueueOutcome, docs: Option<DocsInfo>) -> Self {
        Self {
            ok: true,
            queued: outcome.queued,
            links: outcome.links,
            message: outcome.message,
            docs,
        }
    }
}

/// `GET /{token}/extension-poll` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub ok: bool,
    pub delivered: usize,
    pub links: Vec<String>,
}

impl From<PollOutcome> for PollResponse {
    fn from(outcome: PollOutcome) -> Self {
        Self {
            ok: true,
            delivered: outcome.delivered,
            links: outcome.links,
        }
    }
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<DocsInfo>,
}
