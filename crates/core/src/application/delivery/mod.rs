// Delivery Service - enqueue and poll use cases behind both HTTP endpoints

pub mod enqueue;
pub mod poll;

pub use enqueue::EnqueueOutcome;
pub use poll::PollOutcome;

use crate::application::QueueStore;
use crate::domain::{QueryParams, Token, TokenFormat};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const DOCS_NOTE: &str = "Want to know how to use this tool to open links in your local browser from automation tools like n8n, Zapier, your own code, or anywhere you can trigger webhooks?";

/// Pointer back to the landing page, attached to enqueue responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsInfo {
    pub hyperlink: String,
    pub note: String,
}

pub struct DeliveryService {
    queue: Arc<QueueStore>,
    token_format: TokenFormat,
    public_base_url: String,
}

impl DeliveryService {
    pub fn new(
        queue: Arc<QueueStore>,
        token_format: TokenFormat,
        public_base_url: impl Into<String>,
    ) -> Self {
        let public_base_url: String = public_base_url.into();
        Self {
            queue,
            token_format,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Enqueue every link found in the request
    pub async fn enqueue(
        &self,
        raw_token: &str,
        query: &QueryParams,
        body: Option<&Value>,
    ) -> Result<EnqueueOutcome> {
        let token = self.authorize(raw_token)?;
        enqueue::execute(&self.queue, &token, query, body, &self.usage_examples()).await
    }

    /// Hand out the next batch of pending links
    pub async fn poll(&self, raw_token: &str) -> Result<PollOutcome> {
        let token = self.authorize(raw_token)?;
        poll::execute(&self.queue, &token).await
    }

    /// Landing-page link; only valid tokens are echoed back
    pub fn docs(&self, raw_token: &str) -> DocsInfo {
        let hyperlink = match self.token_format.parse(raw_token) {
            Some(token) => format!("{}/#{}", self.public_base_url, token),
            None => self.public_base_url.clone(),
        };
        DocsInfo {
            hyperlink,
            note: DOCS_NOTE.to_string(),
        }
    }

    pub fn token_format(&self) -> &TokenFormat {
        &self.token_format
    }

    fn authorize(&self, raw_token: &str) -> Result<Token> {
        self.token_format
            .parse(raw_token)
            .ok_or(AppError::InvalidToken)
    }

    fn usage_examples(&self) -> Vec<String> {
        let base = &self.public_base_url;
        vec![
            format!("{}/<TOKEN>?link=example.com", base),
            format!(
                "curl -X POST {}/<TOKEN> -H 'content-type: application/json' -d '{{\"links\":[\"example.com\"]}}'",
                base
            ),
        ]
    }
}
