//! linkrelay Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{EnqueueRequest, EnqueueResponse, ErrorResponse, PollResponse};
use async_trait::async_trait;
use linkrelay_core::domain::Token;
use linkrelay_core::port::DeliveryClient;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Request timeout when none is given
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a linkrelay server
///
/// The server base URL is passed per call: a consumer can switch servers at
/// runtime without rebuilding the client.
#[derive(Debug, Clone)]
pub struct LinkRelayClient {
    http: reqwest::Client,
}

impl LinkRelayClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;
        Ok(Self { http })
    }

    /// Queue `links` for the consumer holding `token`
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use linkrelay_sdk::LinkRelayClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = LinkRelayClient::new()?;
    /// let response = client
    ///     .enqueue("http://127.0.0.1:3000", "A2B3C4D5OTL6E7F8", &["example.com", "rust-lang.org"])
    ///     .await?;
    /// assert_eq!(response.queued, 2);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enqueue<S: AsRef<str>>(
        &self,
        base_url: &str,
        token: &str,
        links: &[S],
    ) -> Result<EnqueueResponse> {
        let request = EnqueueRequest {
            links: links.iter().map(|l| l.as_ref().to_string()).collect(),
        };
        let response = self
            .http
            .post(enqueue_url(base_url, token))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    /// Take the next batch of pending links
    pub async fn poll(&self, base_url: &str, token: &str) -> Result<PollResponse> {
        let response = self.http.get(poll_url(base_url, token)).send().await?;
        decode(response).await
    }
}

pub(crate) fn enqueue_url(base_url: &str, token: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), token)
}

pub(crate) fn poll_url(base_url: &str, token: &str) -> String {
    format!("{}/{}/extension-poll", base_url.trim_end_matches('/'), token)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }
    Err(rejection(status.as_u16(), &body))
}

/// Best effort: a non-JSON error page still yields a usable message
fn rejection(status: u16, body: &[u8]) -> SdkError {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(err) => SdkError::Api {
            status,
            message: err.error,
            limit: err.limit,
            examples: err.examples.unwrap_or_default(),
        },
        Err(_) => SdkError::Api {
            status,
            message: String::from_utf8_lossy(body).trim().chars().take(200).collect(),
            limit: None,
            examples: vec![],
        },
    }
}

#[async_trait]
impl DeliveryClient for LinkRelayClient {
    async fn poll(&self, base_url: &str, token: &Token) -> linkrelay_core::error::Result<Vec<String>> {
        let response = LinkRelayClient::poll(self, base_url, token.as_str()).await?;
        debug!(delivered = response.delivered, "Poll response received");
        Ok(response.links)
    }
}
