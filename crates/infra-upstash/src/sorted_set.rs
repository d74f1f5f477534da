// Upstash SortedSetStore Implementation

use crate::{Command, UpstashConfig};
use async_trait::async_trait;
use linkrelay_core::error::{AppError, Result};
use linkrelay_core::port::SortedSetStore;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// `{"result": ...}` on success, `{"error": "..."}` otherwise
#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

fn map_reqwest_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Storage(format!("Upstash request timed out: {}", err))
    } else if err.is_connect() {
        AppError::Storage(format!("Upstash unreachable: {}", err))
    } else {
        AppError::Storage(format!("Upstash request failed: {}", err))
    }
}

fn expect_integer(command: &str, value: Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        AppError::Storage(format!("{} returned a non-integer result: {}", command, value))
    })
}

fn expect_string_list(command: &str, value: Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(AppError::Storage(format!(
                    "{} returned a non-string member: {}",
                    command, other
                ))),
            })
            .collect(),
        other => Err(AppError::Storage(format!(
            "{} returned a non-array result: {}",
            command, other
        ))),
    }
}

/// Sorted sets on a hosted Redis reached over HTTPS
///
/// Each operation is one REST round-trip; key expiry is native.
pub struct UpstashSortedSetStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl UpstashSortedSetStore {
    pub fn new(config: UpstashConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    async fn execute(&self, command: Command<'_>) -> Result<Value> {
        let name = command.name();
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&command.to_args())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body: CommandResponse = response.json().await.map_err(|e| {
            AppError::Storage(format!("{} response unreadable (HTTP {}): {}", name, status, e))
        })?;

        if let Some(error) = body.error {
            return Err(AppError::Storage(format!("{} failed: {}", name, error)));
        }
        if !status.is_success() {
            return Err(AppError::Storage(format!("{} failed with HTTP {}", name, status)));
        }
        debug!(command = name, "Upstash command ok");
        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl SortedSetStore for UpstashSortedSetStore {
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<()> {
        self.execute(Command::ZAdd { key, score, member }).await?;
        Ok(())
    }

    async fn range_by_rank(&self, key: &str, start: usize, stop: usize) -> Result<Vec<String>> {
        if stop < start {
            return Ok(vec![]);
        }
        let value = self.execute(Command::ZRange { key, start, stop }).await?;
        expect_string_list("ZRANGE", value)
    }

    async fn remove(&self, key: &str, member: &str) -> Result<bool> {
        let value = self.execute(Command::ZRem { key, member }).await?;
        Ok(expect_integer("ZREM", value)? == 1)
    }

    async fn remove_below_score(&self, key: &str, cutoff: i64) -> Result<u64> {
        let value = self
            .execute(Command::ZRemRangeByScoreBelow { key, cutoff })
            .await?;
        expect_integer("ZREMRANGEBYSCORE", value)
    }

    async fn cardinality(&self, key: &str) -> Result<usize> {
        let value = self.execute(Command::ZCard { key }).await?;
        Ok(expect_integer("ZCARD", value)? as usize)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<()> {
        self.execute(Command::Expire {
            key,
            seconds: ttl_seconds,
        })
        .await?;
        Ok(())
    }
}
