// Enqueue Use Case

use crate::application::QueueStore;
use crate::domain::{extract_from_request, QueryParams, Token};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Result of a successful enqueue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueOutcome {
    pub queued: usize,
    pub links: Vec<String>,
    pub message: String,
}

/// Execute enqueue for an already validated token
///
/// Order matters: nothing touches storage before links are known to be
/// present, and the quota check runs on a freshly cleaned queue. Quota and
/// write are not atomic, so concurrent producers may overshoot the limit by
/// at most one batch.
pub async fn execute(
    queue: &QueueStore,
    token: &Token,
    query: &QueryParams,
    body: Option<&Value>,
    usage_examples: &[String],
) -> Result<EnqueueOutcome> {
    let links = extract_from_request(query, body);
    if links.is_empty() {
        return Err(AppError::NoLinks {
            examples: usage_examples.to_vec(),
        });
    }

    queue.cleanup(token).await?;

    let limit = queue.settings().max_queue_size;
    let current = queue.size(token).await?;
    if current + links.len() > limit {
        info!(
            token_hint = %token.hint(),
            current,
            incoming = links.len(),
            limit,
            "Enqueue rejected: queue full"
        );
        return Err(AppError::QuotaExceeded { limit });
    }

    queue.enqueue(token, &links).await?;
    queue.refresh_expiry(token).await?;

    info!(token_hint = %token.hint(), queued = links.len(), "Links queued");

    Ok(EnqueueOutcome {
        queued: links.len(),
        message: format!(
            "Queued {} to be opened in your browser.",
            format_link_count(links.len())
        ),
        links,
    })
}

fn format_link_count(count: usize) -> String {
    if count == 1 {
        "one link".to_string()
    } else {
        format!("{} links", count)
    }
}
