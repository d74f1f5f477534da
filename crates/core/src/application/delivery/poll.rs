// Poll Use Case

use crate::application::QueueStore;
use crate::domain::Token;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Links handed to the consumer by one poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOutcome {
    pub delivered: usize,
    pub links: Vec<String>,
}

/// Execute poll for an already validated token
pub async fn execute(queue: &QueueStore, token: &Token) -> Result<PollOutcome> {
    queue.cleanup(token).await?;

    let links = queue
        .dequeue(token, queue.settings().max_deliver_per_poll)
        .await?;

    if links.is_empty() {
        debug!(token_hint = %token.hint(), "Poll found nothing pending");
        return Ok(PollOutcome::default());
    }

    queue.refresh_expiry(token).await?;
    info!(token_hint = %token.hint(), delivered = links.len(), "Links delivered");

    Ok(PollOutcome {
        delivered: links.len(),
        links,
    })
}
