// Delivery Client Port
// How the consumer asks the server for pending links

use crate::domain::Token;
use crate::error::Result;
use async_trait::async_trait;

/// Client side of the dequeue endpoint
///
/// Implementations apply their own timeout; a transient failure is reported
/// as `AppError::Delivery` and simply retried on the next scheduled poll.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Pop the next batch of links for `token` from the server at `base_url`
    async fn poll(&self, base_url: &str, token: &Token) -> Result<Vec<String>>;
}
