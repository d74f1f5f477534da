// Queue Store - per-token FIFO over the sorted-set port

use crate::domain::{QueueItem, QueueSettings, Token};
use crate::error::Result;
use crate::port::{SortedSetStore, TimeProvider};
use std::sync::Arc;
use tracing::{debug, warn};

/// Token-scoped queue operations
///
/// Items are scored by their enqueue timestamp, so rank order is FIFO.
/// Nothing here validates tokens; the delivery service does that first.
pub struct QueueStore {
    store: Arc<dyn SortedSetStore>,
    time_provider: Arc<dyn TimeProvider>,
    settings: QueueSettings,
}

impl QueueStore {
    pub fn new(
        store: Arc<dyn SortedSetStore>,
        time_provider: Arc<dyn TimeProvider>,
        settings: QueueSettings,
    ) -> Self {
        Self {
            store,
            time_provider,
            settings,
        }
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Storage key for a token's queue
    pub fn key_for(&self, token: &Token) -> String {
        format!("{}{}", self.settings.key_prefix, token.as_str())
    }

    /// Drop items older than the retention window
    ///
    /// An item scored exactly at the cutoff survives this pass.
    pub async fn cleanup(&self, token: &Token) -> Result<u64> {
        let cutoff = self.time_provider.now_millis() - self.settings.item_ttl_ms();
        let removed = self
            .store
            .remove_below_score(&self.key_for(token), cutoff)
            .await?;
        if removed > 0 {
            debug!(token_hint = %token.hint(), removed, "Expired queue items removed");
        }
        Ok(removed)
    }

    pub async fn size(&self, token: &Token) -> Result<usize> {
        self.store.cardinality(&self.key_for(token)).await
    }

    /// Append links in the given order, all sharing one timestamp
    pub async fn enqueue(&self, token: &Token, urls: &[String]) -> Result<Vec<QueueItem>> {
        let key = self.key_for(token);
        let now = self.time_provider.now_millis();

        let mut items = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            let item = QueueItem::new(url.clone(), now, index);
            self.store.add(&key, now, &item.to_member()?).await?;
            items.push(item);
        }
        Ok(items)
    }

    /// Pop up to `max` oldest links
    ///
    /// Members are removed one by one; only those this call actually removed
    /// are returned, so two concurrent pollers never both deliver a link.
    pub async fn dequeue(&self, token: &Token, max: usize) -> Result<Vec<String>> {
        if max == 0 {
            return Ok(vec![]);
        }
        let key = self.key_for(token);
        let members = self.store.range_by_rank(&key, 0, max - 1).await?;

        let mut urls = Vec::with_capacity(members.len());
        for member in members {
            if !self.store.remove(&key, &member).await? {
                debug!(token_hint = %token.hint(), "Queue item already taken by another poll");
                continue;
            }
            match QueueItem::from_member(&member) {
                Ok(item) => urls.push(item.url),
                Err(e) => {
                    warn!(token_hint = %token.hint(), error = %e, "Dropping undecodable queue item");
                }
            }
        }
        Ok(urls)
    }

    /// Reset the key-level expiry to the retention window
    pub async fn refresh_expiry(&self, token: &Token) -> Result<()> {
        self.store
            .expire(&self.key_for(token), self.settings.item_ttl_seconds)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TokenFormat;
    use crate::port::sorted_set::memory::InMemorySortedSetStore;
    use crate::port::time_provider::ManualTimeProvider;

    const TTL_SECONDS: u64 = 60;

    struct Fixture {
        clock: Arc<ManualTimeProvider>,
        sets: Arc<InMemorySortedSetStore>,
        queue: QueueStore,
        token: Token,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualTimeProvider::new(1_700_000_000_000));
        let sets = Arc::new(InMemorySortedSetStore::new(clock.clone()));
        let settings = QueueSettings {
            item_ttl_seconds: TTL_SECONDS,
            ..Default::default()
        };
        let queue = QueueStore::new(sets.clone(), clock.clone(), settings);
        Fixture {
            clock,
            sets,
            queue,
            token: TokenFormat::default().generate(),
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_key_uses_prefix() {
        let f = fixture();
        assert_eq!(
            f.queue.key_for(&f.token),
            format!("otl:q:{}", f.token.as_str())
        );
    }

    #[tokio::test]
    async fn test_dequeue_is_fifo_across_batches() {
        let f = fixture();
        f.queue.enqueue(&f.token, &urls(&["a", "b"])).await.unwrap();
        f.clock.advance(5);
        f.queue.enqueue(&f.token, &urls(&["c"])).await.unwrap();

        let first = f.queue.dequeue(&f.token, 2).await.unwrap();
        assert_eq!(first, urls(&["a", "b"]));
        let second = f.queue.dequeue(&f.token, 2).await.unwrap();
        assert_eq!(second, urls(&["c"]));
        assert!(f.queue.dequeue(&f.token, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dequeue_zero_is_noop() {
        let f = fixture();
        f.queue.enqueue(&f.token, &urls(&["a"])).await.unwrap();
        assert!(f.queue.dequeue(&f.token, 0).await.unwrap().is_empty());
        assert_eq!(f.queue.size(&f.token).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_boundary() {
        let f = fixture();
        f.queue.enqueue(&f.token, &urls(&["old"])).await.unwrap();

        // Exactly at the cutoff: kept
        f.clock.advance(TTL_SECONDS as i64 * 1000);
        assert_eq!(f.queue.cleanup(&f.token).await.unwrap(), 0);
        assert_eq!(f.queue.size(&f.token).await.unwrap(), 1);

        f.clock.advance(1);
        assert_eq!(f.queue.cleanup(&f.token).await.unwrap(), 1);
        assert_eq!(f.queue.size(&f.token).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_member_is_removed_and_skipped() {
        let f = fixture();
        let key = f.queue.key_for(&f.token);
        let now = f.clock.now_millis();
        let valid = QueueItem::new("https://ok.com/", now + 1, 0);
        f.sets.add(&key, now, "{not json").await.unwrap();
        f.sets
            .add(&key, now + 1, &valid.to_member().unwrap())
            .await
            .unwrap();

        let links = f.queue.dequeue(&f.token, 10).await.unwrap();
        assert_eq!(links, urls(&["https://ok.com/"]));
        assert_eq!(f.queue.size(&f.token).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_queues_are_isolated_per_token() {
        let f = fixture();
        let other = TokenFormat::default().generate();
        f.queue.enqueue(&f.token, &urls(&["mine"])).await.unwrap();

        assert!(f.queue.dequeue(&other, 10).await.unwrap().is_empty());
        assert_eq!(f.queue.dequeue(&f.token, 10).await.unwrap(), urls(&["mine"]));
    }

    #[tokio::test]
    async fn test_refresh_expiry_keeps_key_alive() {
        let f = fixture();
        f.queue.enqueue(&f.token, &urls(&["a"])).await.unwrap();
        f.queue.refresh_expiry(&f.token).await.unwrap();

        f.clock.advance(TTL_SECONDS as i64 * 1000 - 1);
        assert_eq!(f.queue.size(&f.token).await.unwrap(), 1);
        f.clock.advance(1);
        assert_eq!(f.queue.size(&f.token).await.unwrap(), 0);
    }
}
