// Sorted Set Port
// The narrow storage interface the queue engine needs from a backend

use crate::error::Result;
use async_trait::async_trait;

/// Ordered-by-score collection keyed by string
///
/// Scores are epoch milliseconds. Members with equal scores keep a stable
/// order (insertion order for the in-process and SQLite adapters).
///
/// Implementations:
/// - `memory::InMemorySortedSetStore`: tests and single-process deployments
/// - SQLite adapter (`linkrelay-infra-sqlite`)
/// - REST adapter (`linkrelay-infra-upstash`)
#[async_trait]
pub trait SortedSetStore: Send + Sync {
    /// Insert `member` with `score`; an existing member only gets its score updated
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<()>;

    /// Members ranked `start..=stop` in ascending score order
    async fn range_by_rank(&self, key: &str, start: usize, stop: usize) -> Result<Vec<String>>;

    /// Remove one member by identity; false when it was already gone
    async fn remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove every member scored strictly below `cutoff`
    async fn remove_below_score(&self, key: &str, cutoff: i64) -> Result<u64>;

    /// Number of members
    async fn cardinality(&self, key: &str) -> Result<usize>;

    /// Reset the key's own expiry; no-op for a missing key
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<()>;
}

pub mod memory {
    //! In-process sorted sets guarded by one mutex

    use super::SortedSetStore;
    use crate::error::Result;
    use crate::port::maintenance::{Maintenance, MaintenanceStats};
    use crate::port::TimeProvider;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, MutexGuard};

    #[derive(Debug, Default)]
    struct SortedSet {
        // (score, insertion sequence, member), kept sorted
        entries: Vec<(i64, u64, String)>,
        expires_at_ms: Option<i64>,
    }

    #[derive(Debug, Default)]
    struct Inner {
        sets: HashMap<String, SortedSet>,
        next_seq: u64,
    }

    pub struct InMemorySortedSetStore {
        inner: Mutex<Inner>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl InMemorySortedSetStore {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                inner: Mutex::new(Inner::default()),
                time_provider,
            }
        }

        fn lock(&self) -> MutexGuard<'_, Inner> {
            // A panic while holding the lock cannot leave a set half-sorted
            self.inner.lock().unwrap_or_else(|p| p.into_inner())
        }

        /// Drop `key` if its expiry has passed, then return the live set
        fn live<'a>(inner: &'a mut Inner, key: &str, now: i64) -> Option<&'a mut SortedSet> {
            let expired = inner
                .sets
                .get(key)
                .and_then(|s| s.expires_at_ms)
                .is_some_and(|at| at <= now);
            if expired {
                inner.sets.remove(key);
            }
            inner.sets.get_mut(key)
        }

        fn drop_if_empty(inner: &mut Inner, key: &str) {
            if inner.sets.get(key).is_some_and(|s| s.entries.is_empty()) {
                inner.sets.remove(key);
            }
        }
    }

    #[async_trait]
    impl SortedSetStore for InMemorySortedSetStore {
        async fn add(&self, key: &str, score: i64, member: &str) -> Result<()> {
            let now = self.time_provider.now_millis();
            let mut inner = self.lock();
            Self::live(&mut inner, key, now);

            let seq = inner.next_seq;
            inner.next_seq += 1;

            let set = inner.sets.entry(key.to_string()).or_default();
            let seq = match set.entries.iter().position(|(_, _, m)| m == member) {
                Some(pos) => set.entries.remove(pos).1,
                None => seq,
            };
            let at = set
                .entries
                .partition_point(|(s, q, _)| (*s, *q) < (score, seq));
            set.entries.insert(at, (score, seq, member.to_string()));
            Ok(())
        }

        async fn range_by_rank(&self, key: &str, start: usize, stop: usize) -> Result<Vec<String>> {
            let now = self.time_provider.now_millis();
            let mut inner = self.lock();
            let Some(set) = Self::live(&mut inner, key, now) else {
                return Ok(vec![]);
            };
            Ok(set
                .entries
                .iter()
                .skip(start)
                .take(stop.saturating_sub(start).saturating_add(1))
                .map(|(_, _, m)| m.clone())
                .collect())
        }

        async fn remove(&self, key: &str, member: &str) -> Result<bool> {
            let now = self.time_provider.now_millis();
            let mut inner = self.lock();
            let removed = match Self::live(&mut inner, key, now) {
                Some(set) => match set.entries.iter().position(|(_, _, m)| m == member) {
                    Some(pos) => {
                        set.entries.remove(pos);
                        true
                    }
                    None => false,
                },
                None => false,
            };
            Self::drop_if_empty(&mut inner, key);
            Ok(removed)
        }

        async fn remove_below_score(&self, key: &str, cutoff: i64) -> Result<u64> {
            let now = self.time_provider.now_millis();
            let mut inner = self.lock();
            let removed = match Self::live(&mut inner, key, now) {
                Some(set) => {
                    let before = set.entries.len();
                    set.entries.retain(|(score, _, _)| *score >= cutoff);
                    (before - set.entries.len()) as u64
                }
                None => 0,
            };
            Self::drop_if_empty(&mut inner, key);
            Ok(removed)
        }

        async fn cardinality(&self, key: &str) -> Result<usize> {
            let now = self.time_provider.now_millis();
            let mut inner = self.lock();
            Ok(Self::live(&mut inner, key, now).map_or(0, |s| s.entries.len()))
        }

        async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<()> {
            let now = self.time_provider.now_millis();
            let mut inner = self.lock();
            if let Some(set) = Self::live(&mut inner, key, now) {
                set.expires_at_ms = Some(now.saturating_add(ttl_seconds as i64 * 1000));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Maintenance for InMemorySortedSetStore {
        async fn purge_expired(&self) -> Result<u64> {
            let now = self.time_provider.now_millis();
            let mut inner = self.lock();
            let before = inner.sets.len();
            inner
                .sets
                .retain(|_, set| set.expires_at_ms.map_or(true, |at| at > now));
            Ok((before - inner.sets.len()) as u64)
        }

        async fn get_stats(&self) -> Result<MaintenanceStats> {
            let inner = self.lock();
            Ok(MaintenanceStats {
                key_count: inner.sets.len() as i64,
                member_count: inner.sets.values().map(|s| s.entries.len() as i64).sum(),
                storage_bytes: None,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::port::time_provider::ManualTimeProvider;

        fn store() -> (Arc<ManualTimeProvider>, InMemorySortedSetStore) {
            let clock = Arc::new(ManualTimeProvider::new(1_000_000));
            let store = InMemorySortedSetStore::new(clock.clone());
            (clock, store)
        }

        #[tokio::test]
        async fn test_range_orders_by_score_then_insertion() {
            let (_, store) = store();
            store.add("k", 20, "late").await.unwrap();
            store.add("k", 10, "first").await.unwrap();
            store.add("k", 10, "second").await.unwrap();

            let all = store.range_by_rank("k", 0, 10).await.unwrap();
            assert_eq!(all, vec!["first", "second", "late"]);

            let head = store.range_by_rank("k", 0, 1).await.unwrap();
            assert_eq!(head, vec!["first", "second"]);
        }

        #[tokio::test]
        async fn test_remove_by_identity() {
            let (_, store) = store();
            store.add("k", 1, "a").await.unwrap();
            assert!(store.remove("k", "a").await.unwrap());
            assert!(!store.remove("k", "a").await.unwrap());
            assert_eq!(store.cardinality("k").await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_remove_below_score_is_exclusive() {
            let (_, store) = store();
            store.add("k", 99, "old").await.unwrap();
            store.add("k", 100, "edge").await.unwrap();
            store.add("k", 101, "new").await.unwrap();

            assert_eq!(store.remove_below_score("k", 100).await.unwrap(), 1);
            assert_eq!(
                store.range_by_rank("k", 0, 10).await.unwrap(),
                vec!["edge", "new"]
            );
        }

        #[tokio::test]
        async fn test_key_expiry() {
            let (clock, store) = store();
            store.add("k", 1, "a").await.unwrap();
            store.expire("k", 60).await.unwrap();

            clock.advance(59_999);
            assert_eq!(store.cardinality("k").await.unwrap(), 1);

            clock.advance(1);
            assert_eq!(store.cardinality("k").await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_expire_missing_key_is_noop() {
            let (_, store) = store();
            store.expire("missing", 60).await.unwrap();
            assert_eq!(store.get_stats().await.unwrap().key_count, 0);
        }

        #[tokio::test]
        async fn test_purge_expired_keys() {
            let (clock, store) = store();
            store.add("a", 1, "x").await.unwrap();
            store.add("b", 1, "y").await.unwrap();
            store.expire("a", 1).await.unwrap();

            clock.advance(1_000);
            assert_eq!(store.purge_expired().await.unwrap(), 1);

            let stats = store.get_stats().await.unwrap();
            assert_eq!(stats.key_count, 1);
            assert_eq!(stats.member_count, 1);
        }
    }
}
