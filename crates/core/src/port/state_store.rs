// Consumer State Port
// Small key/value store the poll scheduler persists through, with a change feed

use crate::domain::StateKey;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

/// Capacity of the change feed; slow subscribers see `Lagged` and resync
pub const CHANGE_FEED_CAPACITY: usize = 32;

/// Persistent consumer-side state
///
/// Every write that actually changes a value publishes the key on the
/// change feed. Writing the same value again is silent.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: StateKey) -> Result<Option<Value>>;

    async fn set(&self, key: StateKey, value: Value) -> Result<()>;

    async fn remove(&self, key: StateKey) -> Result<()>;

    /// Subscribe to keys changed from now on
    fn subscribe(&self) -> broadcast::Receiver<StateKey>;
}

pub mod memory {
    //! Volatile state store for tests and ephemeral consumers

    use super::{StateStore, CHANGE_FEED_CAPACITY};
    use crate::domain::StateKey;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    pub struct InMemoryStateStore {
        values: Mutex<HashMap<StateKey, Value>>,
        changes: broadcast::Sender<StateKey>,
    }

    impl Default for InMemoryStateStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryStateStore {
        pub fn new() -> Self {
            let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
            Self {
                values: Mutex::new(HashMap::new()),
                changes,
            }
        }

        fn publish(&self, key: StateKey) {
            // No subscribers is fine
            let _ = self.changes.send(key);
        }
    }

    #[async_trait]
    impl StateStore for InMemoryStateStore {
        async fn get(&self, key: StateKey) -> Result<Option<Value>> {
            let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
            Ok(values.get(&key).cloned())
        }

        async fn set(&self, key: StateKey, value: Value) -> Result<()> {
            let changed = {
                let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
                values.insert(key, value.clone()).as_ref() != Some(&value)
            };
            if changed {
                self.publish(key);
            }
            Ok(())
        }

        async fn remove(&self, key: StateKey) -> Result<()> {
            let changed = {
                let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
                values.remove(&key).is_some()
            };
            if changed {
                self.publish(key);
            }
            Ok(())
        }

        fn subscribe(&self) -> broadcast::Receiver<StateKey> {
            self.changes.subscribe()
        }
    }

}
