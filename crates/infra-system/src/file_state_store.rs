// JSON file StateStore
//
// One small JSON object on disk, cached in memory. Other processes (the CLI
// toggling turbo while `run` is polling) write the same file, so a watcher
// task re-reads it periodically and publishes the keys that changed.

use async_trait::async_trait;
use linkrelay_core::domain::StateKey;
use linkrelay_core::error::{AppError, Result};
use linkrelay_core::port::state_store::CHANGE_FEED_CAPACITY;
use linkrelay_core::port::StateStore;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How often the watcher looks for writes from other processes
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(1);

pub struct FileStateStore {
    path: PathBuf,
    cache: Mutex<Map<String, Value>>,
    changes: broadcast::Sender<StateKey>,
}

impl FileStateStore {
    /// Load `path`; a missing file is an empty state
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = read_state(&path).await?;
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        debug!(path = %path.display(), keys = cache.len(), "State file loaded");
        Ok(Self {
            path,
            cache: Mutex::new(cache),
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and publish every key whose value differs from the cache
    pub async fn reload(&self) -> Result<Vec<StateKey>> {
        let mut cache = self.cache.lock().await;
        let fresh = read_state(&self.path).await?;

        let changed: Vec<StateKey> = StateKey::ALL
            .into_iter()
            .filter(|key| cache.get(key.as_str()) != fresh.get(key.as_str()))
            .collect();
        *cache = fresh;
        drop(cache);

        for key in &changed {
            debug!(key = %key, "State changed on disk");
            let _ = self.changes.send(*key);
        }
        Ok(changed)
    }

    /// Poll the file for outside writes until the store is dropped elsewhere
    pub fn spawn_watcher(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                if let Err(e) = store.reload().await {
                    warn!(error = %e, "State file reload failed");
                }
            }
        })
    }

    /// Apply one mutation on top of the file as it is now, persist, publish
    ///
    /// Keys written by other processes since the last reload are kept and
    /// published too. The cache only moves once the write succeeded.
    async fn update(&self, key: StateKey, value: Option<Value>) -> Result<()> {
        let mut cache = self.cache.lock().await;
        let mut fresh = read_state(&self.path).await?;

        let on_disk = match &value {
            Some(v) => fresh.insert(key.as_str().to_string(), v.clone()),
            None => fresh.remove(key.as_str()),
        };
        if on_disk != value {
            write_state(&self.path, &fresh).await?;
        }

        let changed: Vec<StateKey> = StateKey::ALL
            .into_iter()
            .filter(|k| cache.get(k.as_str()) != fresh.get(k.as_str()))
            .collect();
        *cache = fresh;
        drop(cache);

        for key in changed {
            let _ = self.changes.send(key);
        }
        Ok(())
    }
}

async fn read_state(path: &Path) -> Result<Map<String, Value>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(AppError::Io(e)),
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Config(format!(
            "State file {} must hold a JSON object, found {}",
            path.display(),
            other
        ))),
    }
}

/// Write to a sibling temp file, then rename over the original
async fn write_state(path: &Path, state: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let body = serde_json::to_vec_pretty(state)?;
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: StateKey) -> Result<Option<Value>> {
        Ok(self.cache.lock().await.get(key.as_str()).cloned())
    }

    async fn set(&self, key: StateKey, value: Value) -> Result<()> {
        self.update(key, Some(value)).await
    }

    async fn remove(&self, key: StateKey) -> Result<()> {
        self.update(key, None).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StateKey> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("state.json")).await.unwrap();
        assert_eq!(store.get(StateKey::Token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = FileStateStore::open(&path).await.unwrap();
        store.set(StateKey::Token, json!("A2B3C4D5OTL6E7F8")).await.unwrap();
        store.set(StateKey::OpenCount, json!(3)).await.unwrap();
        store.remove(StateKey::OpenCount).await.unwrap();
        drop(store);

        let reopened = FileStateStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get(StateKey::Token).await.unwrap(),
            Some(json!("A2B3C4D5OTL6E7F8"))
        );
        assert_eq!(reopened.get(StateKey::OpenCount).await.unwrap(), None);

        let on_disk: Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"token": "A2B3C4D5OTL6E7F8"}));
    }

    #[tokio::test]
    async fn test_change_feed_skips_no_op_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("state.json")).await.unwrap();
        let mut rx = store.subscribe();

        store.set(StateKey::TurboEnd, json!(100)).await.unwrap();
        store.set(StateKey::TurboEnd, json!(100)).await.unwrap();
        store.remove(StateKey::BaseUrl).await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), StateKey::TurboEnd);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reload_publishes_outside_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let running = FileStateStore::open(&path).await.unwrap();
        let cli = FileStateStore::open(&path).await.unwrap();
        let mut rx = running.subscribe();

        cli.set(StateKey::TurboEnd, json!(12345)).await.unwrap();
        assert_eq!(running.get(StateKey::TurboEnd).await.unwrap(), None);

        let changed = running.reload().await.unwrap();
        assert_eq!(changed, vec![StateKey::TurboEnd]);
        assert_eq!(rx.try_recv().unwrap(), StateKey::TurboEnd);
        assert_eq!(
            running.get(StateKey::TurboEnd).await.unwrap(),
            Some(json!(12345))
        );

        assert!(running.reload().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watcher_picks_up_outside_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let running = Arc::new(FileStateStore::open(&path).await.unwrap());
        let mut rx = running.subscribe();
        let watcher = running.spawn_watcher(Duration::from_millis(20));

        let cli = FileStateStore::open(&path).await.unwrap();
        cli.set(StateKey::TurboEnd, json!(1)).await.unwrap();

        let key = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(key, StateKey::TurboEnd);
        watcher.abort();
    }

    #[tokio::test]
    async fn test_write_keeps_keys_set_by_another_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let running = FileStateStore::open(&path).await.unwrap();
        let cli = FileStateStore::open(&path).await.unwrap();
        let mut rx = running.subscribe();

        assert_ok!(cli.set(StateKey::TurboEnd, json!(99999)).await);
        // Before the watcher had a chance to reload
        assert_ok!(running.set(StateKey::OpenCount, json!(1)).await);

        let on_disk: Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"turbo_end_ms": 99999, "open_count": 1}));
        assert_eq!(
            running.get(StateKey::TurboEnd).await.unwrap(),
            Some(json!(99999))
        );

        let mut published = vec![rx.try_recv().unwrap(), rx.try_recv().unwrap()];
        published.sort_by_key(|k| k.as_str());
        assert_eq!(published, vec![StateKey::OpenCount, StateKey::TurboEnd]);
        assert!(running.reload().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("state.json");
        let store = FileStateStore::open(&path).await.unwrap();
        assert_ok!(store.set(StateKey::Token, json!("A2B3C4D5OTL6E7F8")).await);

        // Replace the directory with a plain file so the next read fails
        std::fs::remove_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub"), "").unwrap();

        assert_err!(store.set(StateKey::Token, json!("ZZZZZZZZOTLZZZZZ")).await);
        assert_eq!(
            store.get(StateKey::Token).await.unwrap(),
            Some(json!("A2B3C4D5OTL6E7F8"))
        );
    }

    #[tokio::test]
    async fn test_non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "[1,2,3]").unwrap();
        assert!(FileStateStore::open(&path).await.is_err());
    }
}
