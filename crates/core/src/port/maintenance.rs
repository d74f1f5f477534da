// Storage maintenance port
use crate::error::Result;
use async_trait::async_trait;

/// Snapshot of what a backend is holding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceStats {
    /// Live sorted-set keys (one per token with pending links)
    pub key_count: i64,
    /// Queued members across all keys
    pub member_count: i64,
    /// On-disk footprint, when the backend can tell
    pub storage_bytes: Option<i64>,
}

/// Housekeeping for backends that cannot expire keys on their own
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Delete keys whose expiry has passed, returning how many went away
    async fn purge_expired(&self) -> Result<u64>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// Purge, then report what is left
    async fn run_full_maintenance(&self) -> Result<MaintenanceStats> {
        let purged_keys = self.purge_expired().await?;
        let stats = self.get_stats().await?;

        tracing::info!(
            purged_keys,
            key_count = stats.key_count,
            member_count = stats.member_count,
            "Maintenance completed"
        );

        Ok(stats)
    }
}
