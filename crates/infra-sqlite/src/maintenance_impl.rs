// SQLite Maintenance Implementation
use crate::sorted_set::map_sqlx_error;
use async_trait::async_trait;
use linkrelay_core::error::Result;
use linkrelay_core::port::{Maintenance, MaintenanceStats, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Sweeps expired sorted-set keys that no request touched
pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    async fn get_db_size_bytes(&self) -> Result<i64> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(page_count * page_size)
    }
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn purge_expired(&self) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let members = sqlx::query(
            r#"
            DELETE FROM zset_members
            WHERE key IN (
                SELECT key FROM zset_keys
                WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?
            )
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let keys = sqlx::query(
            "DELETE FROM zset_keys WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?",
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        info!(
            purged_keys = keys.rows_affected(),
            purged_members = members.rows_affected(),
            "Expired keys purged"
        );
        Ok(keys.rows_affected())
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let key_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zset_keys")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let member_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zset_members")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(MaintenanceStats {
            key_count,
            member_count,
            storage_bytes: Some(self.get_db_size_bytes().await?),
        })
    }
}
