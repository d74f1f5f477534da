// SQLite SortedSetStore Implementation

use async_trait::async_trait;
use linkrelay_core::error::{AppError, Result};
use linkrelay_core::port::{SortedSetStore, TimeProvider};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            Some("5") => AppError::Storage(format!(
                "Database locked (SQLITE_BUSY): {}",
                db_err.message()
            )),
            Some("13") => AppError::Storage(format!("Database full: {}", db_err.message())),
            Some(code) => AppError::Storage(format!(
                "Database error [{}]: {}",
                code,
                db_err.message()
            )),
            None => AppError::Storage(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::PoolTimedOut => {
            AppError::Storage("Connection pool timeout: all connections busy".to_string())
        }
        sqlx::Error::PoolClosed => AppError::Storage("Connection pool closed".to_string()),
        sqlx::Error::Io(io_err) => AppError::Storage(format!("Database I/O error: {}", io_err)),
        _ => AppError::Storage(format!("Database error: {}", err)),
    }
}

/// Sorted sets stored in two tables
///
/// Key expiry is lazy: every operation first drops its key when the expiry
/// has passed, and [`crate::SqliteMaintenance`] sweeps keys nobody touches.
pub struct SqliteSortedSetStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteSortedSetStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

/// Must be the first statement of every transaction: starting with a write
/// makes concurrent callers wait on the busy timeout
async fn purge_if_expired(conn: &mut SqliteConnection, key: &str, now: i64) -> Result<()> {
    let expired = sqlx::query(
        "DELETE FROM zset_keys WHERE key = ? AND expires_at_ms IS NOT NULL AND expires_at_ms <= ?",
    )
    .bind(key)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    if expired.rows_affected() > 0 {
        drop_key(conn, key).await?;
    }
    Ok(())
}

async fn drop_key(conn: &mut SqliteConnection, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM zset_members WHERE key = ?")
        .bind(key)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    sqlx::query("DELETE FROM zset_keys WHERE key = ?")
        .bind(key)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

/// A key with no members does not exist, expiry included
async fn drop_key_if_empty(conn: &mut SqliteConnection, key: &str) -> Result<()> {
    sqlx::query(
        "DELETE FROM zset_keys WHERE key = ? AND NOT EXISTS (SELECT 1 FROM zset_members WHERE key = ?)",
    )
    .bind(key)
    .bind(key)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl SortedSetStore for SqliteSortedSetStore {
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<()> {
        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        purge_if_expired(&mut tx, key, now).await?;

        sqlx::query("INSERT INTO zset_keys (key, expires_at_ms) VALUES (?, NULL) ON CONFLICT(key) DO NOTHING")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        // Existing member keeps its seq, only the score moves
        sqlx::query(
            r#"
            INSERT INTO zset_members (key, member, score) VALUES (?, ?, ?)
            ON CONFLICT(key, member) DO UPDATE SET score = excluded.score
            "#,
        )
        .bind(key)
        .bind(member)
        .bind(score)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn range_by_rank(&self, key: &str, start: usize, stop: usize) -> Result<Vec<String>> {
        if stop < start {
            return Ok(vec![]);
        }
        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        purge_if_expired(&mut tx, key, now).await?;

        let members: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT member FROM zset_members
            WHERE key = ?
            ORDER BY score ASC, seq ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(key)
        .bind((stop - start + 1) as i64)
        .bind(start as i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(members)
    }

    async fn remove(&self, key: &str, member: &str) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        purge_if_expired(&mut tx, key, now).await?;

        let result = sqlx::query("DELETE FROM zset_members WHERE key = ? AND member = ?")
            .bind(key)
            .bind(member)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        drop_key_if_empty(&mut tx, key).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_below_score(&self, key: &str, cutoff: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        purge_if_expired(&mut tx, key, now).await?;

        let result = sqlx::query("DELETE FROM zset_members WHERE key = ? AND score < ?")
            .bind(key)
            .bind(cutoff)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        drop_key_if_empty(&mut tx, key).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn cardinality(&self, key: &str) -> Result<usize> {
        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        purge_if_expired(&mut tx, key, now).await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zset_members WHERE key = ?")
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(count as usize)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<()> {
        let now = self.time_provider.now_millis();
        let expires_at = now.saturating_add((ttl_seconds as i64).saturating_mul(1000));
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        purge_if_expired(&mut tx, key, now).await?;

        sqlx::query("UPDATE zset_keys SET expires_at_ms = ? WHERE key = ?")
            .bind(expires_at)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }
}
