//! # Cache Repository
//!
//! Key/value storage for server responses shown while offline.
//!
//! Expiry is never enforced here on read: the repository returns whatever
//! is stored and the caller decides with [`CacheEntry::is_expired_at`].
//! [`CacheRepository::delete_expired`] is the only place rows age out.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use outpost_core::{from_millis, to_millis, CacheEntry};

use crate::error::{StoreError, StoreResult};

const ENTITY: &str = "CacheEntry";

/// Must match the expression of `idx_cache_entries_expiry` to use it.
const DELETE_EXPIRED: &str = "DELETE FROM cache_entries WHERE timestamp + ttl_ms < ?1";

#[derive(Debug, sqlx::FromRow)]
struct CacheEntryRow {
    key: String,
    data: String,
    timestamp: i64,
    ttl_ms: i64,
}

impl TryFrom<CacheEntryRow> for CacheEntry {
    type Error = StoreError;

    fn try_from(row: CacheEntryRow) -> Result<Self, Self::Error> {
        let data = serde_json::from_str(&row.data)
            .map_err(|e| StoreError::corrupt(ENTITY, &row.key, e))?;
        let timestamp =
            from_millis(row.timestamp).map_err(|e| StoreError::corrupt(ENTITY, &row.key, e))?;
        let ttl_ms =
            u64::try_from(row.ttl_ms).map_err(|e| StoreError::corrupt(ENTITY, &row.key, e))?;

        Ok(CacheEntry {
            key: row.key,
            data,
            timestamp,
            ttl_ms,
        })
    }
}

/// Repository for cache entries.
#[derive(Debug, Clone)]
pub struct CacheRepository {
    pool: SqlitePool,
}

impl CacheRepository {
    /// Creates a new CacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CacheRepository { pool }
    }

    /// Inserts or replaces the entry for `entry.key`.
    pub async fn put(&self, entry: &CacheEntry) -> StoreResult<()> {
        let data = serde_json::to_string(&entry.data)
            .map_err(|e| StoreError::StorageWriteFailure(e.to_string()))?;
        let ttl_ms = i64::try_from(entry.ttl_ms)
            .map_err(|e| StoreError::StorageWriteFailure(format!("ttl_ms out of range: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, data, timestamp, ttl_ms)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                data      = excluded.data,
                timestamp = excluded.timestamp,
                ttl_ms    = excluded.ttl_ms
            "#,
        )
        .bind(&entry.key)
        .bind(data)
        .bind(to_millis(entry.timestamp))
        .bind(ttl_ms)
        .execute(&self.pool)
        .await
        .map_err(StoreError::write)?;

        debug!(key = %entry.key, ttl_ms = entry.ttl_ms, "Cache entry written");
        Ok(())
    }

    /// Gets the stored entry, stale or not.
    pub async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, CacheEntryRow>(
            "SELECT key, data, timestamp, ttl_ms FROM cache_entries WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CacheEntry::try_from).transpose()
    }

    /// Deletes an entry. Returns false if it didn't exist.
    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(StoreError::write)?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every entry with `now - timestamp > ttl`. Returns the count removed.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(DELETE_EXPIRED)
            .bind(to_millis(now))
            .execute(&self.pool)
            .await
            .map_err(StoreError::write)?;

        Ok(result.rows_affected())
    }

    /// Deletes every entry.
    pub async fn clear(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await
            .map_err(StoreError::write)?;

        Ok(result.rows_affected())
    }

    /// Counts stored entries, stale ones included.
    pub async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}
