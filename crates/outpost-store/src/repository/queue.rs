//! # Queue Repository
//!
//! Durable storage for the offline write queue.
//!
//! ## The Outbox Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    queue_items                                          │
//! │                                                                         │
//! │  seq | id       | operation_type  | status  | attempts | created_at    │
//! │  ────┼──────────┼─────────────────┼─────────┼──────────┼────────────── │
//! │  1   │ 9f1c...  │ sale.complete   │ synced  │ 0        │ 1718000000000 │
//! │  2   │ 3ab0...  │ payment.process │ pending │ 1        │ 1718000000004 │
//! │  3   │ 77de...  │ invoice.create  │ failed  │ 3        │ 1718000000009 │
//! │                                                                         │
//! │  idx_queue_items_status (status, created_at, seq)                      │
//! │    → get_by_status(Pending) is an index range scan, already FIFO       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity
//! Every method touches one row in one statement, except
//! [`QueueRepository::replace_failed`] which runs in a transaction.
//! Status transitions are conditional on the current status, so a stale
//! caller can never move an item out of a terminal state.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use outpost_core::{from_millis, to_millis, OperationType, QueueItem, QueueStats, QueueStatus};

use crate::error::{StoreError, StoreResult};

const ENTITY: &str = "QueueItem";

const SELECT_COLUMNS: &str = r#"
    SELECT id, operation_type, payload, created_at, attempts,
           last_attempt, status, error, synced_at
    FROM queue_items
"#;

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw row as stored; converted into [`QueueItem`] with validation.
#[derive(Debug, sqlx::FromRow)]
struct QueueItemRow {
    id: String,
    operation_type: String,
    payload: String,
    created_at: i64,
    attempts: i64,
    last_attempt: Option<i64>,
    status: QueueStatus,
    error: Option<String>,
    synced_at: Option<i64>,
}

impl TryFrom<QueueItemRow> for QueueItem {
    type Error = StoreError;

    fn try_from(row: QueueItemRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: &dyn std::fmt::Display| StoreError::corrupt(ENTITY, &row.id, reason);

        let operation_type = row
            .operation_type
            .parse::<OperationType>()
            .map_err(|e| corrupt(&e))?;
        let payload = serde_json::from_str(&row.payload).map_err(|e| corrupt(&e))?;
        let attempts = u32::try_from(row.attempts).map_err(|e| corrupt(&e))?;
        let created_at = from_millis(row.created_at).map_err(|e| corrupt(&e))?;
        let last_attempt = row
            .last_attempt
            .map(from_millis)
            .transpose()
            .map_err(|e| corrupt(&e))?;
        let synced_at = row
            .synced_at
            .map(from_millis)
            .transpose()
            .map_err(|e| corrupt(&e))?;

        Ok(QueueItem {
            id: row.id,
            operation_type,
            payload,
            created_at,
            attempts,
            last_attempt,
            status: row.status,
            error: row.error,
            synced_at,
        })
    }
}

fn into_items(rows: Vec<QueueItemRow>) -> StoreResult<Vec<QueueItem>> {
    rows.into_iter().map(QueueItem::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for queue item operations.
#[derive(Debug, Clone)]
pub struct QueueRepository {
    pool: SqlitePool,
}

impl QueueRepository {
    /// Creates a new QueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QueueRepository { pool }
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Inserts or replaces an item, keyed by id.
    ///
    /// Replacing keeps the row's original insertion sequence, so an upsert
    /// never moves an item within the FIFO order.
    pub async fn put(&self, item: &QueueItem) -> StoreResult<()> {
        let payload = serde_json::to_string(&item.payload)
            .map_err(|e| StoreError::StorageWriteFailure(e.to_string()))?;

        debug!(
            id = %item.id,
            operation_type = %item.operation_type,
            status = %item.status,
            "Writing queue item"
        );

        sqlx::query(
            r#"
            INSERT INTO queue_items (
                id, operation_type, payload, created_at, attempts,
                last_attempt, status, error, synced_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                operation_type = excluded.operation_type,
                payload        = excluded.payload,
                created_at     = excluded.created_at,
                attempts       = excluded.attempts,
                last_attempt   = excluded.last_attempt,
                status         = excluded.status,
                error          = excluded.error,
                synced_at      = excluded.synced_at
            "#,
        )
        .bind(&item.id)
        .bind(item.operation_type.as_str())
        .bind(payload)
        .bind(to_millis(item.created_at))
        .bind(i64::from(item.attempts))
        .bind(item.last_attempt.map(to_millis))
        .bind(item.status)
        .bind(&item.error)
        .bind(item.synced_at.map(to_millis))
        .execute(&self.pool)
        .await
        .map_err(StoreError::write)?;

        Ok(())
    }

    /// Gets an item by id.
    pub async fn get(&self, id: &str) -> StoreResult<Option<QueueItem>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = sqlx::query_as::<_, QueueItemRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(QueueItem::try_from).transpose()
    }

    /// Gets every item in enqueue order.
    pub async fn get_all(&self) -> StoreResult<Vec<QueueItem>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at ASC, seq ASC");
        let rows = sqlx::query_as::<_, QueueItemRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        into_items(rows)
    }

    /// Gets every item with the given status, oldest first.
    pub async fn get_by_status(&self, status: QueueStatus) -> StoreResult<Vec<QueueItem>> {
        let sql = format!("{SELECT_COLUMNS} WHERE status = ?1 ORDER BY created_at ASC, seq ASC");
        let rows = sqlx::query_as::<_, QueueItemRow>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        into_items(rows)
    }

    /// Deletes an item. Returns false if it didn't exist.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM queue_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::write)?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all items.
    pub async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    /// Counts items per status in one query.
    pub async fn count_by_status(&self) -> StoreResult<QueueStats> {
        let rows: Vec<(QueueStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM queue_items GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            stats.record(status, count as u64);
        }

        Ok(stats)
    }

    // =========================================================================
    // Status Transitions
    // =========================================================================

    /// `pending → syncing`, stamping `last_attempt`.
    ///
    /// Returns false if the item is missing or not pending.
    pub async fn mark_syncing(&self, id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE queue_items SET
                status = 'syncing',
                last_attempt = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(to_millis(at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::write)?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a non-terminal item as synced.
    ///
    /// Returns false if the item is missing or already terminal.
    pub async fn mark_synced(&self, id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE queue_items SET
                status = 'synced',
                synced_at = ?2
            WHERE id = ?1 AND status IN ('pending', 'syncing')
            "#,
        )
        .bind(id)
        .bind(to_millis(at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::write)?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a non-terminal item as terminally failed, counting the attempt.
    ///
    /// Returns false if the item is missing or already terminal.
    pub async fn mark_failed(
        &self,
        id: &str,
        message: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE queue_items SET
                status = 'failed',
                error = ?2,
                last_attempt = ?3,
                attempts = attempts + 1
            WHERE id = ?1 AND status IN ('pending', 'syncing')
            "#,
        )
        .bind(id)
        .bind(message)
        .bind(to_millis(at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::write)?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a failed attempt on a `syncing` item in a single statement.
    ///
    /// ```text
    /// attempts += 1, error = message, last_attempt = at
    /// status    = failed   if !retryable or attempts + 1 >= max_retries
    ///           = pending  otherwise
    /// ```
    ///
    /// Readers see either the old `syncing` row or the final status; never
    /// an intermediate `failed` that is about to be reverted.
    ///
    /// Returns the new `(status, attempts)`, or None if the item was not
    /// `syncing`.
    pub async fn record_failure(
        &self,
        id: &str,
        message: &str,
        at: DateTime<Utc>,
        max_retries: u32,
        retryable: bool,
    ) -> StoreResult<Option<(QueueStatus, u32)>> {
        let row: Option<(QueueStatus, i64)> = sqlx::query_as(
            r#"
            UPDATE queue_items SET
                attempts = attempts + 1,
                error = ?2,
                last_attempt = ?3,
                status = CASE
                    WHEN ?5 = 0 OR attempts + 1 >= ?4 THEN 'failed'
                    ELSE 'pending'
                END
            WHERE id = ?1 AND status = 'syncing'
            RETURNING status, attempts
            "#,
        )
        .bind(id)
        .bind(message)
        .bind(to_millis(at))
        .bind(i64::from(max_retries))
        .bind(retryable)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::write)?;

        row.map(|(status, attempts)| {
            u32::try_from(attempts)
                .map(|attempts| (status, attempts))
                .map_err(|e| StoreError::corrupt(ENTITY, id, e))
        })
        .transpose()
    }

    /// Moves every `syncing` item back to `pending`.
    ///
    /// Used on startup: an item still `syncing` means the process died
    /// between starting an attempt and recording its outcome.
    pub async fn reset_syncing(&self) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE queue_items SET status = 'pending' WHERE status = 'syncing'")
                .execute(&self.pool)
                .await
                .map_err(StoreError::write)?;

        Ok(result.rows_affected())
    }

    /// Deletes every item with the given status. Returns the count removed.
    pub async fn delete_by_status(&self, status: QueueStatus) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM queue_items WHERE status = ?1")
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(StoreError::write)?;

        Ok(result.rows_affected())
    }

    /// Atomically removes a `failed` item and inserts its replacement.
    ///
    /// Returns false (and writes nothing) if `failed_id` is not `failed`.
    pub async fn replace_failed(
        &self,
        failed_id: &str,
        replacement: &QueueItem,
    ) -> StoreResult<bool> {
        let payload = serde_json::to_string(&replacement.payload)
            .map_err(|e| StoreError::StorageWriteFailure(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(StoreError::write)?;

        let removed = sqlx::query("DELETE FROM queue_items WHERE id = ?1 AND status = 'failed'")
            .bind(failed_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::write)?;

        if removed.rows_affected() == 0 {
            tx.rollback().await.map_err(StoreError::write)?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO queue_items (
                id, operation_type, payload, created_at, attempts,
                last_attempt, status, error, synced_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&replacement.id)
        .bind(replacement.operation_type.as_str())
        .bind(payload)
        .bind(to_millis(replacement.created_at))
        .bind(i64::from(replacement.attempts))
        .bind(replacement.last_attempt.map(to_millis))
        .bind(replacement.status)
        .bind(&replacement.error)
        .bind(replacement.synced_at.map(to_millis))
        .execute(&mut *tx)
        .await
        .map_err(StoreError::write)?;

        tx.commit().await.map_err(StoreError::write)?;

        debug!(failed_id = %failed_id, id = %replacement.id, "Replaced failed queue item");
        Ok(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, StoreConfig};
    use outpost_core::timestamp_now;
    use serde_json::json;

    async fn repo() -> QueueRepository {
        Database::new(StoreConfig::in_memory()).await.unwrap().queue()
    }

    fn item(op: OperationType, total: i64) -> QueueItem {
        QueueItem::new(op, json!({ "total": total }))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let repo = repo().await;
        let item = item(OperationType::InvoiceCreate, 100);

        repo.put(&item).await.unwrap();

        let loaded = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(loaded, item);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_upserts() {
        let repo = repo().await;
        let mut item = item(OperationType::SaleHold, 1);
        repo.put(&item).await.unwrap();

        item.error = Some("timeout".to_string());
        repo.put(&item).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let loaded = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(loaded.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_get_by_status_is_fifo() {
        let repo = repo().await;

        // Same created_at for all three: insertion sequence breaks the tie
        let created_at = timestamp_now();
        let mut ids = Vec::new();
        for n in 0..3 {
            let mut item = item(OperationType::PaymentProcess, n);
            item.created_at = created_at;
            repo.put(&item).await.unwrap();
            ids.push(item.id);
        }

        let pending = repo.get_by_status(QueueStatus::Pending).await.unwrap();
        let pending_ids: Vec<_> = pending.into_iter().map(|i| i.id).collect();
        assert_eq!(pending_ids, ids);
        assert!(repo.get_by_status(QueueStatus::Failed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let repo = repo().await;
        let a = item(OperationType::SaleVoid, 1);
        let b = item(OperationType::SaleVoid, 2);
        repo.put(&a).await.unwrap();
        repo.put(&b).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.delete(&a.id).await.unwrap());
        assert!(!repo.delete(&a.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transitions() {
        let repo = repo().await;
        let item = item(OperationType::InvoiceCreate, 100);
        repo.put(&item).await.unwrap();

        let now = timestamp_now();
        assert!(repo.mark_syncing(&item.id, now).await.unwrap());
        // Already syncing: not pending any more
        assert!(!repo.mark_syncing(&item.id, now).await.unwrap());

        assert!(repo.mark_synced(&item.id, now).await.unwrap());
        let synced = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(synced.status, QueueStatus::Synced);
        assert_eq!(synced.synced_at, Some(now));
        assert_eq!(synced.last_attempt, Some(now));

        // Terminal: further transitions are refused
        assert!(!repo.mark_failed(&item.id, "late", now).await.unwrap());
        assert!(!repo.mark_synced(&item.id, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_failed_counts_attempt() {
        let repo = repo().await;
        let item = item(OperationType::SaleComplete, 5);
        repo.put(&item).await.unwrap();

        assert!(repo.mark_failed(&item.id, "HTTP 500", timestamp_now()).await.unwrap());

        let failed = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(failed.status, QueueStatus::Failed);
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_record_failure_retries_then_fails() {
        let repo = repo().await;
        let item = item(OperationType::InvoiceCreate, 100);
        repo.put(&item).await.unwrap();

        for expected_attempts in 1..=2 {
            repo.mark_syncing(&item.id, timestamp_now()).await.unwrap();
            let outcome = repo
                .record_failure(&item.id, "offline", timestamp_now(), 3, true)
                .await
                .unwrap();
            assert_eq!(outcome, Some((QueueStatus::Pending, expected_attempts)));
        }

        repo.mark_syncing(&item.id, timestamp_now()).await.unwrap();
        let outcome = repo
            .record_failure(&item.id, "offline", timestamp_now(), 3, true)
            .await
            .unwrap();
        assert_eq!(outcome, Some((QueueStatus::Failed, 3)));

        // Not syncing any more: nothing recorded
        let outcome = repo
            .record_failure(&item.id, "offline", timestamp_now(), 3, true)
            .await
            .unwrap();
        assert_eq!(outcome, None);
        assert_eq!(repo.get(&item.id).await.unwrap().unwrap().attempts, 3);
    }

    #[tokio::test]
    async fn test_record_failure_non_retryable() {
        let repo = repo().await;
        let item = item(OperationType::PaymentProcess, 9);
        repo.put(&item).await.unwrap();
        repo.mark_syncing(&item.id, timestamp_now()).await.unwrap();

        let outcome = repo
            .record_failure(&item.id, "card declined", timestamp_now(), 3, false)
            .await
            .unwrap();
        assert_eq!(outcome, Some((QueueStatus::Failed, 1)));
    }

    #[tokio::test]
    async fn test_reset_syncing() {
        let repo = repo().await;
        let a = item(OperationType::SaleHold, 1);
        let b = item(OperationType::SaleHold, 2);
        repo.put(&a).await.unwrap();
        repo.put(&b).await.unwrap();
        repo.mark_syncing(&a.id, timestamp_now()).await.unwrap();

        assert_eq!(repo.reset_syncing().await.unwrap(), 1);
        let stats = repo.count_by_status().await.unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.syncing, 0);
    }

    #[tokio::test]
    async fn test_count_by_status_and_delete_by_status() {
        let repo = repo().await;
        let a = item(OperationType::InvoiceCreate, 1);
        let b = item(OperationType::InvoiceCreate, 2);
        let c = item(OperationType::InvoiceCreate, 3);
        for i in [&a, &b, &c] {
            repo.put(i).await.unwrap();
        }
        repo.mark_synced(&a.id, timestamp_now()).await.unwrap();
        repo.mark_failed(&b.id, "boom", timestamp_now()).await.unwrap();

        let stats = repo.count_by_status().await.unwrap();
        assert_eq!(
            stats,
            QueueStats {
                pending: 1,
                syncing: 0,
                synced: 1,
                failed: 1,
                total: 3
            }
        );

        assert_eq!(repo.delete_by_status(QueueStatus::Synced).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_replace_failed() {
        let repo = repo().await;
        let original = item(OperationType::SaleComplete, 42);
        repo.put(&original).await.unwrap();

        let replacement = QueueItem::new(original.operation_type, original.payload.clone());

        // Not failed yet: refused, nothing written
        assert!(!repo.replace_failed(&original.id, &replacement).await.unwrap());
        assert!(repo.get(&replacement.id).await.unwrap().is_none());

        repo.mark_failed(&original.id, "boom", timestamp_now()).await.unwrap();
        assert!(repo.replace_failed(&original.id, &replacement).await.unwrap());

        assert!(repo.get(&original.id).await.unwrap().is_none());
        let loaded = repo.get(&replacement.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, QueueStatus::Pending);
        assert_eq!(loaded.payload, json!({ "total": 42 }));
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_write_failure() {
        let repo = repo().await;
        let failed = item(OperationType::SaleVoid, 1);
        repo.put(&failed).await.unwrap();
        repo.mark_failed(&failed.id, "boom", timestamp_now()).await.unwrap();

        // Replacement reuses an existing id: the INSERT violates UNIQUE(id)
        let existing = item(OperationType::SaleVoid, 2);
        repo.put(&existing).await.unwrap();

        let err = repo.replace_failed(&failed.id, &existing).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageWriteFailure(_)));

        // Transaction rolled back: the failed item is still there
        let still_failed = repo.get(&failed.id).await.unwrap().unwrap();
        assert_eq!(still_failed.status, QueueStatus::Failed);
    }
}
