//! # Queue Manager
//!
//! The only component that constructs or transitions a [`QueueItem`].
//!
//! ## Responsibilities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          QueueManager                                   │
//! │                                                                         │
//! │  Domain action                                                         │
//! │    enqueue(op, payload) ──► pending item persisted, returned           │
//! │                                                                         │
//! │  SyncEngine (during a drain)                                           │
//! │    recover_in_flight()  syncing ──► pending   (crash leftovers)        │
//! │    get_pending()        FIFO snapshot                                  │
//! │    begin_attempt(id)    pending ──► syncing                            │
//! │    mark_synced(id)      syncing ──► synced                             │
//! │    record_failure(..)   syncing ──► pending | failed  (one statement)  │
//! │                                                                         │
//! │  Operator / UI                                                         │
//! │    get_stats(), get_failed(), clear_synced()                           │
//! │    requeue_failed(id)   failed  ──► fresh pending item (new id)        │
//! │    remove_failed(id)    failed  ──► deleted                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Enqueue never touches the network; it only fails when the store does.

use tracing::{debug, info, warn};

use outpost_core::{timestamp_now, OperationType, QueueItem, QueueStats, QueueStatus};
use outpost_store::{Database, DrainClaim, QueueRepository};

use crate::error::{SyncError, SyncResult};

/// Queue manager over an injected store handle.
#[derive(Debug, Clone)]
pub struct QueueManager {
    repo: QueueRepository,
    store: Database,
}

impl QueueManager {
    /// Creates a queue manager backed by `db`.
    pub fn new(db: &Database) -> Self {
        QueueManager {
            repo: db.queue(),
            store: db.clone(),
        }
    }

    // =========================================================================
    // Domain API
    // =========================================================================

    /// Persists a new `pending` item and returns it.
    pub async fn enqueue(
        &self,
        operation_type: OperationType,
        payload: serde_json::Value,
    ) -> SyncResult<QueueItem> {
        let item = QueueItem::new(operation_type, payload);
        self.repo.put(&item).await?;

        info!(
            id = %item.id,
            operation_type = %item.operation_type,
            "Enqueued operation"
        );
        Ok(item)
    }

    /// Returns pending items, oldest first.
    pub async fn get_pending(&self) -> SyncResult<Vec<QueueItem>> {
        Ok(self.repo.get_by_status(QueueStatus::Pending).await?)
    }

    /// Returns permanently failed items, oldest first.
    pub async fn get_failed(&self) -> SyncResult<Vec<QueueItem>> {
        Ok(self.repo.get_by_status(QueueStatus::Failed).await?)
    }

    /// Returns every item in enqueue order.
    pub async fn get_all(&self) -> SyncResult<Vec<QueueItem>> {
        Ok(self.repo.get_all().await?)
    }

    /// Returns one item.
    pub async fn get(&self, id: &str) -> SyncResult<Option<QueueItem>> {
        Ok(self.repo.get(id).await?)
    }

    /// Counts items per status, straight from the store.
    pub async fn get_stats(&self) -> SyncResult<QueueStats> {
        Ok(self.repo.count_by_status().await?)
    }

    /// Deletes every synced item. Returns the number removed.
    pub async fn clear_synced(&self) -> SyncResult<u64> {
        let removed = self.repo.delete_by_status(QueueStatus::Synced).await?;
        info!(removed, "Cleared synced items");
        Ok(removed)
    }

    // =========================================================================
    // Engine Transitions
    // =========================================================================

    /// `pending → syncing`. Returns false if the item is no longer pending.
    pub async fn begin_attempt(&self, id: &str) -> SyncResult<bool> {
        Ok(self.repo.mark_syncing(id, timestamp_now()).await?)
    }

    /// Marks an item synced.
    pub async fn mark_synced(&self, id: &str) -> SyncResult<()> {
        if self.repo.mark_synced(id, timestamp_now()).await? {
            debug!(id = %id, "Marked synced");
            return Ok(());
        }
        Err(self.transition_refused(id, QueueStatus::Syncing).await)
    }

    /// Marks an item terminally failed and counts the attempt.
    pub async fn mark_failed(&self, id: &str, message: &str) -> SyncResult<()> {
        if self.repo.mark_failed(id, message, timestamp_now()).await? {
            warn!(id = %id, error = %message, "Marked failed");
            return Ok(());
        }
        Err(self.transition_refused(id, QueueStatus::Syncing).await)
    }

    /// Records a failed attempt on a `syncing` item and returns where it landed:
    /// `pending` while budget remains, `failed` once `max_retries` attempts
    /// are used or the error is not retryable.
    pub async fn record_failure(
        &self,
        id: &str,
        message: &str,
        max_retries: u32,
        retryable: bool,
    ) -> SyncResult<(QueueStatus, u32)> {
        match self
            .repo
            .record_failure(id, message, timestamp_now(), max_retries, retryable)
            .await?
        {
            Some(outcome) => Ok(outcome),
            None => Err(self.transition_refused(id, QueueStatus::Syncing).await),
        }
    }

    /// Takes the store-wide drain claim. `None` while any drain on this
    /// store is running, whichever engine or manager started it.
    pub fn try_claim_drain(&self) -> Option<DrainClaim> {
        self.store.try_claim_drain()
    }

    /// Returns true while a drain holds the store's claim.
    pub fn is_draining(&self) -> bool {
        self.store.is_draining()
    }

    /// Returns items orphaned in `syncing` by a crash to `pending`.
    ///
    /// Only sound while holding the drain claim: any `syncing` item is then
    /// a leftover, not an attempt in flight.
    pub async fn recover_in_flight(&self) -> SyncResult<u64> {
        let recovered = self.repo.reset_syncing().await?;
        if recovered > 0 {
            warn!(recovered, "Recovered items left in flight by an earlier run");
        }
        Ok(recovered)
    }

    // =========================================================================
    // Operator Actions
    // =========================================================================

    /// Re-submits a failed item as a fresh `pending` item with a new id.
    ///
    /// The failed record is replaced in the same transaction, so the queue
    /// never holds both, and neither ids nor attempt counts are reused.
    pub async fn requeue_failed(&self, id: &str) -> SyncResult<QueueItem> {
        let failed = self.require_failed(id).await?;
        let fresh = QueueItem::new(failed.operation_type, failed.payload);

        if !self.repo.replace_failed(id, &fresh).await? {
            return Err(self.transition_refused(id, QueueStatus::Failed).await);
        }

        info!(failed_id = %id, id = %fresh.id, "Requeued failed item");
        Ok(fresh)
    }

    /// Deletes a failed item. Items in any other state are refused.
    pub async fn remove_failed(&self, id: &str) -> SyncResult<()> {
        self.require_failed(id).await?;
        self.repo.delete(id).await?;

        info!(id = %id, "Removed failed item");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_failed(&self, id: &str) -> SyncResult<QueueItem> {
        let item = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;

        if item.status != QueueStatus::Failed {
            return Err(SyncError::InvalidState {
                id: id.to_string(),
                status: item.status,
                expected: QueueStatus::Failed,
            });
        }
        Ok(item)
    }

    /// Explains why a conditional transition matched no row.
    async fn transition_refused(&self, id: &str, expected: QueueStatus) -> SyncError {
        match self.repo.get(id).await {
            Ok(Some(item)) => SyncError::InvalidState {
                id: id.to_string(),
                status: item.status,
                expected,
            },
            Ok(None) => SyncError::NotFound(id.to_string()),
            Err(e) => e.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use outpost_store::StoreConfig;
    use serde_json::json;

    async fn manager() -> QueueManager {
        let db = Database::new(StoreConfig::in_memory()).await.unwrap();
        QueueManager::new(&db)
    }

    #[tokio::test]
    async fn test_enqueue_then_stats() {
        let queue = manager().await;

        let item = queue
            .enqueue(OperationType::InvoiceCreate, json!({ "total": 100 }))
            .await
            .unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.attempts, 0);

        let stats = queue.get_stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.synced, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.total, 1);
    }

    #[tokio::test]
    async fn test_get_pending_in_enqueue_order() {
        let queue = manager().await;

        let sale = queue
            .enqueue(OperationType::SaleComplete, json!({ "sale_id": "s-1" }))
            .await
            .unwrap();
        let payment = queue
            .enqueue(OperationType::PaymentProcess, json!({ "sale_id": "s-1" }))
            .await
            .unwrap();
        let invoice = queue
            .enqueue(OperationType::InvoiceCreate, json!({ "sale_id": "s-1" }))
            .await
            .unwrap();

        let ids: Vec<_> = queue
            .get_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![sale.id, payment.id, invoice.id]);
    }

    #[tokio::test]
    async fn test_mark_synced_and_failed() {
        let queue = manager().await;
        let a = queue.enqueue(OperationType::SaleHold, json!({})).await.unwrap();
        let b = queue.enqueue(OperationType::SaleVoid, json!({})).await.unwrap();

        queue.mark_synced(&a.id).await.unwrap();
        queue.mark_failed(&b.id, "HTTP 422").await.unwrap();

        let a = queue.get(&a.id).await.unwrap().unwrap();
        assert_eq!(a.status, QueueStatus::Synced);
        assert!(a.synced_at.is_some());

        let b = queue.get(&b.id).await.unwrap().unwrap();
        assert_eq!(b.status, QueueStatus::Failed);
        assert_eq!(b.attempts, 1);
        assert_eq!(b.error.as_deref(), Some("HTTP 422"));
        assert!(b.last_attempt.is_some());

        // Synced is terminal
        let err = queue.mark_failed(&a.id, "late").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidState { .. }));

        let err = queue.mark_synced("missing").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_failure_requires_syncing() {
        let queue = manager().await;
        let item = queue.enqueue(OperationType::InvoiceUpdate, json!({})).await.unwrap();

        let err = queue.record_failure(&item.id, "boom", 3, true).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidState {
                status: QueueStatus::Pending,
                ..
            }
        ));

        assert!(queue.begin_attempt(&item.id).await.unwrap());
        let outcome = queue.record_failure(&item.id, "boom", 3, true).await.unwrap();
        assert_eq!(outcome, (QueueStatus::Pending, 1));
    }

    #[tokio::test]
    async fn test_recover_in_flight() {
        let queue = manager().await;
        let item = queue.enqueue(OperationType::SaleComplete, json!({})).await.unwrap();
        queue.begin_attempt(&item.id).await.unwrap();

        assert_eq!(queue.recover_in_flight().await.unwrap(), 1);
        assert_eq!(queue.get_pending().await.unwrap().len(), 1);
        assert_eq!(queue.recover_in_flight().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_synced_keeps_failed() {
        let queue = manager().await;
        let a = queue.enqueue(OperationType::SaleHold, json!({})).await.unwrap();
        let b = queue.enqueue(OperationType::SaleHold, json!({})).await.unwrap();
        queue.mark_synced(&a.id).await.unwrap();
        queue.mark_failed(&b.id, "boom").await.unwrap();

        assert_eq!(queue.clear_synced().await.unwrap(), 1);

        let remaining = queue.get_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
    }

    #[tokio::test]
    async fn test_requeue_failed() {
        let queue = manager().await;
        let item = queue
            .enqueue(OperationType::PaymentProcess, json!({ "amount": 40 }))
            .await
            .unwrap();

        let err = queue.requeue_failed(&item.id).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidState { .. }));

        queue.mark_failed(&item.id, "boom").await.unwrap();
        let fresh = queue.requeue_failed(&item.id).await.unwrap();

        assert_ne!(fresh.id, item.id);
        assert_eq!(fresh.attempts, 0);
        assert_eq!(fresh.payload, json!({ "amount": 40 }));
        assert!(queue.get(&item.id).await.unwrap().is_none());
        assert_eq!(queue.get_pending().await.unwrap()[0].id, fresh.id);
    }

    #[tokio::test]
    async fn test_remove_failed() {
        let queue = manager().await;
        let item = queue.enqueue(OperationType::SaleVoid, json!({})).await.unwrap();

        let err = queue.remove_failed(&item.id).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidState { .. }));
        assert!(matches!(
            queue.remove_failed("missing").await.unwrap_err(),
            SyncError::NotFound(_)
        ));

        queue.mark_failed(&item.id, "boom").await.unwrap();
        queue.remove_failed(&item.id).await.unwrap();
        assert_eq!(queue.get_stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_enqueue_on_closed_store_fails() {
        let db = Database::new(StoreConfig::in_memory()).await.unwrap();
        let queue = QueueManager::new(&db);
        db.close().await;

        let err = queue
            .enqueue(OperationType::InvoiceCreate, json!({}))
            .await
            .unwrap_err();
        assert!(err.is_storage_error());
    }
}
