//! # Sync Engine
//!
//! Replays pending queue items against the remote service, one at a time.
//!
//! ## Drain Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SyncEngine::drain                              │
//! │                                                                         │
//! │  try_claim_drain() ─── held ────► Err(DrainInProgress)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  recover_in_flight()      syncing → pending (crash leftovers)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  snapshot = get_pending() (FIFO; later enqueues wait for next drain)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for item in snapshot:                                                 │
//! │    begin_attempt(id)                pending → syncing                  │
//! │    timeout(handler.sync(item))                                         │
//! │      ├── Ok      ──► mark_synced    syncing → synced                   │
//! │      └── Err(e)  ──► record_failure syncing → pending | failed         │
//! │                        pending: sleep(retry_delay)                     │
//! │    on_progress(n, total)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DrainReport { succeeded, failed, retried, exhausted }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Guarantee
//! At-least-once. A handler may see the same item again after a retryable
//! failure, or after a crash between `begin_attempt` and the outcome write.
//! Handlers and the endpoints they call must be idempotent; the usual way is
//! an idempotency key carried in the payload and checked server-side.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use outpost_core::{
    DrainReport, QueueItem, QueueStatus, DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_MS,
    MAX_RETRIES,
};

use crate::error::{SyncError, SyncResult};
use crate::queue::QueueManager;

// =============================================================================
// Sync Handler
// =============================================================================

/// Performs the remote call for one queue item.
///
/// The engine never looks at the payload or the operation type; the handler
/// maps `item.operation_type` to an endpoint. Returning a retryable error
/// ([`SyncError::is_retryable`]) spends one retry; [`SyncError::Rejected`]
/// fails the item immediately.
///
/// Plain async closures taking a `QueueItem` implement this trait:
/// ```rust,ignore
/// let report = engine
///     .drain(&|item: QueueItem| async move { api.post(&item).await })
///     .await?;
/// ```
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn sync(&self, item: &QueueItem) -> SyncResult<()>;
}

#[async_trait]
impl<F, Fut> SyncHandler for F
where
    F: Fn(QueueItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SyncResult<()>> + Send + 'static,
{
    async fn sync(&self, item: &QueueItem) -> SyncResult<()> {
        (self)(item.clone()).await
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Trait for emitting drain events (implemented by the UI integration).
pub trait SyncEventEmitter: Send + Sync {
    /// Emits drain progress after each item.
    fn emit_progress(&self, current: usize, total: usize);

    /// Emits an item-level failure.
    fn emit_error(&self, error: &SyncError, retryable: bool);

    /// Emits the outcome of a finished drain.
    fn emit_complete(&self, report: &DrainReport);
}

/// No-op event emitter, the default.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_progress(&self, _current: usize, _total: usize) {}
    fn emit_error(&self, _error: &SyncError, _retryable: bool) {}
    fn emit_complete(&self, _report: &DrainReport) {}
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Retry and timeout policy of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts after which an item becomes `failed`.
    pub max_retries: u32,

    /// Pause after a retryable failure, before the next item starts.
    pub retry_delay: Duration,

    /// Upper bound on one handler call; expiry counts as a failure.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            attempt_timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    /// Sets the retry budget.
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Sets the pause after a retryable failure.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Drains the queue through a [`SyncHandler`].
///
/// Drains run under the store's drain claim, so engines on the same store
/// never run concurrently: a clone handed to the connectivity monitor, one
/// used for manual "sync now", and an engine built separately on the same
/// `Database` all compete for one claim.
#[derive(Clone)]
pub struct SyncEngine {
    queue: QueueManager,
    policy: RetryPolicy,
    emitter: Arc<dyn SyncEventEmitter>,
}

impl SyncEngine {
    /// Creates an engine with the given policy.
    pub fn new(queue: QueueManager, policy: RetryPolicy) -> Self {
        Self::with_emitter(queue, policy, Arc::new(NoOpEmitter))
    }

    /// Creates an engine with a custom event emitter.
    pub fn with_emitter(
        queue: QueueManager,
        policy: RetryPolicy,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> Self {
        SyncEngine {
            queue,
            policy,
            emitter,
        }
    }

    /// Returns the queue manager this engine drains.
    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    /// Returns the retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns true while a drain is running on this engine's store.
    pub fn is_syncing(&self) -> bool {
        self.queue.is_draining()
    }

    /// Drains the pending snapshot. See [`SyncEngine::drain_with_progress`].
    pub async fn drain<H>(&self, handler: &H) -> SyncResult<DrainReport>
    where
        H: SyncHandler + ?Sized,
    {
        self.drain_with_progress(handler, |_, _| {}).await
    }

    /// Drains the pending snapshot, reporting `(current, total)` after each item.
    ///
    /// ## Errors
    /// - `DrainInProgress` if another drain holds the store (nothing is touched)
    /// - `Storage` if the store fails; the drain stops at that item
    ///
    /// Handler errors are never returned: they become status transitions.
    pub async fn drain_with_progress<H, P>(
        &self,
        handler: &H,
        mut on_progress: P,
    ) -> SyncResult<DrainReport>
    where
        H: SyncHandler + ?Sized,
        P: FnMut(usize, usize) + Send,
    {
        let _claim = self
            .queue
            .try_claim_drain()
            .ok_or(SyncError::DrainInProgress)?;

        self.queue.recover_in_flight().await?;

        let snapshot = self.queue.get_pending().await?;
        let total = snapshot.len();
        let mut report = DrainReport::default();

        if total == 0 {
            debug!("Nothing to drain");
            self.emitter.emit_complete(&report);
            return Ok(report);
        }

        info!(total, "Starting drain");

        for (index, item) in snapshot.into_iter().enumerate() {
            self.process_item(handler, item, &mut report).await?;

            on_progress(index + 1, total);
            self.emitter.emit_progress(index + 1, total);
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            retried = report.retried,
            exhausted = report.exhausted,
            "Drain complete"
        );
        self.emitter.emit_complete(&report);

        Ok(report)
    }

    /// Runs one attempt for one item and records its outcome.
    async fn process_item<H>(
        &self,
        handler: &H,
        item: QueueItem,
        report: &mut DrainReport,
    ) -> SyncResult<()>
    where
        H: SyncHandler + ?Sized,
    {
        // Removed or requeued by an operator since the snapshot
        if !self.queue.begin_attempt(&item.id).await? {
            debug!(id = %item.id, "Item no longer pending, skipping");
            return Ok(());
        }

        debug!(
            id = %item.id,
            operation_type = %item.operation_type,
            attempt = item.attempts + 1,
            "Syncing item"
        );

        let outcome = match tokio::time::timeout(self.policy.attempt_timeout, handler.sync(&item))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(
                u64::try_from(self.policy.attempt_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        };

        let err = match outcome {
            Ok(()) => {
                self.queue.mark_synced(&item.id).await?;
                report.succeeded += 1;
                debug!(id = %item.id, "Item synced");
                return Ok(());
            }
            Err(err) => err,
        };

        let retryable = err.is_retryable();
        let (status, attempts) = self
            .queue
            .record_failure(
                &item.id,
                &err.to_string(),
                self.policy.max_retries,
                retryable,
            )
            .await?;
        report.failed += 1;

        if status == QueueStatus::Failed {
            report.exhausted += 1;
            if retryable {
                let exhausted = SyncError::RetryExhausted {
                    id: item.id.clone(),
                    attempts,
                };
                error!(id = %item.id, attempts, error = %err, "Retries exhausted");
                self.emitter.emit_error(&exhausted, false);
            } else {
                error!(id = %item.id, attempts, error = %err, "Item rejected permanently");
                self.emitter.emit_error(&err, false);
            }
            return Ok(());
        }

        report.retried += 1;
        warn!(
            id = %item.id,
            attempts,
            max_retries = self.policy.max_retries,
            error = %err,
            "Sync attempt failed, will retry on next drain"
        );
        self.emitter.emit_error(&err, true);

        if !self.policy.retry_delay.is_zero() {
            tokio::time::sleep(self.policy.retry_delay).await;
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use outpost_core::{OperationType, QueueStats};
    use outpost_store::{Database, StoreConfig};
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    async fn engine_with(policy: RetryPolicy) -> SyncEngine {
        let db = Database::new(StoreConfig::in_memory()).await.unwrap();
        SyncEngine::new(QueueManager::new(&db), policy)
    }

    async fn engine() -> SyncEngine {
        engine_with(RetryPolicy::default().retry_delay(Duration::ZERO)).await
    }

    fn counting_ok(calls: Arc<AtomicUsize>) -> impl SyncHandler {
        move |_item: QueueItem| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), SyncError>(()) }
        }
    }

    fn counting_err(calls: Arc<AtomicUsize>) -> impl SyncHandler {
        move |item: QueueItem| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), SyncError>(SyncError::failure(item.id, "HTTP 503")) }
        }
    }

    #[tokio::test]
    async fn test_drain_all_succeed() {
        let engine = engine().await;
        for n in 0..3 {
            engine
                .queue()
                .enqueue(OperationType::SaleComplete, json!({ "n": n }))
                .await
                .unwrap();
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let report = engine.drain(&counting_ok(calls.clone())).await.unwrap();

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let stats = engine.queue().get_stats().await.unwrap();
        assert_eq!(
            stats,
            QueueStats {
                pending: 0,
                syncing: 0,
                synced: 3,
                failed: 0,
                total: 3
            }
        );

        // Then clear
        assert_eq!(engine.queue().clear_synced().await.unwrap(), 3);
        assert!(engine.queue().get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_always_failing_item_fails_after_max_retries() {
        let engine = engine().await;
        let item = engine
            .queue()
            .enqueue(OperationType::InvoiceCreate, json!({ "total": 100 }))
            .await
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = counting_err(calls.clone());

        for _ in 0..2 {
            let report = engine.drain(&handler).await.unwrap();
            assert_eq!(report.failed, 1);
            assert_eq!(report.retried, 1);
        }
        let report = engine.drain(&handler).await.unwrap();
        assert_eq!(report.exhausted, 1);

        let failed = engine.queue().get(&item.id).await.unwrap().unwrap();
        assert_eq!(failed.status, QueueStatus::Failed);
        assert_eq!(failed.attempts, 3);
        assert!(failed.error.as_deref().unwrap_or_default().contains("HTTP 503"));

        // A fourth drain changes nothing and never calls the handler
        let before = engine.queue().get_stats().await.unwrap();
        let report = engine.drain(&handler).await.unwrap();
        assert_eq!(report.attempted(), 0);
        assert_eq!(engine.queue().get_stats().await.unwrap(), before);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_snapshot() {
        let engine = engine().await;
        let bad = engine
            .queue()
            .enqueue(OperationType::SaleComplete, json!({ "bad": true }))
            .await
            .unwrap();
        engine
            .queue()
            .enqueue(OperationType::PaymentProcess, json!({ "bad": false }))
            .await
            .unwrap();

        let bad_id = bad.id.clone();
        let handler = move |item: QueueItem| {
            let fail = item.id == bad_id;
            async move {
                if fail {
                    Err::<(), SyncError>(SyncError::failure(item.id, "HTTP 500"))
                } else {
                    Ok(())
                }
            }
        };

        let report = engine.drain(&handler).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);

        let stats = engine.queue().get_stats().await.unwrap();
        assert_eq!(stats.synced, 1);
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test]
    async fn test_drain_processes_in_order() {
        let engine = engine().await;
        let mut expected = Vec::new();
        for op in [
            OperationType::SaleComplete,
            OperationType::PaymentProcess,
            OperationType::InvoiceCreate,
        ] {
            expected.push(engine.queue().enqueue(op, json!({})).await.unwrap().id);
        }

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let recorder = seen.clone();
        let handler = move |item: QueueItem| {
            recorder.lock().unwrap().push(item.id);
            async { Ok::<(), SyncError>(()) }
        };

        let mut progress = Vec::new();
        engine
            .drain_with_progress(&handler, |current, total| progress.push((current, total)))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), expected);
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_items_enqueued_during_drain_wait() {
        let engine = engine().await;
        engine
            .queue()
            .enqueue(OperationType::SaleHold, json!({}))
            .await
            .unwrap();

        let queue = engine.queue().clone();
        let handler = move |_item: QueueItem| {
            let queue = queue.clone();
            async move {
                queue.enqueue(OperationType::SaleVoid, json!({})).await?;
                Ok::<(), SyncError>(())
            }
        };

        let report = engine.drain(&handler).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(engine.queue().get_stats().await.unwrap().pending, 1);
    }

    #[tokio::test]
    async fn test_concurrent_drain_is_refused() {
        let engine = engine().await;
        engine
            .queue()
            .enqueue(OperationType::InvoiceCreate, json!({}))
            .await
            .unwrap();

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let handler = {
            let (in_flight, max_in_flight, calls) =
                (in_flight.clone(), max_in_flight.clone(), calls.clone());
            move |_item: QueueItem| {
                let (in_flight, max_in_flight) = (in_flight.clone(), max_in_flight.clone());
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), SyncError>(())
                }
            }
        };

        let (first, second) = tokio::join!(engine.drain(&handler), engine.drain(&handler));

        assert_eq!(first.unwrap().succeeded, 1);
        assert!(matches!(second, Err(SyncError::DrainInProgress)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert!(!engine.is_syncing());
    }

    #[tokio::test]
    async fn test_separate_engines_on_one_store_never_overlap() {
        let db = Database::new(StoreConfig::in_memory()).await.unwrap();
        let policy = RetryPolicy::default().retry_delay(Duration::ZERO);
        let first = SyncEngine::new(QueueManager::new(&db), policy.clone());
        let second = SyncEngine::new(QueueManager::new(&db), policy);

        let item = first
            .queue()
            .enqueue(OperationType::PaymentProcess, json!({ "amount": 25 }))
            .await
            .unwrap();

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let handler = {
            let (in_flight, max_in_flight, calls) =
                (in_flight.clone(), max_in_flight.clone(), calls.clone());
            move |_item: QueueItem| {
                let (in_flight, max_in_flight) = (in_flight.clone(), max_in_flight.clone());
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), SyncError>(())
                }
            }
        };

        let (a, b) = tokio::join!(first.drain(&handler), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(second.is_syncing());
            second.drain(&handler).await
        });

        assert_eq!(a.unwrap().succeeded, 1);
        assert!(matches!(b, Err(SyncError::DrainInProgress)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);

        let item = second.queue().get(&item.id).await.unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Synced);
        assert_eq!(item.attempts, 0);
        assert!(!second.is_syncing());
    }

    #[tokio::test]
    async fn test_handler_io_error_is_retried() {
        let engine = engine().await;
        let item = engine
            .queue()
            .enqueue(OperationType::InvoiceCreate, json!({ "total": 100 }))
            .await
            .unwrap();

        let handler = |_item: QueueItem| async {
            Err::<(), SyncError>(
                io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused").into(),
            )
        };

        let report = engine.drain(&handler).await.unwrap();
        assert_eq!(report.retried, 1);
        assert_eq!(report.exhausted, 0);

        let item = engine.queue().get(&item.id).await.unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.attempts, 1);
        assert!(item
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("Connection failed: connection refused"));
    }

    #[tokio::test]
    async fn test_crashed_attempt_is_retried() {
        let engine = engine().await;
        let item = engine
            .queue()
            .enqueue(OperationType::PaymentProcess, json!({ "amount": 10 }))
            .await
            .unwrap();

        // Simulate a crash after the item was picked up
        engine.queue().begin_attempt(&item.id).await.unwrap();
        assert!(engine.queue().get_pending().await.unwrap().is_empty());

        let calls = Arc::new(AtomicUsize::new(0));
        let report = engine.drain(&counting_ok(calls.clone())).await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bounded_delay_after_retryable_failure() {
        let delay = Duration::from_millis(40);
        let engine = engine_with(RetryPolicy::default().retry_delay(delay)).await;
        engine
            .queue()
            .enqueue(OperationType::SaleComplete, json!({}))
            .await
            .unwrap();

        let started = Instant::now();
        engine
            .drain(&counting_err(Arc::new(AtomicUsize::new(0))))
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= delay, "no delay after failure: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "delay unbounded: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let engine = engine_with(
            RetryPolicy::default()
                .retry_delay(Duration::ZERO)
                .attempt_timeout(Duration::from_millis(20)),
        )
        .await;
        let item = engine
            .queue()
            .enqueue(OperationType::InvoiceUpdate, json!({}))
            .await
            .unwrap();

        let handler = |_item: QueueItem| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<(), SyncError>(())
        };

        let report = engine.drain(&handler).await.unwrap();
        assert_eq!(report.failed, 1);

        let item = engine.queue().get(&item.id).await.unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.attempts, 1);
        assert!(item.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_rejection_fails_immediately() {
        let engine = engine().await;
        let item = engine
            .queue()
            .enqueue(OperationType::PaymentProcess, json!({ "card": "declined" }))
            .await
            .unwrap();

        let handler = |_item: QueueItem| async {
            Err::<(), SyncError>(SyncError::Rejected("card declined".into()))
        };

        let report = engine.drain(&handler).await.unwrap();
        assert_eq!(report.exhausted, 1);
        assert_eq!(report.retried, 0);

        let item = engine.queue().get(&item.id).await.unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Failed);
        assert_eq!(item.attempts, 1);
    }

    #[tokio::test]
    async fn test_emitter_sees_progress_and_exhaustion() {
        #[derive(Default)]
        struct Recorder {
            progress: StdMutex<Vec<(usize, usize)>>,
            errors: StdMutex<Vec<(String, bool)>>,
            completed: AtomicUsize,
        }

        impl SyncEventEmitter for Recorder {
            fn emit_progress(&self, current: usize, total: usize) {
                self.progress.lock().unwrap().push((current, total));
            }
            fn emit_error(&self, error: &SyncError, retryable: bool) {
                self.errors.lock().unwrap().push((error.to_string(), retryable));
            }
            fn emit_complete(&self, _report: &DrainReport) {
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
        }

        let db = Database::new(StoreConfig::in_memory()).await.unwrap();
        let recorder = Arc::new(Recorder::default());
        let engine = SyncEngine::with_emitter(
            QueueManager::new(&db),
            RetryPolicy::default()
                .max_retries(1)
                .retry_delay(Duration::ZERO),
            recorder.clone(),
        );
        engine
            .queue()
            .enqueue(OperationType::SaleVoid, json!({}))
            .await
            .unwrap();

        engine
            .drain(&counting_err(Arc::new(AtomicUsize::new(0))))
            .await
            .unwrap();

        assert_eq!(*recorder.progress.lock().unwrap(), vec![(1, 1)]);
        let errors = recorder.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].0.contains("Retries exhausted"));
        assert!(!errors[0].1);
        assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_drain() {
        let db = Database::new(StoreConfig::in_memory()).await.unwrap();
        let engine = SyncEngine::new(QueueManager::new(&db), RetryPolicy::default());
        engine
            .queue()
            .enqueue(OperationType::SaleHold, json!({}))
            .await
            .unwrap();
        db.close().await;

        let err = engine
            .drain(&counting_ok(Arc::new(AtomicUsize::new(0))))
            .await
            .unwrap_err();
        assert!(err.is_storage_error());
    }
}
