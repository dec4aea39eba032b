//! # Domain Types
//!
//! Records stored by the offline queue and the read cache.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   QueueItem     │   │  QueueStatus    │   │ OperationType   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  Pending        │   │  invoice.create │       │
//! │  │  operation_type │   │  Syncing        │   │  sale.complete  │       │
//! │  │  payload (JSON) │   │  Synced  (term) │   │  sale.hold      │       │
//! │  │  attempts       │   │  Failed  (term) │   │  sale.void      │       │
//! │  │  status, error  │   └─────────────────┘   │  payment.process│       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   CacheEntry    │   │   QueueStats    │   │  DrainReport    │       │
//! │  │  key, data      │   │  pending/synced │   │  succeeded      │       │
//! │  │  timestamp, ttl │   │  failed/total   │   │  failed         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timestamps
//! Every timestamp is kept at millisecond precision so that a record read
//! back from SQLite (where it is stored as integer milliseconds) compares
//! equal to the value that was written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Timestamp Helpers
// =============================================================================

/// Returns the current time truncated to millisecond precision.
pub fn timestamp_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Converts a timestamp into Unix milliseconds for storage.
#[inline]
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Converts stored Unix milliseconds back into a timestamp.
pub fn from_millis(ms: i64) -> CoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(CoreError::InvalidTimestamp(ms))
}

// =============================================================================
// Queue Status
// =============================================================================

/// Lifecycle state of a queue item.
///
/// ## State Machine
/// ```text
///              begin_attempt            success
///  ┌─────────┐ ───────────► ┌─────────┐ ───────► ┌────────┐
///  │ Pending │              │ Syncing │          │ Synced │ (terminal)
///  └─────────┘ ◄─────────── └─────────┘          └────────┘
///              failure,          │
///              attempts < max    │ failure, attempts >= max
///                                ▼                (or non-retryable)
///                           ┌────────┐
///                           │ Failed │ (terminal)
///                           └────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Waiting for the next drain.
    Pending,
    /// Picked up by a drain; the handler call is in flight.
    Syncing,
    /// Accepted by the remote service. Never mutated again.
    Synced,
    /// Retries exhausted or rejected permanently. Never retried automatically.
    Failed,
}

impl QueueStatus {
    /// All states, in lifecycle order.
    pub const ALL: [QueueStatus; 4] = [
        QueueStatus::Pending,
        QueueStatus::Syncing,
        QueueStatus::Synced,
        QueueStatus::Failed,
    ];

    /// Returns the lowercase storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Syncing => "syncing",
            QueueStatus::Synced => "synced",
            QueueStatus::Failed => "failed",
        }
    }

    /// Returns true for states no drain will ever move the item out of.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Synced | QueueStatus::Failed)
    }
}

impl Default for QueueStatus {
    fn default() -> Self {
        QueueStatus::Pending
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(QueueStatus::Pending),
            "syncing" => Ok(QueueStatus::Syncing),
            "synced" => Ok(QueueStatus::Synced),
            "failed" => Ok(QueueStatus::Failed),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

// =============================================================================
// Operation Type
// =============================================================================

/// The closed set of domain operations that can be queued.
///
/// The tag tells the sync handler which backend endpoint to call
/// (e.g. `invoice.create` → `POST /sales/invoices`). The engine itself
/// never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum OperationType {
    #[serde(rename = "invoice.create")]
    InvoiceCreate,
    #[serde(rename = "invoice.update")]
    InvoiceUpdate,
    #[serde(rename = "sale.complete")]
    SaleComplete,
    #[serde(rename = "sale.hold")]
    SaleHold,
    #[serde(rename = "sale.void")]
    SaleVoid,
    #[serde(rename = "payment.process")]
    PaymentProcess,
}

impl OperationType {
    /// All operation kinds.
    pub const ALL: [OperationType; 6] = [
        OperationType::InvoiceCreate,
        OperationType::InvoiceUpdate,
        OperationType::SaleComplete,
        OperationType::SaleHold,
        OperationType::SaleVoid,
        OperationType::PaymentProcess,
    ];

    /// Returns the dotted tag used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::InvoiceCreate => "invoice.create",
            OperationType::InvoiceUpdate => "invoice.update",
            OperationType::SaleComplete => "sale.complete",
            OperationType::SaleHold => "sale.hold",
            OperationType::SaleVoid => "sale.void",
            OperationType::PaymentProcess => "payment.process",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        OperationType::ALL
            .into_iter()
            .find(|op| op.as_str() == tag)
            .ok_or_else(|| CoreError::UnknownOperation(tag.to_string()))
    }
}

// =============================================================================
// Queue Item
// =============================================================================

/// One durable record of a domain write waiting to be synchronized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Unique identifier (UUID v4), assigned at enqueue, never reused.
    pub id: String,

    /// Which domain operation this item replays.
    pub operation_type: OperationType,

    /// Caller-defined data. The engine never looks inside.
    #[ts(type = "unknown")]
    pub payload: serde_json::Value,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Completed sync attempts. Never decreases.
    pub attempts: u32,

    /// When the most recent attempt started.
    #[ts(as = "Option<String>")]
    pub last_attempt: Option<DateTime<Utc>>,

    pub status: QueueStatus,

    /// Message from the most recent failed attempt.
    pub error: Option<String>,

    /// When the remote service accepted the item.
    #[ts(as = "Option<String>")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    /// Builds a fresh `pending` item with a new id and zero attempts.
    pub fn new(operation_type: OperationType, payload: serde_json::Value) -> Self {
        QueueItem {
            id: uuid::Uuid::new_v4().to_string(),
            operation_type,
            payload,
            created_at: timestamp_now(),
            attempts: 0,
            last_attempt: None,
            status: QueueStatus::Pending,
            error: None,
            synced_at: None,
        }
    }

    /// Returns true once the item reached `synced` or `failed`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// =============================================================================
// Queue Statistics
// =============================================================================

/// Aggregate counts over the whole queue, recomputed on every query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QueueStats {
    pub pending: u64,
    pub syncing: u64,
    pub synced: u64,
    pub failed: u64,
    pub total: u64,
}

impl QueueStats {
    /// Adds `count` rows of `status` to the totals.
    pub fn record(&mut self, status: QueueStatus, count: u64) {
        match status {
            QueueStatus::Pending => self.pending += count,
            QueueStatus::Syncing => self.syncing += count,
            QueueStatus::Synced => self.synced += count,
            QueueStatus::Failed => self.failed += count,
        }
        self.total += count;
    }

    /// Items still owed to the remote service (pending or in flight).
    pub fn outstanding(&self) -> u64 {
        self.pending + self.syncing
    }
}

// =============================================================================
// Drain Report
// =============================================================================

/// Outcome counts of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Items that reached `synced` in this pass.
    pub succeeded: usize,
    /// Items whose attempt failed in this pass (`retried + exhausted`).
    pub failed: usize,
    /// Failed items that went back to `pending`.
    pub retried: usize,
    /// Failed items that became terminally `failed`.
    pub exhausted: usize,
}

impl DrainReport {
    /// Number of items attempted in the pass.
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

/// A previously fetched server response kept for offline display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CacheEntry {
    pub key: String,

    #[ts(type = "unknown")]
    pub data: serde_json::Value,

    /// When the entry was written.
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,

    /// Time-to-live in milliseconds.
    pub ttl_ms: u64,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(key: impl Into<String>, data: serde_json::Value, ttl: Duration) -> Self {
        CacheEntry {
            key: key.into(),
            data,
            timestamp: timestamp_now(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns the TTL as a Duration.
    #[inline]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Returns true when `now - timestamp > ttl`.
    ///
    /// A read exactly at the TTL boundary is still a hit.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let age_ms = now.timestamp_millis() - self.timestamp.timestamp_millis();
        age_ms > i64::try_from(self.ttl_ms).unwrap_or(i64::MAX)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
