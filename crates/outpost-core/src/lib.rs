//! # outpost-core: Pure Queue Types for Outpost
//!
//! This crate holds the data model of the offline write queue and the read
//! cache as plain types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Outpost Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Application (domain actions)                    │   │
//! │  │    complete sale ──► create invoice ──► process payment         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ enqueue / drain / get_stats           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 outpost-sync (engine layer)                     │   │
//! │  │    QueueManager, SyncEngine, ConnectivityMonitor, CacheLayer    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ outpost-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────┐  ┌─────────────┐  ┌─────────────┐            │   │
//! │  │   │    types    │  │ validation  │  │    error    │            │   │
//! │  │   │  QueueItem  │  │  cache key  │  │  CoreError  │            │   │
//! │  │   │ CacheEntry  │  │  ttl, ids   │  │             │            │   │
//! │  │   └─────────────┘  └─────────────┘  └─────────────┘            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 outpost-store (SQLite layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Queue and cache records (QueueItem, CacheEntry, QueueStats)
//! - [`error`] - Domain error types
//! - [`validation`] - Input checks shared by the store and the engine
//!
//! ## Example Usage
//!
//! ```rust
//! use outpost_core::{OperationType, QueueItem, QueueStatus};
//! use serde_json::json;
//!
//! let item = QueueItem::new(OperationType::InvoiceCreate, json!({ "total": 100 }));
//! assert_eq!(item.status, QueueStatus::Pending);
//! assert_eq!(item.attempts, 0);
//! assert_eq!(item.operation_type.to_string(), "invoice.create");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of failed attempts after which a queue item becomes `failed`.
///
/// ## Lifecycle
/// ```text
/// attempt 1 fails ──► pending (attempts = 1)
/// attempt 2 fails ──► pending (attempts = 2)
/// attempt 3 fails ──► failed  (attempts = 3, terminal)
/// ```
pub const MAX_RETRIES: u32 = 3;

/// Default pause after a retryable failure before the drain moves on.
///
/// A policy value, not a contract: the engine reads it from config.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Default per-attempt timeout for the sync handler.
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Default time-to-live for cached server data (one hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3_600;

/// Longest cache key accepted by [`validation::validate_cache_key`].
pub const MAX_CACHE_KEY_LEN: usize = 256;
