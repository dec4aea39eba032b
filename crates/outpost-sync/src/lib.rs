//! # outpost-sync: Offline Queue Engine for Outpost
//!
//! Queues domain writes locally and replays them against the backend when
//! connectivity returns.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Outpost Sync Architecture                        │
//! │                                                                         │
//! │  Domain action (complete sale, create invoice, process payment)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌────────────────┐         ┌──────────────────────────────────────┐   │
//! │  │  QueueManager  │◄────────│             SyncEngine               │   │
//! │  │                │         │                                      │   │
//! │  │ enqueue        │         │ drain(handler) → DrainReport         │   │
//! │  │ get_pending    │         │ one item at a time, FIFO             │   │
//! │  │ transitions    │         │ retry budget, timeout, drain claim   │   │
//! │  └───────┬────────┘         └──────────────────▲───────────────────┘   │
//! │          │                                     │ offline → online      │
//! │          │                  ┌──────────────────┴───────────────────┐   │
//! │          │                  │        ConnectivityMonitor           │   │
//! │          │                  │ set_online / TCP probe / auto sync   │   │
//! │          │                  └──────────────────────────────────────┘   │
//! │          │                                                              │
//! │          │      ┌────────────────┐                                      │
//! │          │      │   CacheLayer   │  TTL read cache for offline display │
//! │          │      └───────┬────────┘                                      │
//! │          ▼              ▼                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               outpost-store (SQLite, survives restarts)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`queue`] - `QueueManager`, the only writer of queue items
//! - [`engine`] - `SyncEngine`, `SyncHandler`, `RetryPolicy`, event emitter
//! - [`connectivity`] - `ConnectivityMonitor`, auto sync, TCP probe
//! - [`cache`] - `CacheLayer` read cache
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use outpost_sync::{ConnectivityMonitor, QueueManager, SyncConfig, SyncEngine};
//! use outpost_store::Database;
//!
//! let config = SyncConfig::load_or_default(None);
//! let db = Database::new(config.store_config()?).await?;
//!
//! let queue = QueueManager::new(&db);
//! queue.enqueue(OperationType::InvoiceCreate, json!({ "total": 100 })).await?;
//!
//! let engine = SyncEngine::new(queue.clone(), config.retry_policy());
//! let monitor = ConnectivityMonitor::new(false);
//! let _auto_sync = monitor.enable_auto_sync(engine.clone(), Arc::new(api_handler));
//!
//! // Manual "sync now"
//! let report = engine.drain(&api_handler).await?;
//! println!("synced {}, failed {}", report.succeeded, report.failed);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod queue;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::CacheLayer;
pub use config::SyncConfig;
pub use connectivity::{probe_once, AutoSyncGuard, ConnectivityMonitor, ProbeConfig, ProbeHandle};
pub use engine::{NoOpEmitter, RetryPolicy, SyncEngine, SyncEventEmitter, SyncHandler};
pub use error::{SyncError, SyncResult};
pub use queue::QueueManager;
