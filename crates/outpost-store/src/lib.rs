//! # outpost-store: Durable Storage for Outpost
//!
//! SQLite persistence for the offline write queue and the read cache.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Outpost Data Flow                                │
//! │                                                                         │
//! │  QueueManager::enqueue / SyncEngine::drain / CacheLayer::cache_data    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  outpost-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ QueueRepository│    │ 001_queue    │  │   │
//! │  │   │ SqlitePool    │◄───│ CacheRepository│    │ 002_cache    │  │   │
//! │  │   │               │    │                │    │ 003_expiry   │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/outpost.db  (survives restarts)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//! - [`repository`] - Queue and cache repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use outpost_store::{Database, StoreConfig};
//!
//! let db = Database::new(StoreConfig::new("path/to/outpost.db")).await?;
//!
//! let pending = db.queue().get_by_status(QueueStatus::Pending).await?;
//! let cached = db.cache().get("customers").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{Database, DrainClaim, StoreConfig};

pub use repository::cache::CacheRepository;
pub use repository::queue::QueueRepository;

// =============================================================================
// Durability Tests
// =============================================================================
