//! # Repository Module
//!
//! Table-level access for the outpost store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  QueueManager / SyncEngine (outpost-sync)                              │
//! │       │                                                                 │
//! │       │  db.queue().get_by_status(QueueStatus::Pending)                │
//! │       ▼                                                                 │
//! │  QueueRepository                      CacheRepository                  │
//! │  ├── put / get / delete               ├── put / get / delete           │
//! │  ├── get_by_status (FIFO)             ├── delete_expired(now)          │
//! │  ├── mark_syncing / mark_synced       └── clear / count                │
//! │  ├── record_failure (atomic)                                           │
//! │  └── reset_syncing / replace_failed                                    │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  queue_items                           cache_entries                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories hold no state beyond a pool handle; they encode rows and
//! enforce status preconditions in SQL. Policy (retry budget, TTL choice)
//! lives in outpost-sync.

pub mod cache;
pub mod queue;
