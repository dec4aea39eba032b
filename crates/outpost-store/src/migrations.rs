//! # Database Migrations
//!
//! Embedded SQL migrations for the outpost store.
//!
//! ## Schema
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  001_queue_items.sql                                                   │
//! │    queue_items(seq PK, id UNIQUE, operation_type, payload, created_at, │
//! │                attempts, last_attempt, status, error, synced_at)       │
//! │    idx_queue_items_status (status, created_at, seq)                    │
//! │                                                                         │
//! │  002_cache_entries.sql                                                 │
//! │    cache_entries(key PK, data, timestamp, ttl_ms)                      │
//! │    idx_cache_entries_timestamp (timestamp)                             │
//! │                                                                         │
//! │  003_cache_expiry_index.sql                                            │
//! │    idx_cache_entries_expiry (timestamp + ttl_ms)   used by the sweep   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::StoreResult;

/// Embedded migrations from this crate's `migrations` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Runs all pending database migrations.
///
/// Idempotent; each migration runs in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns (total_migrations, applied_migrations), for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> StoreResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
