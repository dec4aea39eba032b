//! # Store Error Types
//!
//! Error types for persistent store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← StorageUnavailable / StorageWriteFailure   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError::Storage (outpost-sync) ← returned from enqueue / queries   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Application decides whether to surface it to the user                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Persistent store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be opened or is no longer usable.
    ///
    /// ## When This Occurs
    /// - Database file can't be created (permissions, missing directory)
    /// - Disk full / quota exceeded at open time
    /// - Migrations fail
    /// - The pool was closed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An individual write was rejected.
    ///
    /// ## When This Occurs
    /// - Constraint violation (duplicate id, bad status value)
    /// - Disk full during the write
    /// - Database locked past the busy timeout
    #[error("Storage write failed: {0}")]
    StorageWriteFailure(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A stored row could not be decoded into its domain type.
    #[error("Corrupt {entity} record {id}: {reason}")]
    Corrupt {
        entity: String,
        id: String,
        reason: String,
    },

    /// A read query failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a Corrupt error.
    pub fn corrupt(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        StoreError::Corrupt {
            entity: entity.into(),
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Maps an error raised by a write statement.
    ///
    /// ```text
    /// sqlx::Error::PoolClosed   → StoreError::StorageUnavailable
    /// sqlx::Error::PoolTimedOut → StoreError::PoolExhausted
    /// anything else             → StoreError::StorageWriteFailure
    /// ```
    pub fn write(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => {
                StoreError::StorageUnavailable("Pool is closed".to_string())
            }
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                StoreError::StorageWriteFailure(db_err.message().to_string())
            }
            other => StoreError::StorageWriteFailure(other.to_string()),
        }
    }

    /// Returns true if the store itself is unusable (as opposed to one bad record).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable(_))
    }
}

/// Convert sqlx errors raised by reads to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → StoreError::NotFound
/// sqlx::Error::Database       → StoreError::QueryFailed
/// sqlx::Error::PoolTimedOut   → StoreError::PoolExhausted
/// sqlx::Error::PoolClosed     → StoreError::StorageUnavailable
/// sqlx::Error::Io             → StoreError::StorageUnavailable
/// Other                       → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),

            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,

            sqlx::Error::PoolClosed => {
                StoreError::StorageUnavailable("Pool is closed".to_string())
            }

            sqlx::Error::Io(io) => StoreError::StorageUnavailable(io.to_string()),

            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::StorageUnavailable(format!("Migration failed: {}", err))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
