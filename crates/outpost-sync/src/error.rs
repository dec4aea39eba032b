//! # Sync Error Types
//!
//! Error types for queue, engine, cache and configuration operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Storage      │  │   Handler outcomes      │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Storage        │  │  SyncFailure  (retry)   │ │
//! │  │  ConfigLoad...  │  │  (StoreError)   │  │  ConnectionFailed       │ │
//! │  │  ConfigSave...  │  │                 │  │  Timeout      (retry)   │ │
//! │  └─────────────────┘  └─────────────────┘  │  Rejected     (final)   │ │
//! │                                            └─────────────────────────┘ │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Queue       │  │     Engine      │  │      Input              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotFound       │  │  DrainInProgress│  │  Validation             │ │
//! │  │  InvalidState   │  │  RetryExhausted │  │  Serialization          │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation
//! Storage errors reach the caller of `enqueue` and every query unchanged.
//! Handler outcomes never leave `drain`: the engine turns them into status
//! transitions. `RetryExhausted` is only ever handed to the event emitter.

use thiserror::Error;

use outpost_core::{QueueStatus, ValidationError};
use outpost_store::StoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering engine, queue, cache and config failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// The persistent store failed (unavailable or write rejected).
    #[error(transparent)]
    Storage(#[from] StoreError),

    // =========================================================================
    // Handler Outcomes
    // =========================================================================
    /// The sync handler rejected an item; the item may be retried.
    #[error("Sync failed for {id}: {message}")]
    SyncFailure { id: String, message: String },

    /// The remote service could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A sync attempt did not finish in time.
    #[error("Sync attempt timed out after {0} ms")]
    Timeout(u64),

    /// The remote service refused the item permanently. Never retried.
    #[error("Rejected by remote: {0}")]
    Rejected(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// An item used up its retry budget.
    #[error("Retries exhausted for {id} after {attempts} attempts")]
    RetryExhausted { id: String, attempts: u32 },

    /// Another drain holds the engine.
    #[error("A drain is already in progress")]
    DrainInProgress,

    // =========================================================================
    // Queue Errors
    // =========================================================================
    /// No queue item with this id.
    #[error("Queue item not found: {0}")]
    NotFound(String),

    /// The item is not in a state that allows the operation.
    #[error("Queue item {id} is {status}, expected {expected}")]
    InvalidState {
        id: String,
        status: QueueStatus,
        expected: QueueStatus,
    },

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Rejected input (cache key, TTL, ...).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failed to (de)serialize a payload or cached value.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

/// I/O errors reaching this conversion come from handlers talking to the
/// remote service. Config file I/O is mapped explicitly in `config`.
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConnectionFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Builds a retryable handler failure for an item.
    pub fn failure(id: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::SyncFailure {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Returns true if a handler error should count against the retry budget
    /// rather than fail the item outright.
    ///
    /// ## Retryable Errors
    /// - Handler failures (HTTP 5xx, unexpected responses)
    /// - Connection failures and timeouts
    /// - Storage trouble inside the handler
    ///
    /// ## Non-Retryable Errors
    /// - Explicit rejections (validation failures on the remote side)
    /// - Malformed payloads
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::SyncFailure { .. }
                | SyncError::ConnectionFailed(_)
                | SyncError::Timeout(_)
                | SyncError::Storage(_)
                | SyncError::Internal(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the store itself failed.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, SyncError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::failure("a", "HTTP 503").is_retryable());
        assert!(SyncError::ConnectionFailed("refused".into()).is_retryable());
        assert!(SyncError::Timeout(30_000).is_retryable());

        assert!(!SyncError::Rejected("invalid customer".into()).is_retryable());
        assert!(!SyncError::Serialization("bad json".into()).is_retryable());
        assert!(!SyncError::DrainInProgress.is_retryable());
    }

    #[test]
    fn test_handler_io_error_is_retryable() {
        use std::io::{Error as IoError, ErrorKind};

        for kind in [
            ErrorKind::ConnectionRefused,
            ErrorKind::ConnectionReset,
            ErrorKind::BrokenPipe,
        ] {
            let err = SyncError::from(IoError::new(kind, "socket closed"));
            assert!(matches!(err, SyncError::ConnectionFailed(_)));
            assert!(err.is_retryable());
            assert!(!err.is_config_error());
        }
    }

    #[test]
    fn test_json_error_is_not_retryable() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = SyncError::from(json_err);
        assert!(matches!(err, SyncError::Serialization(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_error_via_question_mark_is_retryable() {
        fn handler_step() -> SyncResult<()> {
            Err::<(), StoreError>(StoreError::StorageWriteFailure("database is locked".into()))?;
            Ok(())
        }

        let err = handler_step().unwrap_err();
        assert!(err.is_storage_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_toml_errors_are_config_errors() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err = SyncError::from(toml_err);
        assert!(err.is_config_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::InvalidConfig("max_retries".into()).is_config_error());
        assert!(!SyncError::DrainInProgress.is_config_error());
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err = SyncError::from(StoreError::StorageUnavailable("disk full".into()));
        assert!(err.is_storage_error());
        assert_eq!(err.to_string(), "Storage unavailable: disk full");
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::InvalidState {
            id: "abc-123".into(),
            status: QueueStatus::Pending,
            expected: QueueStatus::Failed,
        };
        assert_eq!(err.to_string(), "Queue item abc-123 is pending, expected failed");

        let err = SyncError::RetryExhausted {
            id: "abc-123".into(),
            attempts: 3,
        };
        assert!(err.to_string().contains("3 attempts"));
    }
}
