//! # Error Types
//!
//! Domain-specific error types for outpost-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  outpost-core errors (this file)                                       │
//! │  ├── CoreError        - Decoding / state errors on queue records        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  outpost-store errors (separate crate)                                 │
//! │  └── StoreError       - StorageUnavailable, StorageWriteFailure, ...    │
//! │                                                                         │
//! │  outpost-sync errors (separate crate)                                  │
//! │  └── SyncError        - SyncFailure, RetryExhausted, Timeout, ...       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → SyncError → caller   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised while interpreting queue and cache records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A status string read back from storage is not one of the four states.
    #[error("Unknown queue status: '{0}'")]
    UnknownStatus(String),

    /// An operation tag is not in the closed set of operation kinds.
    ///
    /// ## When This Occurs
    /// - Parsing a tag typed by an operator (`outpost-queue retry ...`)
    /// - A row written by a newer build with an operation this build lacks
    #[error("Unknown operation type: '{0}'")]
    UnknownOperation(String),

    /// A stored timestamp is outside the range chrono can represent.
    #[error("Invalid timestamp: {0} ms")]
    InvalidTimestamp(i64),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
