//! # Validation Module
//!
//! Input validation shared by the store and the engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Engine API (outpost-sync)                                    │
//! │  └── THIS MODULE: cache keys, TTLs, ids, retry policy                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE(id) on queue_items                                         │
//! │  └── CHECK(status IN (...))                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use outpost_core::validation::{validate_cache_key, validate_item_id};
//!
//! validate_cache_key("products:page:1").unwrap();
//! assert!(validate_item_id("not-a-uuid").is_err());
//! ```

use std::time::Duration;

use crate::error::ValidationError;
use crate::MAX_CACHE_KEY_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound accepted for the retry budget.
const MAX_RETRY_BUDGET: u32 = 100;

// =============================================================================
// Cache Validators
// =============================================================================

/// Validates a cache key.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most [`MAX_CACHE_KEY_LEN`] bytes
pub fn validate_cache_key(key: &str) -> ValidationResult<()> {
    if key.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "key".to_string(),
        });
    }

    if key.len() > MAX_CACHE_KEY_LEN {
        return Err(ValidationError::TooLong {
            field: "key".to_string(),
            max: MAX_CACHE_KEY_LEN,
        });
    }

    Ok(())
}

/// Validates a cache TTL. A zero TTL would make every entry stale on write.
pub fn validate_ttl(ttl: Duration) -> ValidationResult<()> {
    if ttl.is_zero() {
        return Err(ValidationError::MustBePositive {
            field: "ttl".to_string(),
        });
    }

    if ttl.as_millis() > i64::MAX as u128 {
        return Err(ValidationError::OutOfRange {
            field: "ttl_ms".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Queue Validators
// =============================================================================

/// Validates a queue item id (UUID format).
pub fn validate_item_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|e| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Validates the retry budget of the sync policy.
pub fn validate_max_retries(max_retries: u32) -> ValidationResult<()> {
    if max_retries == 0 || max_retries > MAX_RETRY_BUDGET {
        return Err(ValidationError::OutOfRange {
            field: "max_retries".to_string(),
            min: 1,
            max: i64::from(MAX_RETRY_BUDGET),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
