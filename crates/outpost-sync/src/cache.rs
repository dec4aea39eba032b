//! # Cache Layer
//!
//! TTL-keyed read cache for server data shown while offline.
//!
//! Independent of the write queue: nothing here affects what gets synced.
//! Expiry is decided when reading, so an expired entry is a miss even if
//! it is still on disk; [`CacheLayer::clear_expired_cache`] removes such
//! entries (the connectivity monitor runs it after each reconnect drain).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use outpost_core::validation::{validate_cache_key, validate_ttl};
use outpost_core::{timestamp_now, CacheEntry, DEFAULT_CACHE_TTL_SECS};
use outpost_store::{CacheRepository, Database};

use crate::error::SyncResult;

/// Read cache over an injected store handle.
#[derive(Debug, Clone)]
pub struct CacheLayer {
    repo: CacheRepository,
    default_ttl: Duration,
}

impl CacheLayer {
    /// Creates a cache layer with the default one-hour TTL.
    pub fn new(db: &Database) -> Self {
        CacheLayer {
            repo: db.cache(),
            default_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }

    /// Sets the TTL used by [`CacheLayer::cache_data_default`].
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Stores `data` under `key`, replacing any previous value.
    pub async fn cache_data<T>(&self, key: &str, data: &T, ttl: Duration) -> SyncResult<()>
    where
        T: Serialize + ?Sized,
    {
        validate_cache_key(key)?;
        validate_ttl(ttl)?;

        let entry = CacheEntry::new(key, serde_json::to_value(data)?, ttl);
        self.repo.put(&entry).await?;
        Ok(())
    }

    /// Stores `data` under `key` with the default TTL.
    pub async fn cache_data_default<T>(&self, key: &str, data: &T) -> SyncResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.cache_data(key, data, self.default_ttl).await
    }

    /// Returns the cached value, or None if absent or older than its TTL.
    pub async fn get_cached_data<T>(&self, key: &str) -> SyncResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(entry) = self.repo.get(key).await? else {
            debug!(key = %key, "Cache miss");
            return Ok(None);
        };

        if entry.is_expired_at(timestamp_now()) {
            debug!(key = %key, "Cache entry expired");
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(entry.data)?))
    }

    /// Deletes every expired entry. Returns the number removed.
    pub async fn clear_expired_cache(&self) -> SyncResult<u64> {
        let removed = self.repo.delete_expired(timestamp_now()).await?;
        if removed > 0 {
            info!(removed, "Swept expired cache entries");
        }
        Ok(removed)
    }

    /// Drops one entry. Returns false if there was none.
    pub async fn invalidate(&self, key: &str) -> SyncResult<bool> {
        Ok(self.repo.delete(key).await?)
    }

    /// Drops every entry, fresh or not.
    pub async fn clear(&self) -> SyncResult<u64> {
        let removed = self.repo.clear().await?;
        info!(removed, "Cache cleared");
        Ok(removed)
    }
}
