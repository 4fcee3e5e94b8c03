//! Durable key/value store adapter.
//!
//! Dynamic configuration and telemetry persist through the [`KvStore`] trait,
//! which models the small subset of Redis commands the gateway needs. Two
//! backends exist: [`RedisStore`] for deployments and [`MemoryStore`] for a
//! single process (and tests).
//!
//! A [`StoreHandle`] may also be *disabled*. Every dependent treats a disabled
//! handle as "store unreachable" and falls back to static defaults.

mod error;
mod memory;
mod redis_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::config::StoreConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Asynchronous key/value store with strings, hashes, lists and sorted sets.
///
/// Object-safe; shared as `Arc<dyn KvStore>`.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Round-trip to verify the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Read a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a string value, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Delete a key of any type. Returns whether it existed.
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    /// List keys matching a glob pattern. Only a trailing `*` is portable.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Set or refresh the expiry of an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Add or re-score a sorted-set member.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    /// Members ordered by descending score, skipping `offset` and returning at most `count`.
    async fn zrevrange_by_score(
        &self,
        key: &str,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Remove members whose score lies in `[min, max]`. Returns the number removed.
    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64)
        -> Result<u64, StoreError>;

    /// Increment an integer hash field, creating it at zero.
    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError>;

    /// Read all fields of a hash. Missing keys read as an empty map.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Append to a list. Returns the new length.
    async fn rpush(&self, key: &str, value: &str) -> Result<u64, StoreError>;

    /// Inclusive list range; negative indices count from the end.
    async fn lrange(&self, key: &str, start: isize, stop: isize)
        -> Result<Vec<String>, StoreError>;
}

/// Shared accessor over an optional store backend.
///
/// Cheap to clone. `backend()` returns `None` in disabled mode.
#[derive(Clone, Default)]
pub struct StoreHandle {
    backend: Option<Arc<dyn KvStore>>,
}

impl StoreHandle {
    /// Wrap a connected backend.
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Handle with no backend; all dependents use static defaults.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Handle over a fresh process-local [`MemoryStore`].
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> Option<&Arc<dyn KvStore>> {
        self.backend.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Connect according to configuration, degrading to disabled on failure.
    ///
    /// Never fails: an unreachable Redis or unknown URL scheme is logged and
    /// the gateway runs on static defaults.
    pub async fn connect(config: &StoreConfig) -> Self {
        match Self::try_connect(config).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                tracing::info!("No durable store configured, using static defaults");
                Self::disabled()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Durable store unavailable, falling back to static defaults"
                );
                Self::disabled()
            }
        }
    }

    async fn try_connect(config: &StoreConfig) -> Result<Option<Self>, StoreError> {
        let url = config.url.trim();
        if url.is_empty() {
            return Ok(None);
        }

        if url.starts_with("memory://") {
            tracing::info!("Using process-local memory store");
            return Ok(Some(Self::memory()));
        }

        if url.starts_with("redis://") || url.starts_with("rediss://") {
            let timeout = Duration::from_secs(config.connect_timeout_seconds);
            let store = RedisStore::connect(url, timeout).await?;
            store.ping().await?;
            tracing::info!("Connected to Redis store");
            return Ok(Some(Self::new(Arc::new(store))));
        }

        Err(StoreError::UnsupportedUrl(url.to_string()))
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
