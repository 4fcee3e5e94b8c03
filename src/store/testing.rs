//! Store doubles for unit tests.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// A reachable-looking backend whose every command fails.
#[derive(Debug, Default)]
pub(crate) struct FailingStore;

fn unavailable<T>() -> Result<T, StoreError> {
    Err(StoreError::Backend("connection refused".to_string()))
}

#[async_trait]
impl KvStore for FailingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        unavailable()
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        unavailable()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), StoreError> {
        unavailable()
    }

    async fn del(&self, _key: &str) -> Result<bool, StoreError> {
        unavailable()
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        unavailable()
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
        unavailable()
    }

    async fn zadd(&self, _key: &str, _member: &str, _score: f64) -> Result<(), StoreError> {
        unavailable()
    }

    async fn zrevrange_by_score(
        &self,
        _key: &str,
        _offset: usize,
        _count: usize,
    ) -> Result<Vec<String>, StoreError> {
        unavailable()
    }

    async fn zrem_range_by_score(
        &self,
        _key: &str,
        _min: f64,
        _max: f64,
    ) -> Result<u64, StoreError> {
        unavailable()
    }

    async fn hincr_by(&self, _key: &str, _field: &str, _delta: i64) -> Result<i64, StoreError> {
        unavailable()
    }

    async fn hgetall(&self, _key: &str) -> Result<HashMap<String, String>, StoreError> {
        unavailable()
    }

    async fn rpush(&self, _key: &str, _value: &str) -> Result<u64, StoreError> {
        unavailable()
    }

    async fn lrange(
        &self,
        _key: &str,
        _start: isize,
        _stop: isize,
    ) -> Result<Vec<String>, StoreError> {
        unavailable()
    }
}
