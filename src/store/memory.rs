//! Process-local [`KvStore`] backed by a concurrent map.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    List(Vec<String>),
    ZSet(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory store with Redis-like semantics, including key expiry.
///
/// Expired keys are dropped lazily on access.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    /// Apply `f` to the live value at `key`, creating it with `init` when absent.
    fn with_value<T>(
        &self,
        key: &str,
        init: fn() -> Value,
        f: impl FnOnce(&mut Value) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.evict_if_expired(key);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(init()));
        f(&mut entry.value)
    }

    fn read<T>(
        &self,
        key: &str,
        f: impl FnOnce(&Value) -> Result<T, StoreError>,
    ) -> Result<Option<T>, StoreError> {
        self.evict_if_expired(key);
        match self.entries.get(key) {
            Some(entry) => f(&entry.value).map(Some),
            None => Ok(None),
        }
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

/// Glob match supporting `*` anywhere in the pattern.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == candidate;
    }

    let mut rest = candidate;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// Resolve a Redis-style inclusive range against a list length.
fn list_bounds(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key, |value| match value {
            Value::Str(s) => Ok(s.clone()),
            _ => Err(wrong_type(key)),
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = Entry {
            value: Value::Str(value.to_string()),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        self.evict_if_expired(key);
        Ok(self.entries.remove(key).is_some())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|e| !e.is_expired(now) && glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.evict_if_expired(key);
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        self.with_value(
            key,
            || Value::ZSet(HashMap::new()),
            |value| match value {
                Value::ZSet(set) => {
                    set.insert(member.to_string(), score);
                    Ok(())
                }
                _ => Err(wrong_type(key)),
            },
        )
    }

    async fn zrevrange_by_score(
        &self,
        key: &str,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>, StoreError> {
        let members = self.read(key, |value| match value {
            Value::ZSet(set) => {
                let mut members: Vec<(&String, &f64)> = set.iter().collect();
                members.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| b.0.cmp(a.0)));
                Ok(members
                    .into_iter()
                    .skip(offset)
                    .take(count)
                    .map(|(m, _)| m.clone())
                    .collect())
            }
            _ => Err(wrong_type(key)),
        })?;
        Ok(members.unwrap_or_default())
    }

    async fn zrem_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<u64, StoreError> {
        self.evict_if_expired(key);
        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        match &mut entry.value {
            Value::ZSet(set) => {
                let before = set.len();
                set.retain(|_, score| *score < min || *score > max);
                Ok((before - set.len()) as u64)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        self.with_value(
            key,
            || Value::Hash(HashMap::new()),
            |value| match value {
                Value::Hash(hash) => {
                    let current = match hash.get(field) {
                        Some(raw) => raw.parse::<i64>().map_err(|e| StoreError::InvalidValue {
                            key: format!("{}.{}", key, field),
                            message: e.to_string(),
                        })?,
                        None => 0,
                    };
                    let next = current + delta;
                    hash.insert(field.to_string(), next.to_string());
                    Ok(next)
                }
                _ => Err(wrong_type(key)),
            },
        )
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let hash = self.read(key, |value| match value {
            Value::Hash(hash) => Ok(hash.clone()),
            _ => Err(wrong_type(key)),
        })?;
        Ok(hash.unwrap_or_default())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        self.with_value(
            key,
            || Value::List(Vec::new()),
            |stored| match stored {
                Value::List(list) => {
                    list.push(value.to_string());
                    Ok(list.len() as u64)
                }
                _ => Err(wrong_type(key)),
            },
        )
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError> {
        let items = self.read(key, |value| match value {
            Value::List(list) => Ok(match list_bounds(list.len(), start, stop) {
                Some((from, to)) => list[from..=to].to_vec(),
                None => Vec::new(),
            }),
            _ => Err(wrong_type(key)),
        })?;
        Ok(items.unwrap_or_default())
    }
}
