//! Durable store and dashboard bootstrap settings

use serde::{Deserialize, Serialize};

/// Durable key/value store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `redis://…`, `memory://`, or empty to run without a store
    pub url: String,
    /// Key prefix of the response-cache namespace
    pub cache_prefix: String,
    pub connect_timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cache_prefix: "cache:".to_string(),
            connect_timeout_seconds: 5,
        }
    }
}

/// Check that a cache prefix selects a namespace and not the whole keyspace.
///
/// The prefix is used as a `KEYS` pattern, so glob metacharacters are refused.
pub fn check_cache_prefix(prefix: &str) -> Result<(), &'static str> {
    if prefix.is_empty() {
        return Err("cache prefix cannot be empty");
    }
    if prefix.contains(['*', '?', '[', ']', '\\']) {
        return Err("cache prefix cannot contain glob characters");
    }
    Ok(())
}

/// Bootstrap administrator written on first account listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub admin_username: String,
    pub admin_secret: String,
    pub admin_role: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_secret: "change-me".to_string(),
            admin_role: "admin".to_string(),
        }
    }
}
