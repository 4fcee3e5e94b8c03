//! Response cache and inbound security settings

use serde::{Deserialize, Serialize};

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600,
            max_size: 1000,
        }
    }
}

/// Inbound security settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret for inbound webhook signatures
    pub webhook_secret: String,
    /// Requests accepted per client per minute
    pub rate_limit_per_minute: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            rate_limit_per_minute: 60,
        }
    }
}
