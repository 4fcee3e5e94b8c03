//! Dynamic configuration manager.
//!
//! Administrators change downstream, cache and security settings at runtime by
//! writing them to the durable store, one key per field. Readers synthesize a
//! complete configuration on every call: each field comes from the store when
//! present and parseable, and from the static defaults otherwise. If the store
//! is disabled or a read fails, the whole section falls back to the defaults.
//!
//! Changes therefore take effect on the next read, with no restart and no
//! process-local cache to invalidate.

mod accounts;
mod error;
pub mod keys;


pub use accounts::{AccountSummary, DashboardAccount};
pub use error::DynamicConfigError;

use crate::config::{
    CacheConfig, DashboardConfig, IdentityProviderConfig, McpConfig, RelayConfig, SecurityConfig,
};
use crate::store::{KvStore, StoreError, StoreHandle};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Static fallback values, taken from the process configuration at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticDefaults {
    pub mcp: McpConfig,
    pub cache: CacheConfig,
    pub security: SecurityConfig,
    pub dashboard: DashboardConfig,
    /// Key prefix of the response-cache namespace
    pub cache_prefix: String,
}

impl StaticDefaults {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            mcp: config.mcp.clone(),
            cache: config.cache.clone(),
            security: config.security.clone(),
            dashboard: config.dashboard.clone(),
            cache_prefix: config.store.cache_prefix.clone(),
        }
    }
}

/// Reads and writes live settings over the durable store.
pub struct DynamicConfigManager {
    store: StoreHandle,
    defaults: StaticDefaults,
}

impl DynamicConfigManager {
    pub fn new(store: StoreHandle, defaults: StaticDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn from_config(store: StoreHandle, config: &RelayConfig) -> Self {
        Self::new(store, StaticDefaults::from_config(config))
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn defaults(&self) -> &StaticDefaults {
        &self.defaults
    }

    fn require_store(&self) -> Result<&Arc<dyn KvStore>, DynamicConfigError> {
        self.store
            .backend()
            .ok_or(DynamicConfigError::StoreUnavailable)
    }

    // =========================================================================
    // Downstream (MCP)
    // =========================================================================

    /// Current downstream settings. Never fails.
    pub async fn get_mcp_config(&self) -> McpConfig {
        let Some(store) = self.store.backend() else {
            return self.defaults.mcp.clone();
        };
        match self.read_mcp(store.as_ref()).await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to read MCP config, using static defaults");
                self.defaults.mcp.clone()
            }
        }
    }

    async fn read_mcp(&self, store: &dyn KvStore) -> Result<McpConfig, StoreError> {
        let d = &self.defaults.mcp;

        let endpoint = non_empty(store.get(&keys::mcp(keys::ENDPOINT)).await?)
            .unwrap_or_else(|| d.endpoint.clone());
        let timeout_ms = read_field(store, &keys::mcp(keys::TIMEOUT_MS), d.timeout_ms).await?;
        let max_retries = read_field(store, &keys::mcp(keys::MAX_RETRIES), d.max_retries).await?;
        let retry_delay_ms =
            read_field(store, &keys::mcp(keys::RETRY_DELAY_MS), d.retry_delay_ms).await?;
        let auth_token = non_empty(store.get(&keys::mcp(keys::AUTH_TOKEN)).await?)
            .or_else(|| d.auth_token.clone());
        let ai_service_key = non_empty(store.get(&keys::mcp(keys::AI_SERVICE_KEY)).await?)
            .or_else(|| d.ai_service_key.clone());
        let identity_provider = self.read_identity_provider(store).await?;

        Ok(McpConfig {
            endpoint,
            timeout_ms,
            max_retries,
            retry_delay_ms,
            auth_token,
            identity_provider,
            ai_service_key,
        })
    }

    /// Stored block wins whole when any of its fields is present.
    async fn read_identity_provider(
        &self,
        store: &dyn KvStore,
    ) -> Result<Option<IdentityProviderConfig>, StoreError> {
        let mut values = Vec::with_capacity(keys::IDP_FIELDS.len());
        for field in keys::IDP_FIELDS {
            values.push(store.get(&keys::identity_provider(field)).await?);
        }

        if values.iter().all(Option::is_none) {
            return Ok(self.defaults.mcp.identity_provider.clone());
        }

        let mut values = values.into_iter().map(Option::unwrap_or_default);
        Ok(Some(IdentityProviderConfig {
            server_url: values.next().unwrap_or_default(),
            realm: values.next().unwrap_or_default(),
            client_id: values.next().unwrap_or_default(),
            client_secret: values.next().unwrap_or_default(),
        }))
    }

    /// Persist downstream settings.
    ///
    /// Empty secrets delete their key, and a missing identity provider deletes
    /// the whole block, so reads fall back to the static defaults.
    pub async fn update_mcp_config(&self, config: &McpConfig) -> Result<(), DynamicConfigError> {
        validate_mcp(config)?;
        let store = self.require_store()?;

        store
            .set(&keys::mcp(keys::ENDPOINT), &config.endpoint, None)
            .await?;
        store
            .set(
                &keys::mcp(keys::TIMEOUT_MS),
                &config.timeout_ms.to_string(),
                None,
            )
            .await?;
        store
            .set(
                &keys::mcp(keys::MAX_RETRIES),
                &config.max_retries.to_string(),
                None,
            )
            .await?;
        store
            .set(
                &keys::mcp(keys::RETRY_DELAY_MS),
                &config.retry_delay_ms.to_string(),
                None,
            )
            .await?;
        set_or_delete(store.as_ref(), &keys::mcp(keys::AUTH_TOKEN), config.auth_token()).await?;
        set_or_delete(
            store.as_ref(),
            &keys::mcp(keys::AI_SERVICE_KEY),
            config.ai_service_key(),
        )
        .await?;

        match &config.identity_provider {
            Some(idp) => {
                let values = [
                    &idp.server_url,
                    &idp.realm,
                    &idp.client_id,
                    &idp.client_secret,
                ];
                for (field, value) in keys::IDP_FIELDS.iter().zip(values) {
                    store
                        .set(&keys::identity_provider(field), value, None)
                        .await?;
                }
            }
            None => {
                for field in keys::IDP_FIELDS {
                    store.del(&keys::identity_provider(field)).await?;
                }
            }
        }

        info!(
            endpoint = %config.endpoint,
            timeout_ms = config.timeout_ms,
            max_retries = config.max_retries,
            "MCP configuration updated"
        );
        Ok(())
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Current cache settings. Never fails.
    pub async fn get_cache_config(&self) -> CacheConfig {
        let Some(store) = self.store.backend() else {
            return self.defaults.cache.clone();
        };
        match self.read_cache(store.as_ref()).await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to read cache config, using static defaults");
                self.defaults.cache.clone()
            }
        }
    }

    async fn read_cache(&self, store: &dyn KvStore) -> Result<CacheConfig, StoreError> {
        let d = &self.defaults.cache;
        let enabled = match store.get(&keys::cache(keys::CACHE_ENABLED)).await? {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(
                    key = %keys::cache(keys::CACHE_ENABLED),
                    value = %raw,
                    "Ignoring unparseable config value"
                );
                d.enabled
            }),
            None => d.enabled,
        };
        Ok(CacheConfig {
            enabled,
            ttl_seconds: read_field(store, &keys::cache(keys::CACHE_TTL_SECONDS), d.ttl_seconds)
                .await?,
            max_size: read_field(store, &keys::cache(keys::CACHE_MAX_SIZE), d.max_size).await?,
        })
    }

    pub async fn update_cache_config(&self, config: &CacheConfig) -> Result<(), DynamicConfigError> {
        if config.max_size == 0 {
            return Err(DynamicConfigError::invalid(
                "max_size",
                "must be at least 1",
            ));
        }
        let store = self.require_store()?;

        store
            .set(
                &keys::cache(keys::CACHE_ENABLED),
                &config.enabled.to_string(),
                None,
            )
            .await?;
        store
            .set(
                &keys::cache(keys::CACHE_TTL_SECONDS),
                &config.ttl_seconds.to_string(),
                None,
            )
            .await?;
        store
            .set(
                &keys::cache(keys::CACHE_MAX_SIZE),
                &config.max_size.to_string(),
                None,
            )
            .await?;

        info!(
            enabled = config.enabled,
            ttl_seconds = config.ttl_seconds,
            max_size = config.max_size,
            "Cache configuration updated"
        );
        Ok(())
    }

    /// Delete every key in the response-cache namespace. Returns the count removed.
    pub async fn clear_cache(&self) -> Result<usize, DynamicConfigError> {
        let store = self.require_store()?;
        crate::config::store::check_cache_prefix(&self.defaults.cache_prefix)
            .map_err(|message| DynamicConfigError::invalid("cache_prefix", message))?;
        let pattern = format!("{}*", self.defaults.cache_prefix);

        let mut removed = 0;
        for key in store.keys(&pattern).await? {
            if store.del(&key).await? {
                removed += 1;
            }
        }

        info!(pattern = %pattern, removed, "Response cache cleared");
        Ok(removed)
    }

    // =========================================================================
    // Security
    // =========================================================================

    /// Current security settings. Never fails.
    pub async fn get_security_config(&self) -> SecurityConfig {
        let Some(store) = self.store.backend() else {
            return self.defaults.security.clone();
        };
        match self.read_security(store.as_ref()).await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to read security config, using static defaults");
                self.defaults.security.clone()
            }
        }
    }

    async fn read_security(&self, store: &dyn KvStore) -> Result<SecurityConfig, StoreError> {
        let d = &self.defaults.security;
        Ok(SecurityConfig {
            webhook_secret: non_empty(store.get(&keys::security(keys::WEBHOOK_SECRET)).await?)
                .unwrap_or_else(|| d.webhook_secret.clone()),
            rate_limit_per_minute: read_field(
                store,
                &keys::security(keys::RATE_LIMIT_PER_MINUTE),
                d.rate_limit_per_minute,
            )
            .await?,
        })
    }

    pub async fn update_security_config(
        &self,
        config: &SecurityConfig,
    ) -> Result<(), DynamicConfigError> {
        if config.rate_limit_per_minute == 0 {
            return Err(DynamicConfigError::invalid(
                "rate_limit_per_minute",
                "must be at least 1",
            ));
        }
        let store = self.require_store()?;

        set_or_delete(
            store.as_ref(),
            &keys::security(keys::WEBHOOK_SECRET),
            Some(config.webhook_secret.as_str()).filter(|s| !s.is_empty()),
        )
        .await?;
        store
            .set(
                &keys::security(keys::RATE_LIMIT_PER_MINUTE),
                &config.rate_limit_per_minute.to_string(),
                None,
            )
            .await?;

        info!(
            rate_limit_per_minute = config.rate_limit_per_minute,
            "Security configuration updated"
        );
        Ok(())
    }

    /// Settings are re-read from the store on every access, so a reload only
    /// records the request.
    pub fn reload(&self) {
        info!(
            store_enabled = self.store.is_enabled(),
            "Configuration reload requested, live values apply on next read"
        );
    }
}

fn validate_mcp(config: &McpConfig) -> Result<(), DynamicConfigError> {
    if config.endpoint.trim().is_empty() {
        return Err(DynamicConfigError::invalid("endpoint", "cannot be empty"));
    }
    if let Err(e) = reqwest::Url::parse(&config.endpoint) {
        return Err(DynamicConfigError::invalid(
            "endpoint",
            &format!("invalid URL: {}", e),
        ));
    }
    if config.timeout_ms == 0 {
        return Err(DynamicConfigError::invalid("timeout_ms", "must be at least 1"));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read one field, keeping `default` when absent or unparseable.
async fn read_field<T>(store: &dyn KvStore, key: &str, default: T) -> Result<T, StoreError>
where
    T: FromStr + Display,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(default);
    };
    match raw.trim().parse() {
        Ok(value) => Ok(value),
        Err(_) => {
            warn!(key, value = %raw, default = %default, "Ignoring unparseable config value");
            Ok(default)
        }
    }
}

async fn set_or_delete(
    store: &dyn KvStore,
    key: &str,
    value: Option<&str>,
) -> Result<(), StoreError> {
    match value {
        Some(v) => store.set(key, v, None).await,
        None => store.del(key).await.map(|_| ()),
    }
}
