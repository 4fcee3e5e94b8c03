//! Configuration module for Relay
//!
//! Provides layered loading of the static process configuration from files,
//! environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`RELAY_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! The `mcp`, `cache`, `security` and `dashboard` sections are only the static
//! defaults; at runtime the [`DynamicConfigManager`](crate::dynamic::DynamicConfigManager)
//! overlays whatever an administrator has written to the durable store.
//!
//! # Example
//!
//! ```rust
//! use relay::config::RelayConfig;
//!
//! let config = RelayConfig::default();
//! assert_eq!(config.server.port, 8090);
//!
//! let toml = r#"
//! [circuit_breaker]
//! failure_threshold = 3
//! "#;
//! let config: RelayConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.circuit_breaker.failure_threshold, 3);
//! assert!(config.circuit_breaker.enabled);
//! ```

pub mod cache;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod server;
pub mod store;

pub use cache::{CacheConfig, SecurityConfig};
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use mcp::{IdentityProviderConfig, McpConfig};
pub use server::ServerConfig;
pub use store::{DashboardConfig, StoreConfig};

// Re-export CircuitBreakerConfig from dispatch module
pub use crate::dispatch::CircuitBreakerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified static configuration for the Relay gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Durable store connection
    pub store: StoreConfig,
    /// Static downstream connection defaults
    pub mcp: McpConfig,
    /// Static cache defaults
    pub cache: CacheConfig,
    /// Static security defaults
    pub security: SecurityConfig,
    /// Bootstrap dashboard account
    pub dashboard: DashboardConfig,
    /// Circuit breaker toggles (process-start only)
    pub circuit_breaker: CircuitBreakerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports RELAY_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("RELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("RELAY_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RELAY_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(url) = std::env::var("RELAY_STORE_URL") {
            self.store.url = url;
        }
        if let Ok(endpoint) = std::env::var("RELAY_MCP_ENDPOINT") {
            self.mcp.endpoint = endpoint;
        }
        if let Ok(token) = std::env::var("RELAY_MCP_AUTH_TOKEN") {
            self.mcp.auth_token = Some(token).filter(|t| !t.is_empty());
        }

        if let Ok(enabled) = std::env::var("RELAY_CIRCUIT_BREAKER") {
            self.circuit_breaker.enabled = enabled.to_lowercase() == "true";
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        if self.mcp.endpoint.is_empty() {
            return Err(ConfigError::Validation {
                field: "mcp.endpoint".to_string(),
                message: "endpoint cannot be empty".to_string(),
            });
        }
        if let Err(e) = reqwest::Url::parse(&self.mcp.endpoint) {
            return Err(ConfigError::Validation {
                field: "mcp.endpoint".to_string(),
                message: format!("invalid URL: {}", e),
            });
        }

        if let Err((field, message)) = self.logging.check_levels() {
            return Err(ConfigError::Validation { field, message });
        }

        if let Err(message) = store::check_cache_prefix(&self.store.cache_prefix) {
            return Err(ConfigError::Validation {
                field: "store.cache_prefix".to_string(),
                message: message.to_string(),
            });
        }

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::Validation {
                field: "circuit_breaker.failure_threshold".to_string(),
                message: "threshold must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
