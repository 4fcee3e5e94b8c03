//! Downstream (MCP) connection settings.
//!
//! The same type carries the static defaults from the config file and the
//! live values synthesized by the dynamic configuration manager.

use serde::{Deserialize, Serialize};

/// Connection settings for the downstream answer service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Query endpoint receiving `POST {query, context}`
    pub endpoint: String,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Pause between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Bearer token for the downstream service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Identity-provider credentials forwarded in the request context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<IdentityProviderConfig>,
    /// Key for the AI service behind the downstream, forwarded in the request context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_service_key: Option<String>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8081/query".to_string(),
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            auth_token: None,
            identity_provider: None,
            ai_service_key: None,
        }
    }
}

impl McpConfig {
    /// Auth token if set to a non-empty value.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }

    /// AI-service key if set to a non-empty value.
    pub fn ai_service_key(&self) -> Option<&str> {
        self.ai_service_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// OpenID-style identity provider block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityProviderConfig {
    pub server_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
}
