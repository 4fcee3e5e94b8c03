//! Request and response types for the HTTP API.

use crate::config::{CacheConfig, IdentityProviderConfig, McpConfig, SecurityConfig};
use crate::dynamic::DynamicConfigError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /v1/query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

/// Query string of `GET /v1/telemetry/recent`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
    pub status: Option<String>,
}

/// Query string of `GET /v1/telemetry/hourly`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlyParams {
    pub hours: Option<u32>,
}

// ============================================================================
// Configuration views and patches
// ============================================================================

/// Downstream settings as returned to administrators; secrets become flags.
#[derive(Debug, Clone, Serialize)]
pub struct McpConfigView {
    pub endpoint: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub auth_token_set: bool,
    pub ai_service_key_set: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<IdentityProviderView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentityProviderView {
    pub server_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret_set: bool,
}

impl From<&McpConfig> for McpConfigView {
    fn from(config: &McpConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout_ms: config.timeout_ms,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
            auth_token_set: config.auth_token().is_some(),
            ai_service_key_set: config.ai_service_key().is_some(),
            identity_provider: config
                .identity_provider
                .as_ref()
                .map(|idp| IdentityProviderView {
                    server_url: idp.server_url.clone(),
                    realm: idp.realm.clone(),
                    client_id: idp.client_id.clone(),
                    client_secret_set: !idp.client_secret.is_empty(),
                }),
        }
    }
}

/// Partial update of downstream settings; absent fields keep their live value.
///
/// An empty `auth_token` or `ai_service_key` unsets it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpConfigPatch {
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub auth_token: Option<String>,
    pub ai_service_key: Option<String>,
    pub identity_provider: Option<IdentityProviderConfig>,
    /// Remove the identity-provider block
    #[serde(default)]
    pub clear_identity_provider: bool,
}

impl McpConfigPatch {
    pub fn apply(self, mut config: McpConfig) -> McpConfig {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(retry_delay_ms) = self.retry_delay_ms {
            config.retry_delay_ms = retry_delay_ms;
        }
        if let Some(token) = self.auth_token {
            config.auth_token = Some(token);
        }
        if let Some(key) = self.ai_service_key {
            config.ai_service_key = Some(key);
        }
        if self.clear_identity_provider {
            config.identity_provider = None;
        } else if let Some(idp) = self.identity_provider {
            config.identity_provider = Some(idp);
        }
        config
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfigPatch {
    pub enabled: Option<bool>,
    pub ttl_seconds: Option<u64>,
    pub max_size: Option<u64>,
}

impl CacheConfigPatch {
    pub fn apply(self, mut config: CacheConfig) -> CacheConfig {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(ttl_seconds) = self.ttl_seconds {
            config.ttl_seconds = ttl_seconds;
        }
        if let Some(max_size) = self.max_size {
            config.max_size = max_size;
        }
        config
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityConfigView {
    pub webhook_secret_set: bool,
    pub rate_limit_per_minute: u32,
}

impl From<&SecurityConfig> for SecurityConfigView {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            webhook_secret_set: !config.webhook_secret.is_empty(),
            rate_limit_per_minute: config.rate_limit_per_minute,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfigPatch {
    pub webhook_secret: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
}

impl SecurityConfigPatch {
    pub fn apply(self, mut config: SecurityConfig) -> SecurityConfig {
        if let Some(secret) = self.webhook_secret {
            config.webhook_secret = secret;
        }
        if let Some(limit) = self.rate_limit_per_minute {
            config.rate_limit_per_minute = limit;
        }
        config
    }
}

/// Body of `POST /v1/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccountRequest {
    pub username: String,
    pub secret: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "viewer".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

// ============================================================================
// Errors
// ============================================================================

/// Error envelope returned by every non-2xx response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    fn new(message: &str, r#type: &str, param: Option<&str>, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.to_string(),
                r#type: r#type.to_string(),
                param: param.map(str::to_string),
                code: Some(code.to_string()),
            },
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self::new(message, "invalid_request_error", None, "invalid_request_error")
    }

    /// Create a bad request error (400) naming the offending field.
    pub fn invalid_param(param: &str, message: &str) -> Self {
        Self::new(
            message,
            "invalid_request_error",
            Some(param),
            "invalid_request_error",
        )
    }

    /// Create a forbidden error (403).
    pub fn forbidden(message: &str) -> Self {
        Self::new(message, "invalid_request_error", None, "forbidden")
    }

    /// Create a not found error (404).
    pub fn not_found(message: &str) -> Self {
        Self::new(message, "invalid_request_error", None, "not_found")
    }

    /// Create a conflict error (409).
    pub fn conflict(message: &str) -> Self {
        Self::new(message, "invalid_request_error", None, "conflict")
    }

    /// Create a service unavailable error (503).
    pub fn service_unavailable(message: &str) -> Self {
        Self::new(message, "server_error", None, "service_unavailable")
    }

    /// Create an internal error (500).
    pub fn internal(message: &str) -> Self {
        Self::new(message, "server_error", None, "internal_error")
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("forbidden") => StatusCode::FORBIDDEN,
            Some("not_found") => StatusCode::NOT_FOUND,
            Some("conflict") => StatusCode::CONFLICT,
            Some("service_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<DynamicConfigError> for ApiError {
    fn from(e: DynamicConfigError) -> Self {
        match &e {
            DynamicConfigError::Invalid { field, message } => Self::invalid_param(field, message),
            DynamicConfigError::DuplicateUser(_) => Self::conflict(&e.to_string()),
            DynamicConfigError::StoreUnavailable | DynamicConfigError::Store(_) => {
                Self::service_unavailable(&e.to_string())
            }
            DynamicConfigError::Serialization(_) => Self::internal(&e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::service_unavailable(&e.to_string())
    }
}
