//! Store key layout for dynamic configuration.
//!
//! One key per field so partial configuration stays valid.

pub const ENDPOINT: &str = "endpoint";
pub const TIMEOUT_MS: &str = "timeout_ms";
pub const MAX_RETRIES: &str = "max_retries";
pub const RETRY_DELAY_MS: &str = "retry_delay_ms";
pub const AUTH_TOKEN: &str = "auth_token";
pub const AI_SERVICE_KEY: &str = "ai_service_key";

pub const IDP_SERVER_URL: &str = "server_url";
pub const IDP_REALM: &str = "realm";
pub const IDP_CLIENT_ID: &str = "client_id";
pub const IDP_CLIENT_SECRET: &str = "client_secret";
pub const IDP_FIELDS: [&str; 4] = [IDP_SERVER_URL, IDP_REALM, IDP_CLIENT_ID, IDP_CLIENT_SECRET];

pub const CACHE_ENABLED: &str = "enabled";
pub const CACHE_TTL_SECONDS: &str = "ttl_seconds";
pub const CACHE_MAX_SIZE: &str = "max_size";

pub const WEBHOOK_SECRET: &str = "webhook_secret";
pub const RATE_LIMIT_PER_MINUTE: &str = "rate_limit_per_minute";

pub const USER_PATTERN: &str = "dashboard:user:*";

pub fn mcp(field: &str) -> String {
    format!("config:mcp:{}", field)
}

pub fn identity_provider(field: &str) -> String {
    format!("config:mcp:identity_provider:{}", field)
}

pub fn cache(field: &str) -> String {
    format!("config:cache:{}", field)
}

pub fn security(field: &str) -> String {
    format!("config:security:{}", field)
}

pub fn user(username: &str) -> String {
    format!("dashboard:user:{}", username)
}
