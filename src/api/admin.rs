//! Administrator endpoints for live configuration and dashboard accounts.

use super::{
    ApiError, AppState, CacheConfigPatch, ClearCacheResponse, McpConfigPatch, McpConfigView,
    NewAccountRequest, SecurityConfigPatch, SecurityConfigView,
};
use crate::config::CacheConfig;
use crate::dynamic::{AccountSummary, DashboardAccount};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /v1/config/mcp
pub async fn get_mcp(State(state): State<Arc<AppState>>) -> Json<McpConfigView> {
    let config = state.settings.get_mcp_config().await;
    Json(McpConfigView::from(&config))
}

/// PUT /v1/config/mcp
pub async fn update_mcp(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<McpConfigPatch>,
) -> Result<Json<McpConfigView>, ApiError> {
    let config = patch.apply(state.settings.get_mcp_config().await);
    state.settings.update_mcp_config(&config).await?;
    Ok(Json(McpConfigView::from(
        &state.settings.get_mcp_config().await,
    )))
}

/// GET /v1/config/cache
pub async fn get_cache(State(state): State<Arc<AppState>>) -> Json<CacheConfig> {
    Json(state.settings.get_cache_config().await)
}

/// PUT /v1/config/cache
pub async fn update_cache(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<CacheConfigPatch>,
) -> Result<Json<CacheConfig>, ApiError> {
    let config = patch.apply(state.settings.get_cache_config().await);
    state.settings.update_cache_config(&config).await?;
    Ok(Json(state.settings.get_cache_config().await))
}

/// GET /v1/config/security
pub async fn get_security(State(state): State<Arc<AppState>>) -> Json<SecurityConfigView> {
    let config = state.settings.get_security_config().await;
    Json(SecurityConfigView::from(&config))
}

/// PUT /v1/config/security
pub async fn update_security(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SecurityConfigPatch>,
) -> Result<Json<SecurityConfigView>, ApiError> {
    let config = patch.apply(state.settings.get_security_config().await);
    state.settings.update_security_config(&config).await?;
    Ok(Json(SecurityConfigView::from(
        &state.settings.get_security_config().await,
    )))
}

/// POST /v1/config/reload
pub async fn reload(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.settings.reload();
    Json(json!({"status": "reloaded"}))
}

/// DELETE /v1/cache
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearCacheResponse>, ApiError> {
    let removed = state.settings.clear_cache().await?;
    Ok(Json(ClearCacheResponse { removed }))
}

/// GET /v1/users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<AccountSummary>> {
    let users = state.settings.get_users().await;
    Json(users.iter().map(AccountSummary::from).collect())
}

/// POST /v1/users
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewAccountRequest>,
) -> Result<(StatusCode, Json<AccountSummary>), ApiError> {
    let account = DashboardAccount::new(body.username, body.secret, body.role);
    state.settings.add_user(&account).await?;
    Ok((StatusCode::CREATED, Json(AccountSummary::from(&account))))
}

/// DELETE /v1/users/:username
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.settings.delete_user(&username).await? {
        return Ok(StatusCode::NO_CONTENT);
    }
    if username == state.config.dashboard.admin_username {
        return Err(ApiError::forbidden(
            "The bootstrap admin account cannot be deleted",
        ));
    }
    Err(ApiError::not_found(&format!(
        "Account '{}' not found",
        username
    )))
}
