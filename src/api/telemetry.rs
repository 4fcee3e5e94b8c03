//! Telemetry read endpoints.

use super::{ApiError, AppState, HourlyParams, RecentParams};
use crate::dispatch::DispatchStatus;
use crate::telemetry::{HourlyStats, RequestLogRecord};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

const DEFAULT_RECENT_LIMIT: usize = 50;
const MAX_RECENT_LIMIT: usize = 1_000;
const DEFAULT_HOURS: u32 = 24;
const MAX_HOURS: u32 = 720;

/// GET /v1/telemetry/recent?limit=&status=
pub async fn recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<RequestLogRecord>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(MAX_RECENT_LIMIT);
    let status = params
        .status
        .as_deref()
        .map(str::parse::<DispatchStatus>)
        .transpose()
        .map_err(|e| ApiError::invalid_param("status", &e))?;

    let records = state.telemetry.recent(limit, status).await?;
    Ok(Json(records))
}

/// GET /v1/telemetry/requests/:trace_id
pub async fn by_trace_id(
    State(state): State<Arc<AppState>>,
    Path(trace_id): Path<String>,
) -> Result<Json<RequestLogRecord>, ApiError> {
    state
        .telemetry
        .by_trace_id(&trace_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(&format!("Trace '{}' not found", trace_id)))
}

/// GET /v1/telemetry/hourly?hours=
///
/// `hours` defaults to 24 and is clamped to `1..=720`.
pub async fn hourly(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HourlyParams>,
) -> Result<Json<Vec<HourlyStats>>, ApiError> {
    let hours = params.hours.unwrap_or(DEFAULT_HOURS).clamp(1, MAX_HOURS);
    let stats = state.telemetry.hourly_stats(hours).await?;
    Ok(Json(stats))
}
