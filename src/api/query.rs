//! Query dispatch endpoint.

use super::{ApiError, AppState, QueryRequest};
use crate::dispatch::{DispatchRequest, DispatchResult};
use crate::telemetry::RequestLogRecord;
use axum::{extract::State, Json};
use std::sync::Arc;

/// POST /v1/query - Dispatch downstream and log the outcome.
///
/// Downstream failures are reported in the result's `status`, not as HTTP errors.
/// The dispatch and its telemetry write run on their own task, so a dropped
/// connection still spends the full attempt budget, charges the breaker and
/// leaves a record.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<DispatchResult>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError::invalid_param("query", "query cannot be empty"));
    }

    let request = DispatchRequest::new(body.query, body.context);
    let dispatcher = Arc::clone(&state.dispatcher);
    let telemetry = state.telemetry.clone();

    let task = tokio::spawn(async move {
        let result = dispatcher.dispatch(&request).await;
        telemetry.spawn_log(RequestLogRecord::from_dispatch(&request, &result));
        result
    });

    match task.await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            Err(ApiError::internal("dispatch task failed"))
        }
    }
}
