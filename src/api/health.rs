//! Health check endpoint handler.

use crate::api::AppState;
use crate::dispatch::{BreakerSnapshot, CircuitState};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`; the gateway itself is up if it answers
    pub status: String,
    pub uptime_seconds: u64,
    pub downstream: DownstreamHealth,
    pub circuit_breaker: BreakerSnapshot,
    pub store: StoreHealth,
}

#[derive(Debug, Serialize)]
pub struct DownstreamHealth {
    pub endpoint: String,
    pub reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub enabled: bool,
}

/// GET /health - Probe downstream and report breaker and store state.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let endpoint = state.settings.get_mcp_config().await.endpoint;
    let reachable = state.dispatcher.health_probe().await;
    let breaker = state.dispatcher.breaker().snapshot();

    let status = if reachable && breaker.state == CircuitState::Closed {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        downstream: DownstreamHealth {
            endpoint,
            reachable,
        },
        circuit_breaker: breaker,
        store: StoreHealth {
            enabled: state.store.is_enabled(),
        },
    })
}
