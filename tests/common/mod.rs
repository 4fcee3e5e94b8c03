//! Shared helpers for Relay integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use relay::api::{create_router, AppState};
use relay::config::RelayConfig;
use relay::store::StoreHandle;
use relay::telemetry::{RequestLogRecord, TelemetryAggregator};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// Config pointing at a mock downstream, with no retry delay.
pub fn config_for(server: &MockServer, max_retries: u32) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.mcp.endpoint = format!("{}/query", server.uri());
    config.mcp.timeout_ms = 2_000;
    config.mcp.max_retries = max_retries;
    config.mcp.retry_delay_ms = 0;
    config
}

/// Router and state over a fresh memory store.
pub fn make_app(config: RelayConfig) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Arc::new(config), StoreHandle::memory()));
    (create_router(Arc::clone(&state)), state)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Telemetry is written on a spawned task; poll until `count` records land.
pub async fn wait_for_records(
    telemetry: &TelemetryAggregator,
    count: usize,
) -> Vec<RequestLogRecord> {
    for _ in 0..300 {
        let records = telemetry.recent(count, None).await.unwrap();
        if records.len() >= count {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("telemetry records never appeared");
}

/// Wait until the current hour's bucket has folded in `total` dispatches.
pub async fn wait_for_hourly_total(telemetry: &TelemetryAggregator, total: u64) {
    for _ in 0..300 {
        let stats = telemetry.hourly_stats(1).await.unwrap();
        if stats[0].total >= total {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hourly bucket never reached {} requests", total);
}
