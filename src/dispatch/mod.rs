//! Dispatch client for the downstream answer service.
//!
//! Every dispatch reads live MCP settings, passes the circuit breaker, and
//! runs a bounded retry loop. Callers always get a [`DispatchResult`]; failures
//! are folded into `status: error` with a fallback message.

mod breaker;
mod config;
mod error;
mod types;

#[cfg(test)]
mod tests;

pub use breaker::{Admission, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use config::CircuitBreakerConfig;
pub use error::DispatchError;
pub use types::{
    classify_latency, classify_latency_against, DispatchRequest, DispatchResult, DispatchStatus,
    CIRCUIT_OPEN_MESSAGE, DEGRADED_LATENCY_MS, EXHAUSTED_MESSAGE,
};

use crate::config::McpConfig;
use crate::dynamic::DynamicConfigManager;
use crate::logging::truncate_for_log;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use types::{DownstreamResponse, QueryPayload};

/// Timeout for the liveness probe.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Forwards queries downstream with circuit breaking and bounded retry.
pub struct DispatchClient {
    /// HTTP client with connection pooling
    client: reqwest::Client,
    /// Source of live MCP settings, read before every dispatch
    settings: Arc<DynamicConfigManager>,
    /// Breaker shared by every dispatch through this client
    breaker: Arc<CircuitBreaker>,
    /// Successes slower than this are reported as degraded
    degraded_after_ms: u64,
}

impl DispatchClient {
    /// Create a dispatch client with a default HTTP client.
    pub fn new(settings: Arc<DynamicConfigManager>, breaker: Arc<CircuitBreaker>) -> Self {
        Self::with_client(settings, breaker, reqwest::Client::new())
    }

    /// Create a dispatch client with a custom HTTP client.
    pub fn with_client(
        settings: Arc<DynamicConfigManager>,
        breaker: Arc<CircuitBreaker>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            settings,
            breaker,
            degraded_after_ms: DEGRADED_LATENCY_MS,
        }
    }

    /// Override the degraded-latency threshold.
    pub fn with_degraded_threshold(mut self, degraded_after: Duration) -> Self {
        self.degraded_after_ms = degraded_after.as_millis() as u64;
        self
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Forward one query. Never fails; see [`DispatchResult`].
    pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult {
        if let Admission::Rejected { retry_after } = self.breaker.admit() {
            debug!(
                trace_id = %request.trace_id,
                retry_after_seconds = retry_after.as_secs(),
                "Circuit open, rejecting dispatch"
            );
            metrics::counter!("relay_circuit_rejections_total").increment(1);
            let result = DispatchResult::circuit_open(&request.trace_id);
            record_metrics(&result);
            return result;
        }

        let mcp = self.settings.get_mcp_config().await;
        let payload = QueryPayload {
            query: &request.query,
            context: outbound_context(&request.context, &mcp),
        };

        let start = Instant::now();
        let mut retry_count: u32 = 0;
        let mut last_error: Option<DispatchError> = None;

        for attempt in 0..=mcp.max_retries {
            match self.attempt(&mcp, &payload).await {
                Ok(body) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    self.breaker.record_success();

                    let status = classify_latency_against(latency_ms, self.degraded_after_ms);
                    info!(
                        trace_id = %request.trace_id,
                        attempt,
                        latency_ms,
                        retry_count,
                        status = %status,
                        "Dispatch succeeded"
                    );

                    let result = DispatchResult {
                        trace_id: request.trace_id.clone(),
                        response: body.response,
                        status,
                        latency_ms,
                        retry_count,
                        confidence: body.confidence,
                        error: None,
                    };
                    record_metrics(&result);
                    return result;
                }
                Err(e) => {
                    warn!(
                        trace_id = %request.trace_id,
                        attempt,
                        max_retries = mcp.max_retries,
                        error = %e,
                        "Downstream attempt failed"
                    );
                    metrics::counter!("relay_dispatch_attempt_errors_total",
                        "kind" => e.kind()
                    )
                    .increment(1);
                    last_error = Some(e);

                    if attempt < mcp.max_retries {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_millis(mcp.retry_delay_ms)).await;
                    }
                }
            }
        }

        self.breaker.record_failure();
        warn!(
            trace_id = %request.trace_id,
            retry_count,
            "Dispatch failed after exhausting retries"
        );

        let result = DispatchResult::exhausted(
            &request.trace_id,
            retry_count,
            last_error.map(|e| e.to_string()),
        );
        record_metrics(&result);
        result
    }

    /// One outbound call with the per-attempt timeout.
    async fn attempt(
        &self,
        mcp: &McpConfig,
        payload: &QueryPayload<'_>,
    ) -> Result<DownstreamResponse, DispatchError> {
        let mut req = self
            .client
            .post(&mcp.endpoint)
            .timeout(Duration::from_millis(mcp.timeout_ms))
            .json(payload);

        if let Some(token) = mcp.auth_token() {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, mcp.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Upstream {
                status: status.as_u16(),
                message: truncate_for_log(&body, 200),
            });
        }

        response
            .json::<DownstreamResponse>()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, mcp.timeout_ms))
    }

    /// GET the derived `/health` endpoint. Does not touch the breaker.
    pub async fn health_probe(&self) -> bool {
        let mcp = self.settings.get_mcp_config().await;
        let Some(url) = health_endpoint(&mcp.endpoint) else {
            warn!(endpoint = %mcp.endpoint, "Cannot derive health endpoint");
            return false;
        };

        match self
            .client
            .get(&url)
            .timeout(HEALTH_PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "Health probe failed");
                false
            }
        }
    }
}

/// Derive the liveness URL (`/health` on the same origin) from the query endpoint.
pub fn health_endpoint(endpoint: &str) -> Option<String> {
    let mut url = reqwest::Url::parse(endpoint).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    url.set_path("/health");
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// Configured credentials overlaid with the caller's context; caller keys win.
fn outbound_context(request_context: &Map<String, Value>, mcp: &McpConfig) -> Map<String, Value> {
    let mut context = Map::new();

    if let Some(idp) = &mcp.identity_provider {
        if let Ok(value) = serde_json::to_value(idp) {
            context.insert("identity_provider".to_string(), value);
        }
    }
    if let Some(key) = mcp.ai_service_key() {
        context.insert("ai_service_key".to_string(), Value::String(key.to_string()));
    }

    for (k, v) in request_context {
        context.insert(k.clone(), v.clone());
    }
    context
}

fn record_metrics(result: &DispatchResult) {
    metrics::counter!("relay_dispatch_total", "status" => result.status.as_str()).increment(1);
    metrics::counter!("relay_dispatch_retries_total").increment(result.retry_count as u64);
    if result.status.is_success() {
        metrics::histogram!("relay_dispatch_latency_seconds")
            .record(result.latency_ms as f64 / 1000.0);
    }
}
