//! # HTTP API
//!
//! Axum surface over the dispatch core.
//!
//! ## Endpoints
//!
//! - `POST /v1/query` - Dispatch a query downstream; always 200, outcome in `status`
//! - `GET /health` - Gateway, downstream, breaker and store health
//! - `GET /metrics` - Prometheus text format
//! - `GET /v1/telemetry/recent` - Most recent request records
//! - `GET /v1/telemetry/requests/:trace_id` - One request record
//! - `GET /v1/telemetry/hourly` - Hourly rollups with percentiles
//! - `GET|PUT /v1/config/{mcp,cache,security}` - Live configuration
//! - `POST /v1/config/reload`, `DELETE /v1/cache`
//! - `GET|POST /v1/users`, `DELETE /v1/users/:username` - Dashboard accounts
//!
//! ## Example
//!
//! ```no_run
//! use relay::api::{create_router, AppState};
//! use relay::config::RelayConfig;
//! use relay::store::StoreHandle;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(RelayConfig::default());
//! let store = StoreHandle::connect(&config.store).await;
//!
//! let state = Arc::new(AppState::new(config, store));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8090").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Errors use a single envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "invalid value for 'endpoint': cannot be empty",
//!     "type": "invalid_request_error",
//!     "param": "endpoint",
//!     "code": "invalid_request_error"
//!   }
//! }
//! ```

mod admin;
mod health;
mod query;
mod telemetry;
pub mod types;

pub use types::*;

use crate::config::RelayConfig;
use crate::dispatch::{CircuitBreaker, DispatchClient};
use crate::dynamic::DynamicConfigManager;
use crate::metrics::MetricsCollector;
use crate::store::StoreHandle;
use crate::telemetry::TelemetryAggregator;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub store: StoreHandle,
    /// Live MCP/cache/security settings and dashboard accounts
    pub settings: Arc<DynamicConfigManager>,
    pub dispatcher: Arc<DispatchClient>,
    pub telemetry: TelemetryAggregator,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    /// Metrics collector for observability
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    /// Wire the dispatch core over an already-connected store.
    pub fn new(config: Arc<RelayConfig>, store: StoreHandle) -> Self {
        let start_time = Instant::now();

        let settings = Arc::new(DynamicConfigManager::from_config(store.clone(), &config));
        let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));
        let dispatcher = Arc::new(DispatchClient::new(Arc::clone(&settings), breaker));
        let telemetry = TelemetryAggregator::new(store.clone());

        // Safe to call repeatedly; later calls get a detached handle
        let prometheus_handle = crate::metrics::setup_metrics_or_detached();
        let metrics_collector = Arc::new(MetricsCollector::new(start_time, prometheus_handle));

        Self {
            config,
            store,
            settings,
            dispatcher,
            telemetry,
            start_time,
            metrics_collector,
        }
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.server.max_body_bytes;
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    // Bounded by the dispatch attempt budget rather than the request timeout
    let dispatch_routes = Router::new().route("/v1/query", post(query::handle));

    let bounded_routes = Router::new()
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .route("/v1/telemetry/recent", get(telemetry::recent))
        .route("/v1/telemetry/requests/:trace_id", get(telemetry::by_trace_id))
        .route("/v1/telemetry/hourly", get(telemetry::hourly))
        .route(
            "/v1/config/mcp",
            get(admin::get_mcp).put(admin::update_mcp),
        )
        .route(
            "/v1/config/cache",
            get(admin::get_cache).put(admin::update_cache),
        )
        .route(
            "/v1/config/security",
            get(admin::get_security).put(admin::update_security),
        )
        .route("/v1/config/reload", post(admin::reload))
        .route("/v1/cache", delete(admin::clear_cache))
        .route("/v1/users", get(admin::list_users).post(admin::add_user))
        .route("/v1/users/:username", delete(admin::delete_user))
        .layer(TimeoutLayer::new(request_timeout));

    dispatch_routes
        .merge(bounded_routes)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
