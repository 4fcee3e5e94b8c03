//! # Metrics Collection Module
//!
//! Prometheus export for the dispatch core.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `relay_dispatch_total{status}` - Completed dispatches by outcome
//! - `relay_dispatch_retries_total` - Retries performed across all dispatches
//! - `relay_dispatch_attempt_errors_total{kind}` - Failed attempts by error kind
//! - `relay_circuit_rejections_total` - Dispatches short-circuited by an open breaker
//! - `relay_telemetry_write_errors_total` - Telemetry records that could not be persisted
//!
//! **Histograms:**
//! - `relay_dispatch_latency_seconds` - Latency of successful dispatches, retries included
//!
//! **Gauges:**
//! - `relay_circuit_open` - 1 while the breaker is open
//! - `relay_uptime_seconds` - Seconds since startup

pub mod handler;

// Re-export PrometheusBuilder for test compatibility
pub use metrics_exporter_prometheus::PrometheusBuilder;

use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Instant;

/// Owns the Prometheus handle and process start time.
pub struct MetricsCollector {
    start_time: Instant,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(start_time: Instant, prometheus_handle: PrometheusHandle) -> Self {
        Self {
            start_time,
            prometheus_handle,
        }
    }

    /// Get uptime in seconds since gateway startup.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Refresh derived gauges and render Prometheus text format.
    pub fn render_metrics(&self) -> String {
        metrics::gauge!("relay_uptime_seconds").set(self.uptime_seconds() as f64);
        self.prometheus_handle.render()
    }
}

/// Initialize Prometheus metrics exporter with custom histogram buckets.
///
/// Buckets span fast answers through the slowest retry budgets:
/// [0.05, 0.1, 0.25, 0.5, 1, 2.5, 5, 10, 30, 60, 120] seconds.
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let latency_buckets = &[
        0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("relay_dispatch_latency_seconds".to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Install the global recorder, or build a detached handle when one is
/// already installed (tests create many routers per process).
pub fn setup_metrics_or_detached() -> PrometheusHandle {
    setup_metrics().unwrap_or_else(|e| {
        tracing::debug!("Metrics already initialized, creating new handle: {}", e);
        PrometheusBuilder::new().build_recorder().handle()
    })
}
