//! Relay - resilient dispatch core for a query-forwarding gateway.
//!
//! Incoming queries are forwarded to a downstream answering service through a
//! [`dispatch::DispatchClient`] guarded by a circuit breaker and bounded
//! retries. Every completed dispatch is recorded by the
//! [`telemetry::TelemetryAggregator`], and downstream settings are read live
//! through the [`dynamic::DynamicConfigManager`], falling back to static
//! defaults field by field.

pub mod api;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod dynamic;
pub mod logging;
pub mod metrics;
pub mod store;
pub mod telemetry;
