//! Request and result values exchanged with the dispatch client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Successful responses slower than this are reported as [`DispatchStatus::Degraded`].
pub const DEGRADED_LATENCY_MS: u64 = 5_000;

/// Fallback text when the circuit is open.
pub const CIRCUIT_OPEN_MESSAGE: &str =
    "The service is temporarily unavailable. Please try again in a few minutes.";

/// Fallback text when every attempt failed.
pub const EXHAUSTED_MESSAGE: &str =
    "Sorry, we could not process your request right now. Please try again later.";

/// One query to forward downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub trace_id: String,
    pub query: String,
    /// Caller-supplied metadata merged into the outbound `context`
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl DispatchRequest {
    /// Build a request with a freshly generated trace identifier.
    pub fn new(query: impl Into<String>, context: Map<String, Value>) -> Self {
        Self {
            trace_id: crate::logging::generate_trace_id(),
            query: query.into(),
            context,
        }
    }

    /// Build a request with no context.
    pub fn from_query(query: impl Into<String>) -> Self {
        Self::new(query, Map::new())
    }
}

/// Outcome class of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Ok,
    /// Correct answer, but slower than [`DEGRADED_LATENCY_MS`]
    Degraded,
    Error,
}

impl DispatchStatus {
    /// `ok` and `degraded` both count as success in telemetry rollups.
    pub fn is_success(self) -> bool {
        !matches!(self, DispatchStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DispatchStatus::Ok => "ok",
            DispatchStatus::Degraded => "degraded",
            DispatchStatus::Error => "error",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(DispatchStatus::Ok),
            "degraded" => Ok(DispatchStatus::Degraded),
            "error" => Ok(DispatchStatus::Error),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// Classify a successful response by its latency.
pub fn classify_latency(latency_ms: u64) -> DispatchStatus {
    classify_latency_against(latency_ms, DEGRADED_LATENCY_MS)
}

/// Classify against an explicit degraded threshold.
pub fn classify_latency_against(latency_ms: u64, degraded_after_ms: u64) -> DispatchStatus {
    if latency_ms > degraded_after_ms {
        DispatchStatus::Degraded
    } else {
        DispatchStatus::Ok
    }
}

/// Result of one dispatch; produced exactly once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub trace_id: String,
    /// Downstream answer, or a fallback message on error
    pub response: String,
    pub status: DispatchStatus,
    /// Zero on error
    pub latency_ms: u64,
    /// Attempts made after the first one
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    /// Rejection without any network attempt.
    pub fn circuit_open(trace_id: &str) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            response: CIRCUIT_OPEN_MESSAGE.to_string(),
            status: DispatchStatus::Error,
            latency_ms: 0,
            retry_count: 0,
            confidence: None,
            error: Some("circuit breaker open".to_string()),
        }
    }

    /// Every attempt in the retry budget failed.
    pub fn exhausted(trace_id: &str, retry_count: u32, error: Option<String>) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            response: EXHAUSTED_MESSAGE.to_string(),
            status: DispatchStatus::Error,
            latency_ms: 0,
            retry_count,
            confidence: None,
            error,
        }
    }
}

/// Body sent to the downstream service.
#[derive(Debug, Serialize)]
pub(crate) struct QueryPayload<'a> {
    pub query: &'a str,
    pub context: Map<String, Value>,
}

/// Body expected back from the downstream service.
#[derive(Debug, Deserialize)]
pub(crate) struct DownstreamResponse {
    pub response: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}
