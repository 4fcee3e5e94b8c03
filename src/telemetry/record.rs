//! Durable per-dispatch log record.

use crate::dispatch::{DispatchRequest, DispatchResult, DispatchStatus};
use crate::logging::{redact_context, truncate_for_log};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Characters of the query kept in a record.
const QUERY_PREVIEW_CHARS: usize = 100;

/// One completed dispatch, written once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogRecord {
    pub trace_id: String,
    /// Completion time; also selects the hourly bucket
    pub timestamp: DateTime<Utc>,
    pub status: DispatchStatus,
    pub latency_ms: u64,
    pub retry_count: u32,
    /// Caller context with secret-looking values masked
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestLogRecord {
    /// Build the record for a finished dispatch, stamped now.
    pub fn from_dispatch(request: &DispatchRequest, result: &DispatchResult) -> Self {
        Self {
            trace_id: result.trace_id.clone(),
            timestamp: Utc::now(),
            status: result.status,
            latency_ms: result.latency_ms,
            retry_count: result.retry_count,
            context: redact_context(&request.context),
            query_preview: Some(truncate_for_log(&request.query, QUERY_PREVIEW_CHARS)),
            error: result.error.clone(),
        }
    }
}
