//! Error types for downstream attempts.

use thiserror::Error;

/// Why a single outbound attempt failed. Every variant is retryable.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Attempt exceeded its per-call timeout
    #[error("request timeout after {0}ms")]
    Timeout(u64),

    /// Connection-level failure (DNS, refused, reset)
    #[error("connection failed: {0}")]
    Network(String),

    /// Downstream answered with a non-2xx status
    #[error("downstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// 2xx response whose body is not `{response, confidence}`
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl DispatchError {
    /// Classify a reqwest error raised while sending or reading a response.
    pub fn from_reqwest(e: reqwest::Error, timeout_ms: u64) -> Self {
        if e.is_timeout() {
            DispatchError::Timeout(timeout_ms)
        } else if e.is_decode() {
            DispatchError::InvalidResponse(e.to_string())
        } else {
            DispatchError::Network(e.to_string())
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Timeout(_) => "timeout",
            DispatchError::Network(_) => "network",
            DispatchError::Upstream { .. } => "upstream",
            DispatchError::InvalidResponse(_) => "invalid_response",
        }
    }
}
