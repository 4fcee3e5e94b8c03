//! Error types for durable store access.

use thiserror::Error;

/// Errors raised by a [`KvStore`](super::KvStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend rejected the command or the connection failed
    #[error("store backend error: {0}")]
    Backend(String),

    /// Connecting to the backend did not finish in time
    #[error("store connection timed out after {0}s")]
    Timeout(u64),

    /// Key holds a value of another type
    #[error("wrong value type at key '{0}'")]
    WrongType(String),

    /// Stored value could not be decoded
    #[error("invalid value at key '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// URL scheme is not a supported backend
    #[error("unsupported store URL: {0}")]
    UnsupportedUrl(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}
