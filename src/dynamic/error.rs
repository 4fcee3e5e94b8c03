//! Error types for administrator writes.

use crate::store::StoreError;
use thiserror::Error;

/// Errors returned by dynamic configuration writes.
///
/// Reads never fail; they fall back to static defaults instead.
#[derive(Debug, Error)]
pub enum DynamicConfigError {
    /// No durable store is configured or reachable
    #[error("durable store is not available")]
    StoreUnavailable,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },

    #[error("account already exists: {0}")]
    DuplicateUser(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DynamicConfigError {
    pub(crate) fn invalid(field: &str, message: &str) -> Self {
        DynamicConfigError::Invalid {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
