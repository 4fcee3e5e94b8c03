//! Structured logging helpers
//!
//! Trace identifier generation, filter directives for `tracing-subscriber`, and
//! privacy-safe field helpers used when logging or persisting dispatches.

pub mod fields;

pub use fields::{redact_context, truncate_for_log};

use uuid::Uuid;

/// Generate a new trace identifier using UUID v4
///
/// Correlates one dispatch with its telemetry record.
///
/// # Examples
///
/// ```
/// use relay::logging::generate_trace_id;
///
/// let trace_id = generate_trace_id();
/// assert_eq!(trace_id.len(), 36);
/// ```
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
///
/// # Examples
///
/// ```
/// use relay::config::{LogFormat, LoggingConfig};
/// use relay::logging::build_filter_directives;
/// use std::collections::BTreeMap;
///
/// let mut component_levels = BTreeMap::new();
/// component_levels.insert("dispatch".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels,
/// };
///
/// let filter_str = build_filter_directives(&config);
/// assert_eq!(filter_str, "info,relay::dispatch=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    for (component, level) in &config.component_levels {
        filter_str.push_str(&format!(",relay::{}={}", component, level));
    }

    filter_str
}
