//! Field helpers for structured logging and persisted records

use serde_json::{Map, Value};

/// Context keys whose values never leave the process.
const SECRET_MARKERS: &[&str] = &["secret", "token", "password", "key", "credential"];

/// Truncate a string for a log line, appending `...` when cut.
///
/// Cuts on a character boundary, so multi-byte text is safe.
///
/// # Examples
///
/// ```
/// use relay::logging::truncate_for_log;
///
/// assert_eq!(truncate_for_log("short", 10), "short");
/// assert_eq!(truncate_for_log("héllo world", 5), "héllo...");
/// ```
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}...", &s[..cut]),
    }
}

/// Copy of a request context with secret-looking values masked.
///
/// Nested objects are redacted recursively; a key is secret when its
/// lowercase name contains a marker such as `token` or `secret`.
pub fn redact_context(context: &Map<String, Value>) -> Map<String, Value> {
    context
        .iter()
        .map(|(k, v)| {
            let lower = k.to_lowercase();
            let value = if SECRET_MARKERS.iter().any(|m| lower.contains(m)) {
                Value::String("[redacted]".to_string())
            } else if let Value::Object(inner) = v {
                Value::Object(redact_context(inner))
            } else {
                v.clone()
            };
            (k.clone(), value)
        })
        .collect()
}
