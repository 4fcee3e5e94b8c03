//! Logging section: verbosity, output format and per-component overrides

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// Subscriber output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(format!("unknown log format '{}', expected pretty or json", s))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level for every target
    pub level: String,
    pub format: LogFormat,
    /// Level per crate module, e.g. `dispatch = "debug"` becomes `relay::dispatch=debug`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub component_levels: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Check the base and component levels parse as tracing level filters.
    ///
    /// Returns the offending field path on failure.
    pub fn check_levels(&self) -> Result<(), (String, String)> {
        parse_level(&self.level).map_err(|m| ("logging.level".to_string(), m))?;
        for (component, level) in &self.component_levels {
            parse_level(level)
                .map_err(|m| (format!("logging.component_levels.{}", component), m))?;
        }
        Ok(())
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| format!("unknown log level '{}'", level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_levels_from_toml_table() {
        let config: LoggingConfig = toml::from_str(
            r#"
            format = "json"
            [component_levels]
            telemetry = "warn"
            dispatch = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        let components: Vec<&str> = config.component_levels.keys().map(String::as_str).collect();
        assert_eq!(components, vec!["dispatch", "telemetry"]);
    }

    #[test]
    fn test_log_format_parses_env_spellings() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Json.to_string(), "json");
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("pretty or json"));
    }

    #[test]
    fn test_check_levels_names_bad_component() {
        let mut config = LoggingConfig::default();
        assert!(config.check_levels().is_ok());

        config
            .component_levels
            .insert("dispatch".to_string(), "chatty".to_string());
        let (field, message) = config.check_levels().unwrap_err();
        assert_eq!(field, "logging.component_levels.dispatch");
        assert!(message.contains("chatty"));
    }
}
