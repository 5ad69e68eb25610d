//! YAML format parser and serializer
//!
//! YAML is the handoff format of the agent configuration document, so serialization
//! lives here next to parsing.

use crate::{error::ConfigError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Parse a value from YAML string
pub fn parse<T: DeserializeOwned>(content: &str) -> Result<T> {
    parse_with_path(content, None)
}

/// Parse a value from YAML string with file path for better errors
pub fn parse_with_path<T: DeserializeOwned>(content: &str, path: Option<&str>) -> Result<T> {
    serde_yaml::from_str(content).map_err(|e| ConfigError::from_yaml_error(e, content, path))
}

/// Serialize a value to YAML
pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| ConfigError::SerializeError {
        format: "YAML".to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;

    #[test]
    fn test_parse_empty_yaml_uses_defaults() {
        let settings: Settings = parse("{}").unwrap();
        assert_eq!(settings.cache.config_ttl_secs, 300);
    }

    #[test]
    fn test_parse_invalid_yaml_shows_line() {
        let yaml = r#"
validation:
  mode: invalid_mode
"#;
        let err = parse::<Settings>(yaml).unwrap_err();
        assert!(err.to_string().contains("line"));
    }

    #[test]
    fn test_settings_round_trip() {
        let mut settings = Settings::default();
        settings.cache.history_limit = 10;
        let text = to_string(&settings).unwrap();
        let back: Settings = parse(&text).unwrap();
        assert_eq!(back, settings);
    }
}
