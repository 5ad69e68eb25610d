//! JSON format parser and serializer

use crate::{error::ConfigError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Parse a value from JSON string
pub fn parse<T: DeserializeOwned>(content: &str) -> Result<T> {
    parse_with_path(content, None)
}

/// Parse a value from JSON string with file path for better errors
pub fn parse_with_path<T: DeserializeOwned>(content: &str, path: Option<&str>) -> Result<T> {
    serde_json::from_str(content).map_err(|e| ConfigError::from_json_error(e, content, path))
}

/// Pretty-printed JSON
pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| ConfigError::SerializeError {
        format: "JSON".to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;

    #[test]
    fn test_parse_minimal_json() {
        let json = r#" {
            "validation": { "mode": "development" }
        }"#;
        let settings: Settings = parse(json).unwrap();
        assert_eq!(settings.validation.mode, crate::ValidationMode::Development);
    }
}
