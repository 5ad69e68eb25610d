//! File-based settings loading

use crate::{error::ConfigError, loader::ConfigFormat, Result, Settings, Validate};
use std::fs;
use std::path::Path;

/// Load settings from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let format = detect_format(path)?;

    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let path_str = path.to_str();

    let settings: Settings = match format {
        ConfigFormat::Yaml => super::formats::yaml::parse_with_path(&content, path_str)?,
        ConfigFormat::Toml => super::formats::toml::parse_with_path(&content, path_str)?,
        ConfigFormat::Json => super::formats::json::parse_with_path(&content, path_str)?,
    };

    settings.validate()?;

    Ok(settings)
}

/// Detect configuration format from file extension
pub fn detect_format(path: &Path) -> Result<ConfigFormat> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yml") | Some("yaml") => Ok(ConfigFormat::Yaml),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some("json") => Ok(ConfigFormat::Json),
        _ => Err(ConfigError::UnknownFormat {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_yaml() {
        assert_eq!(
            detect_format(&PathBuf::from("settings.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            detect_format(&PathBuf::from("settings.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
    }

    #[test]
    fn test_detect_toml_and_json() {
        assert_eq!(
            detect_format(&PathBuf::from("settings.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            detect_format(&PathBuf::from("settings.json")).unwrap(),
            ConfigFormat::Json
        );
    }

    #[test]
    fn test_unknown_format() {
        assert!(detect_format(&PathBuf::from("settings.txt")).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_file("/nonexistent/.agentcfg.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
