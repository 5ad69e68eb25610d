//! Environment variable settings overlay
//!
//! Supports environment variables in the format:
//! `AGENTCFG_<section>_<field>=value`
//!
//! Examples:
//! - `AGENTCFG_CACHE_CONFIG_TTL_SECS=120`
//! - `AGENTCFG_VALIDATION_MODE=staging`
//! - `AGENTCFG_OPTIMIZATION_PROFILE=fast`

use crate::{error::ConfigError, types::*, Result};
use std::env;
use tracing::warn;

const PREFIX: &str = "AGENTCFG_";

/// Parse settings from the process environment
pub fn from_env() -> Result<Option<Settings>> {
    from_vars(env::vars())
}

/// Parse settings from an explicit set of variables
///
/// Returns `None` when no `AGENTCFG_` variable is present. Variables that fail to
/// parse are logged as warnings and skipped, so one bad value does not discard the rest.
pub fn from_vars<I>(vars: I) -> Result<Option<Settings>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_vars: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(k, _)| k.starts_with(PREFIX))
        .collect();

    if env_vars.is_empty() {
        return Ok(None);
    }

    let mut settings = Settings::default();
    for (key, value) in env_vars {
        if let Err(e) = apply_env_var(&mut settings, &key, &value) {
            warn!(variable = %key, error = %e, "Ignoring unparsable settings variable");
        }
    }

    Ok(Some(settings))
}

/// Apply a single environment variable to settings
fn apply_env_var(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    let key = key.strip_prefix(PREFIX).unwrap_or(key);

    let parts: Vec<&str> = key.split('_').collect();
    if parts.len() < 2 {
        return Err(ConfigError::EnvVarError {
            var: key.to_string(),
            message: "Expected format: AGENTCFG_<section>_<field>".to_string(),
        });
    }

    let section = parts[0].to_lowercase();
    let field = parts[1..].join("_").to_lowercase();

    match section.as_str() {
        "cache" => apply_cache_var(&mut settings.cache, &field, value),
        "validation" => apply_validation_var(&mut settings.validation, &field, value),
        "optimization" => apply_optimization_var(&mut settings.optimization, &field, value),
        "logging" => apply_logging_var(&mut settings.logging, &field, value),
        _ => Err(ConfigError::EnvVarError {
            var: key.to_string(),
            message: format!("Unknown section: {}", section),
        }),
    }
}

fn apply_cache_var(config: &mut CacheSettings, field: &str, value: &str) -> Result<()> {
    let parse_int = |v: &str| -> Result<u64> {
        v.parse().map_err(|_| ConfigError::EnvVarError {
            var: format!("AGENTCFG_CACHE_{}", field.to_uppercase()),
            message: format!("Invalid integer: {}", v),
        })
    };

    match field {
        "config_ttl_secs" => config.config_ttl_secs = parse_int(value)?,
        "validation_ttl_secs" => config.validation_ttl_secs = parse_int(value)?,
        "optimization_ttl_secs" => config.optimization_ttl_secs = parse_int(value)?,
        "max_entries" => config.max_entries = parse_int(value)? as usize,
        "history_limit" => config.history_limit = parse_int(value)? as usize,
        _ => return Err(unknown_field("CACHE", field)),
    }
    Ok(())
}

fn apply_validation_var(config: &mut ValidationSettings, field: &str, value: &str) -> Result<()> {
    match field {
        "mode" => config.mode = value.parse()?,
        "generate_fallback" => config.generate_fallback = parse_bool(value)?,
        "abort_early" => config.abort_early = parse_bool(value)?,
        _ => return Err(unknown_field("VALIDATION", field)),
    }
    Ok(())
}

fn apply_optimization_var(
    config: &mut OptimizationSettings,
    field: &str,
    value: &str,
) -> Result<()> {
    match field {
        "enabled" => config.enabled = parse_bool(value)?,
        "mode" => config.mode = value.parse()?,
        "profile" => config.profile = Some(value.parse()?),
        "apply_manual" => config.apply_manual = parse_bool(value)?,
        _ => return Err(unknown_field("OPTIMIZATION", field)),
    }
    Ok(())
}

fn apply_logging_var(config: &mut LoggingSettings, field: &str, value: &str) -> Result<()> {
    match field {
        "level" => config.level = value.to_lowercase(),
        _ => return Err(unknown_field("LOGGING", field)),
    }
    Ok(())
}

fn unknown_field(section: &str, field: &str) -> ConfigError {
    ConfigError::EnvVarError {
        var: format!("{}{}_{}", PREFIX, section, field.to_uppercase()),
        message: format!("Unknown field: {}", field),
    }
}

pub(crate) fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::EnvVarError {
            var: value.to_string(),
            message: format!(
                "Invalid boolean: {} (use true/false, 1/0, yes/no, on/off)",
                value
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes tests that touch the real process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_cache_ttl_env() {
        let settings = from_vars(vars(&[("AGENTCFG_CACHE_CONFIG_TTL_SECS", "120")]))
            .unwrap()
            .unwrap();
        assert_eq!(settings.cache.config_ttl_secs, 120);
    }

    #[test]
    fn test_modes_env() {
        let settings = from_vars(vars(&[
            ("AGENTCFG_VALIDATION_MODE", "staging"),
            ("AGENTCFG_OPTIMIZATION_MODE", "aggressive"),
            ("AGENTCFG_OPTIMIZATION_PROFILE", "fast"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(settings.validation.mode, ValidationMode::Staging);
        assert_eq!(settings.optimization.mode, OptimizationMode::Aggressive);
        assert_eq!(settings.optimization.profile, Some(PerformanceProfile::Fast));
    }

    #[test]
    fn test_bad_value_is_skipped() {
        let settings = from_vars(vars(&[
            ("AGENTCFG_CACHE_HISTORY_LIMIT", "many"),
            ("AGENTCFG_LOGGING_LEVEL", "DEBUG"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(settings.cache.history_limit, 100);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_bad_value_is_logged() {
        use std::io;
        use std::sync::Arc;

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            from_vars(vars(&[("AGENTCFG_CACHE_HISTORY_LIMIT", "many")])).unwrap();
        });

        let logged = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("WARN"), "{}", logged);
        assert!(logged.contains("AGENTCFG_CACHE_HISTORY_LIMIT"), "{}", logged);
    }

    #[test]
    fn test_unrelated_vars_ignored() {
        assert!(from_vars(vars(&[("PATH", "/usr/bin")])).unwrap().is_none());
    }

    #[test]
    fn test_bool_parsing() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("on").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_process_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::set_var("AGENTCFG_OPTIMIZATION_ENABLED", "false");
        let settings = from_env().unwrap().unwrap();
        assert!(!settings.optimization.enabled);
        env::remove_var("AGENTCFG_OPTIMIZATION_ENABLED");
    }
}
