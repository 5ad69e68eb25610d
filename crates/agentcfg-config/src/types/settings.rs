//! Settings for the configuration compiler itself

use crate::error::{ConfigError, Result};
use crate::validation::validate_positive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level compiler settings
///
/// Layered as defaults < file < `AGENTCFG_*` environment overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub validation: ValidationSettings,

    #[serde(default)]
    pub optimization: OptimizationSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl crate::validation::Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// TTLs and bounds of the process-lifetime caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_config_ttl")]
    pub config_ttl_secs: u64,

    #[serde(default = "default_validation_ttl")]
    pub validation_ttl_secs: u64,

    #[serde(default = "default_optimization_ttl")]
    pub optimization_ttl_secs: u64,

    /// Upper bound on entries per cache; oldest entry is evicted on overflow
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Generation events retained per repository
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            config_ttl_secs: default_config_ttl(),
            validation_ttl_secs: default_validation_ttl(),
            optimization_ttl_secs: default_optimization_ttl(),
            max_entries: default_max_entries(),
            history_limit: default_history_limit(),
        }
    }
}

impl crate::validation::Validate for CacheSettings {
    fn validate(&self) -> Result<()> {
        validate_positive("cache.config_ttl_secs", self.config_ttl_secs, 0)?;
        validate_positive("cache.validation_ttl_secs", self.validation_ttl_secs, 0)?;
        validate_positive("cache.optimization_ttl_secs", self.optimization_ttl_secs, 0)?;
        validate_positive("cache.max_entries", self.max_entries as u64, 0)?;
        validate_positive("cache.history_limit", self.history_limit as u64, 0)?;
        Ok(())
    }
}

fn default_config_ttl() -> u64 {
    300
}

fn default_validation_ttl() -> u64 {
    60
}

fn default_optimization_ttl() -> u64 {
    600
}

fn default_max_entries() -> usize {
    1024
}

fn default_history_limit() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default)]
    pub mode: ValidationMode,

    #[serde(default = "default_true")]
    pub generate_fallback: bool,

    /// Accepted and recorded; all five stages always run
    #[serde(default)]
    pub abort_early: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            mode: ValidationMode::default(),
            generate_fallback: true,
            abort_early: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub mode: OptimizationMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<PerformanceProfile>,

    /// Also apply strategies that default to manual confirmation
    #[serde(default)]
    pub apply_manual: bool,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: OptimizationMode::default(),
            profile: None,
            apply_manual: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl crate::validation::Validate for LoggingSettings {
    fn validate(&self) -> Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_enum("logging.level", &self.level, &LEVELS));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Strictness of the schema validator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    Development,
    Staging,
    #[default]
    Production,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Development => "development",
            ValidationMode::Staging => "staging",
            ValidationMode::Production => "production",
        }
    }
}

impl FromStr for ValidationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(ValidationMode::Development),
            "staging" => Ok(ValidationMode::Staging),
            "production" | "prod" => Ok(ValidationMode::Production),
            _ => Err(ConfigError::invalid_enum(
                "validation.mode",
                s,
                &["development", "staging", "production"],
            )),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate that decides which optimization strategies apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    Aggressive,
    Conservative,
    #[default]
    Balanced,
    CostFocused,
    PerformanceFocused,
}

impl OptimizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationMode::Aggressive => "aggressive",
            OptimizationMode::Conservative => "conservative",
            OptimizationMode::Balanced => "balanced",
            OptimizationMode::CostFocused => "cost_focused",
            OptimizationMode::PerformanceFocused => "performance_focused",
        }
    }
}

impl FromStr for OptimizationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "aggressive" => Ok(OptimizationMode::Aggressive),
            "conservative" => Ok(OptimizationMode::Conservative),
            "balanced" => Ok(OptimizationMode::Balanced),
            "cost_focused" | "cost" => Ok(OptimizationMode::CostFocused),
            "performance_focused" | "performance" => Ok(OptimizationMode::PerformanceFocused),
            _ => Err(ConfigError::invalid_enum(
                "optimization.mode",
                s,
                &[
                    "aggressive",
                    "conservative",
                    "balanced",
                    "cost_focused",
                    "performance_focused",
                ],
            )),
        }
    }
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named ceiling set for model and loop budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceProfile {
    Fast,
    Balanced,
    Thorough,
}

/// Upper bounds a profile imposes on the optimized document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileCeilings {
    pub max_tokens: u32,
    pub timeout: u32,
    pub max_iterations: u32,
}

impl PerformanceProfile {
    pub fn ceilings(&self) -> ProfileCeilings {
        match self {
            PerformanceProfile::Fast => ProfileCeilings {
                max_tokens: 4096,
                timeout: 120,
                max_iterations: 20,
            },
            PerformanceProfile::Balanced => ProfileCeilings {
                max_tokens: 8192,
                timeout: 300,
                max_iterations: 50,
            },
            PerformanceProfile::Thorough => ProfileCeilings {
                max_tokens: 16384,
                timeout: 600,
                max_iterations: 100,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceProfile::Fast => "fast",
            PerformanceProfile::Balanced => "balanced",
            PerformanceProfile::Thorough => "thorough",
        }
    }
}

impl FromStr for PerformanceProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(PerformanceProfile::Fast),
            "balanced" => Ok(PerformanceProfile::Balanced),
            "thorough" => Ok(PerformanceProfile::Thorough),
            _ => Err(ConfigError::invalid_enum(
                "optimization.profile",
                s,
                &["fast", "balanced", "thorough"],
            )),
        }
    }
}

impl fmt::Display for PerformanceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Validate;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cache.config_ttl_secs, 300);
        assert_eq!(settings.cache.validation_ttl_secs, 60);
        assert_eq!(settings.cache.optimization_ttl_secs, 600);
        assert_eq!(settings.cache.history_limit, 100);
        assert_eq!(settings.validation.mode, ValidationMode::Production);
        assert_eq!(settings.optimization.mode, OptimizationMode::Balanced);
    }

    #[test]
    fn test_zero_ttl_invalid() {
        let mut settings = Settings::default();
        settings.cache.validation_ttl_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unknown_log_level_invalid() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "cost-focused".parse::<OptimizationMode>().unwrap(),
            OptimizationMode::CostFocused
        );
        assert_eq!("prod".parse::<ValidationMode>().unwrap(), ValidationMode::Production);
        assert!("fastest".parse::<PerformanceProfile>().is_err());
    }

    #[test]
    fn test_profile_ceilings_are_ordered() {
        let fast = PerformanceProfile::Fast.ceilings();
        let thorough = PerformanceProfile::Thorough.ceilings();
        assert!(fast.max_tokens < thorough.max_tokens);
        assert!(fast.timeout < thorough.timeout);
        assert!(fast.max_iterations < thorough.max_iterations);
    }
}
