//! Settings loading from various sources

pub mod env;
pub mod file;
pub mod formats;
pub mod merge;

use crate::{Result, Settings, Validate};
use std::path::{Path, PathBuf};

/// Format for configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

/// Settings source for layered loading
#[derive(Debug, Clone)]
pub enum SettingsSource {
    File(PathBuf),
    Environment,
    /// Explicit settings object (for programmatic use)
    Explicit(Settings),
}

/// Builder for loading and merging settings
///
/// Precedence: defaults < file < environment < explicit overrides
///
/// ```no_run
/// use agentcfg_config::loader::SettingsBuilder;
///
/// let settings = SettingsBuilder::new()
///     .with_file(".agentcfg.toml")
///     .with_env()
///     .build()?;
/// # Ok::<(), agentcfg_config::ConfigError>(())
/// ```
pub struct SettingsBuilder {
    sources: Vec<SettingsSource>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.sources
            .push(SettingsSource::File(path.as_ref().to_path_buf()));
        self
    }

    pub fn with_env(mut self) -> Self {
        self.sources.push(SettingsSource::Environment);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.sources.push(SettingsSource::Explicit(settings));
        self
    }

    /// Merge all sources in order, later sources taking precedence, then validate
    pub fn build(self) -> Result<Settings> {
        let mut settings = Settings::default();

        for source in self.sources {
            match source {
                SettingsSource::File(path) => {
                    let file_settings = file::load_from_file(&path)?;
                    settings = merge::merge(settings, file_settings);
                }
                SettingsSource::Environment => {
                    if let Some(env_settings) = env::from_env()? {
                        settings = merge::merge(settings, env_settings);
                    }
                }
                SettingsSource::Explicit(explicit) => {
                    settings = merge::merge(settings, explicit);
                }
            }
        }

        settings.validate()?;
        Ok(settings)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// File names probed by `Settings::load`, in order
pub const DEFAULT_PATHS: [&str; 4] = [
    ".agentcfg.toml",
    ".agentcfg.yml",
    ".agentcfg.yaml",
    ".agentcfg.json",
];

impl Settings {
    /// Load settings from the first default location found, plus env overlay
    ///
    /// Falls back to defaults (plus env overlay) when no file exists.
    pub fn load() -> Result<Self> {
        let mut builder = SettingsBuilder::new();

        if let Some(path) = DEFAULT_PATHS.iter().find(|p| Path::new(p).exists()) {
            builder = builder.with_file(path);
        }

        builder.with_env().build()
    }

    /// Load settings from a specific file, plus env overlay
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        SettingsBuilder::new().with_file(path).with_env().build()
    }
}
