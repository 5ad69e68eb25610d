//! Environment to configuration mapping
//!
//! Maps a raw environment snapshot into a dot-path addressed tree using two fixed
//! tables (secrets copied verbatim, variables coerced by kind), resolves the model
//! provider, fills defaults and checks the secrets the chosen setup requires.
//! Problems are recorded on the result; mapping itself never fails.

pub mod keys;
pub mod tables;
pub mod value;

pub use keys::ApiKeyPool;
pub use tables::paths;
pub use value::{MappedConfig, MappedValue, ValueKind};

use crate::error::MappingError;
use crate::providers::{self, DetectionSource};
use agentcfg_config::Provider;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Immutable string snapshot of the process environment
///
/// Empty values are treated as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawEnvironment {
    vars: BTreeMap<String, String>,
}

impl RawEnvironment {
    pub fn from_process() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Copy with one variable set (or removed when `value` is empty)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.vars.remove(&name);
        } else {
            self.vars.insert(name, value);
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for RawEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEnvironment")
            .field("names", &self.vars.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Provenance of one mapping run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingMetadata {
    pub provider: Provider,
    pub detection: DetectionSource,
    pub model: String,
    pub required_secrets: Vec<String>,
    pub secrets_found: Vec<String>,
    pub variables_mapped: Vec<String>,
    pub defaults_applied: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingResult {
    pub config: MappedConfig,
    pub errors: Vec<MappingError>,
    pub warnings: Vec<String>,
    pub metadata: MappingMetadata,
    pub key_pool: ApiKeyPool,
}

impl MappingResult {
    pub fn provider(&self) -> Provider {
        self.metadata.provider
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn rotated_api_key(&self, provider: Provider, index: usize) -> Option<&str> {
        self.key_pool.rotated(provider, index)
    }
}

/// Stateless mapper over the fixed tables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentMapper;

impl EnvironmentMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn map_environment(&self, env: &RawEnvironment) -> MappingResult {
        let mut config = MappedConfig::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut secrets_found = Vec::new();
        for mapping in tables::SECRETS {
            if let Some(value) = env.get(mapping.env) {
                config.set(mapping.path, MappedValue::Text(value.to_string()));
                secrets_found.push(mapping.env.to_string());
            }
        }

        let mut variables_mapped = Vec::new();
        for mapping in tables::VARIABLES {
            let Some(raw) = env.get(mapping.env) else {
                continue;
            };
            match mapping.kind.accept(raw) {
                Some(value) => {
                    config.set(mapping.path, value);
                    variables_mapped.push(mapping.env.to_string());
                }
                None => {
                    warn!(var = mapping.env, "Ignoring value of unexpected type");
                    errors.push(MappingError::InvalidValue {
                        var: mapping.env.to_string(),
                        expected: mapping.kind.describe().to_string(),
                        value: raw.to_string(),
                    });
                }
            }
        }

        let explicit = match config.get_str(paths::MODEL_PROVIDER) {
            Some(raw) => match raw.parse::<Provider>() {
                Ok(provider) => Some(provider),
                Err(_) => {
                    errors.push(MappingError::UnknownProvider {
                        value: raw.to_string(),
                    });
                    None
                }
            },
            None => None,
        };

        let model_override = config.get_str(paths::MODEL_NAME).map(str::to_string);
        let (provider, detection) =
            providers::resolve_provider(explicit, model_override.as_deref(), env);
        let profile = providers::profile(provider);
        debug!(provider = %provider, ?detection, "Resolved model provider");

        config.set(paths::MODEL_PROVIDER, MappedValue::Text(provider.as_str().to_string()));
        if let Some(secret) = profile.primary_secret() {
            config.set(paths::API_KEY_ENV, MappedValue::Text(secret.to_string()));
        }

        let mut defaults_applied = Vec::new();
        let mut fill = |config: &mut MappedConfig, path: &'static str, value: MappedValue| {
            if !config.contains(path) {
                config.set(path, value);
                defaults_applied.push(path.to_string());
            }
        };
        fill(
            &mut config,
            paths::MODEL_NAME,
            MappedValue::Text(profile.default_model.to_string()),
        );
        for (path, value) in tables::defaults() {
            fill(&mut config, path, value);
        }
        let deployment = config
            .get_str(paths::DEPLOYMENT)
            .unwrap_or("docker")
            .to_lowercase();
        for (path, value) in tables::deployment_defaults(&deployment) {
            fill(&mut config, path, value);
        }

        let mut required_secrets = Vec::new();
        for name in profile.secrets {
            required_secrets.push(name.to_string());
            if !config.contains(&tables::secret_path(name)) {
                errors.push(MappingError::MissingSecret {
                    name: name.to_string(),
                    provider: provider.as_str().to_string(),
                });
            }
        }
        if deployment == "modal" {
            for name in tables::MODAL_SECRETS {
                required_secrets.push(name.to_string());
                if !config.contains(&tables::secret_path(name)) {
                    errors.push(MappingError::MissingDeploymentSecret {
                        name: name.to_string(),
                        deployment: deployment.clone(),
                    });
                }
            }
        }

        if let Some(name) = profile.primary_secret() {
            if let Some(key) = env.get(name) {
                if !providers::validate_api_key(provider, key) {
                    warnings.push(format!(
                        "{} does not match the expected {} key format",
                        name, provider
                    ));
                }
            }
        }

        for error in &errors {
            warn!("{}", error);
        }

        let model = config
            .get_str(paths::MODEL_NAME)
            .unwrap_or(profile.default_model)
            .to_string();

        MappingResult {
            key_pool: ApiKeyPool::scan(env),
            metadata: MappingMetadata {
                provider,
                detection,
                model,
                required_secrets,
                secrets_found,
                variables_mapped,
                defaults_applied,
            },
            config,
            errors,
            warnings,
        }
    }
}
