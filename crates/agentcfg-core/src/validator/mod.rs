//! Five-stage configuration validation
//!
//! Stages run in a fixed order (structural, cross-component, environment, security,
//! performance) and every stage always runs, so a result carries the complete picture.
//! When the document is invalid and fallback generation is requested, a conservative
//! replacement document is attached to the result.

pub mod cross_component;
pub mod environment;
pub mod fallback;
pub mod performance;
pub mod security;
pub mod structural;

use crate::cache::{hash_parts, CachePolicy, TtlCache};
use agentcfg_config::loader::formats::yaml;
use agentcfg_config::{AgentConfiguration, ConfigError, ProblemStatement, ValidationMode};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default lifetime of cached validation outcomes
pub const VALIDATION_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Schema,
    CrossComponent,
    Environment,
    Security,
    Performance,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Schema => "schema",
            IssueCategory::CrossComponent => "cross_component",
            IssueCategory::Environment => "environment",
            IssueCategory::Security => "security",
            IssueCategory::Performance => "performance",
        }
    }
}

/// One finding, addressed by the dot-path of the offending field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub category: IssueCategory,
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category.as_str(), self.path, self.message)
    }
}

/// Runtime risk detected from resource figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bottleneck {
    /// History window close to the output budget
    ContextOverflow,
    LowMemory,
    /// `timeout * max_iterations` well past an hour
    TimeoutRisk,
}

/// Findings accumulated across stages
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub bottlenecks: Vec<Bottleneck>,
}

impl StageReport {
    pub fn error(&mut self, category: IssueCategory, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            category,
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn warn(&mut self, category: IssueCategory, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            category,
            path: path.into(),
            message: message.into(),
        });
    }

    /// Error in production, warning in the more permissive modes
    pub fn strict(
        &mut self,
        mode: ValidationMode,
        category: IssueCategory,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        if mode == ValidationMode::Production {
            self.error(category, path, message);
        } else {
            self.warn(category, path, message);
        }
    }

    pub fn flag(&mut self, bottleneck: Bottleneck) {
        if !self.bottlenecks.contains(&bottleneck) {
            self.bottlenecks.push(bottleneck);
        }
    }

    /// Record a helper-level `ConfigError` as a schema error
    pub fn config_error(&mut self, fallback_path: &str, err: ConfigError) {
        let path = err.field().unwrap_or(fallback_path).to_string();
        self.error(IssueCategory::Schema, path, err.to_string());
    }

    pub fn has_errors_in(&self, category: IssueCategory) -> bool {
        self.errors.iter().any(|e| e.category == category)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub mode: ValidationMode,
    pub generate_fallback: bool,
    /// Recorded in metadata; every stage still runs
    pub abort_early: bool,
    pub use_cache: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Production,
            generate_fallback: true,
            abort_early: false,
            use_cache: true,
        }
    }
}

impl ValidationOptions {
    pub fn from_settings(settings: &agentcfg_config::ValidationSettings) -> Self {
        Self {
            mode: settings.mode,
            generate_fallback: settings.generate_fallback,
            abort_early: settings.abort_early,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationMetadata {
    pub mode: ValidationMode,
    pub stages_run: Vec<String>,
    pub bottlenecks: Vec<Bottleneck>,
    pub cached: bool,
    pub abort_early: bool,
    pub validated_at: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<AgentConfiguration>,
    pub metadata: ValidationMetadata,
}

impl ValidationResult {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn has_bottleneck(&self, bottleneck: Bottleneck) -> bool {
        self.metadata.bottlenecks.contains(&bottleneck)
    }

    /// The document to hand on: the fallback when one was produced, else `original`
    pub fn effective<'a>(&'a self, original: &'a AgentConfiguration) -> &'a AgentConfiguration {
        self.fallback.as_ref().unwrap_or(original)
    }
}

/// Stage outcome without the per-call fallback; this is what gets cached
#[derive(Debug, Clone)]
pub struct CachedOutcome {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    bottlenecks: Vec<Bottleneck>,
}

pub type ValidationCache = TtlCache<String, CachedOutcome>;

pub const STAGES: [&str; 5] = [
    "structural",
    "cross_component",
    "environment",
    "security",
    "performance",
];

pub struct SchemaValidator {
    cache: Arc<ValidationCache>,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(Arc::new(TtlCache::new(CachePolicy::with_ttl(VALIDATION_TTL))))
    }
}

impl SchemaValidator {
    pub fn new(cache: Arc<ValidationCache>) -> Self {
        Self { cache }
    }

    pub fn validate_configuration(
        &self,
        config: &AgentConfiguration,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let started = Instant::now();
        let key = cache_key(config, options.mode);

        let cached = if options.use_cache {
            self.cache.get(&key)
        } else {
            None
        };
        let hit = cached.is_some();
        let outcome = match cached {
            Some(outcome) => outcome,
            None => {
                let outcome = run_stages(config, options.mode);
                if options.use_cache {
                    self.cache.insert(key, outcome.clone());
                }
                outcome
            }
        };

        let valid = outcome.errors.is_empty();
        let fallback = (!valid && options.generate_fallback)
            .then(|| fallback::fallback_for(config, &outcome.errors));

        if !valid {
            warn!(
                errors = outcome.errors.len(),
                fallback = fallback.is_some(),
                "Configuration failed validation"
            );
        }
        debug!(
            warnings = outcome.warnings.len(),
            cached = hit,
            "Validation complete"
        );

        ValidationResult {
            valid,
            errors: outcome.errors,
            warnings: outcome.warnings,
            fallback,
            metadata: ValidationMetadata {
                mode: options.mode,
                stages_run: STAGES.iter().map(|s| s.to_string()).collect(),
                bottlenecks: outcome.bottlenecks,
                cached: hit,
                abort_early: options.abort_early,
                validated_at: chrono::Utc::now().to_rfc3339(),
                duration_ms: started.elapsed().as_millis() as u64,
            },
        }
    }

    /// Validate a serialized document; unparseable text is a single schema error
    pub fn validate_yaml(&self, text: &str, options: &ValidationOptions) -> ValidationResult {
        match yaml::parse::<AgentConfiguration>(text) {
            Ok(config) => self.validate_configuration(&config, options),
            Err(err) => {
                let errors = vec![ValidationIssue {
                    category: IssueCategory::Schema,
                    path: "$".to_string(),
                    message: err.to_string(),
                }];
                let fallback = options.generate_fallback.then(|| {
                    let mut doc = fallback::safe_document(ProblemStatement::default(), None);
                    fallback::annotate(&mut doc, &errors);
                    doc
                });
                ValidationResult {
                    valid: false,
                    errors,
                    warnings: vec![],
                    fallback,
                    metadata: ValidationMetadata {
                        mode: options.mode,
                        stages_run: vec![],
                        bottlenecks: vec![],
                        cached: false,
                        abort_early: options.abort_early,
                        validated_at: chrono::Utc::now().to_rfc3339(),
                        duration_ms: 0,
                    },
                }
            }
        }
    }
}

fn cache_key(config: &AgentConfiguration, mode: ValidationMode) -> String {
    let serialized = serde_json::to_string(config).unwrap_or_default();
    hash_parts(&[&serialized, mode.as_str()])
}

/// Run all five stages in order
pub fn run_stages(config: &AgentConfiguration, mode: ValidationMode) -> CachedOutcome {
    let mut report = StageReport::default();
    structural::check(config, &mut report);
    cross_component::check(config, &mut report);
    environment::check(config, mode, &mut report);
    security::check(config, &mut report);
    performance::check(config, &mut report);
    CachedOutcome {
        errors: report.errors,
        warnings: report.warnings,
        bottlenecks: report.bottlenecks,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use agentcfg_config::*;
    use std::collections::BTreeMap;

    /// A document that passes every stage in production mode
    pub fn valid_config() -> AgentConfiguration {
        let mut secrets = BTreeMap::new();
        secrets.insert("OPENAI_API_KEY".to_string(), "${OPENAI_API_KEY}".to_string());
        AgentConfiguration {
            problem_statement: ProblemStatement::default(),
            agent: AgentSpec {
                model: ModelConfig {
                    name: "gpt-4o".to_string(),
                    provider: Provider::OpenAi,
                    temperature: 0.0,
                    top_p: 1.0,
                    max_tokens: 4096,
                    timeout: 60,
                    api_base: None,
                    api_key_env: Some("OPENAI_API_KEY".to_string()),
                },
                parser: ParserConfig::tool_calling(),
                history_processor: HistoryProcessorConfig {
                    name: "LastNObservations".to_string(),
                    window_size: 1600,
                },
                tools: vec![
                    ToolConfig::shell(),
                    ToolConfig::named("str_replace_editor"),
                    ToolConfig::named("submit"),
                ],
                cost_limit: Some(5.0),
                max_iterations: 30,
                runtime: RuntimeOptions::default(),
            },
            env: EnvSpec {
                repo: RepoConfig {
                    github_url: "https://github.com/acme/widgets.git".to_string(),
                    owner: "acme".to_string(),
                    name: "widgets".to_string(),
                    git_ref: None,
                    base_commit: None,
                    language: None,
                },
                workspace: WorkspaceConfig {
                    path: "/workspace".to_string(),
                    timeout: 3600,
                    cleanup: true,
                },
                docker: Some(DockerConfig {
                    image: "sweagent/swe-agent:latest".to_string(),
                    memory: "4g".to_string(),
                    cpus: 2.0,
                    network_mode: None,
                }),
                modal: None,
                environment_variables: BTreeMap::new(),
                secrets,
            },
            metadata: ConfigMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::valid_config;
    use super::*;
    use agentcfg_config::{ModalConfig, ParserConfig};

    #[test]
    fn test_valid_document_passes() {
        let result = SchemaValidator::default()
            .validate_configuration(&valid_config(), &ValidationOptions::default());
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert!(result.fallback.is_none());
        assert_eq!(result.metadata.stages_run.len(), 5);
    }

    #[test]
    fn test_all_stages_run_after_errors() {
        let mut config = valid_config();
        config.agent.model.temperature = 5.0;
        config.env.workspace.path = "/etc".to_string();
        let result = SchemaValidator::default().validate_configuration(
            &config,
            &ValidationOptions {
                abort_early: true,
                ..Default::default()
            },
        );
        assert!(!result.valid);
        let categories: Vec<_> = result.errors.iter().map(|e| e.category).collect();
        assert!(categories.contains(&IssueCategory::Schema));
        assert!(categories.contains(&IssueCategory::Security));
        assert!(result.metadata.abort_early);
    }

    #[test]
    fn test_fallback_attached_when_requested() {
        let mut config = valid_config();
        config.agent.parser = ParserConfig {
            name: "ToolCallingParser".to_string(),
            function_calling: false,
        };
        let validator = SchemaValidator::default();

        let with = validator.validate_configuration(&config, &ValidationOptions::default());
        let fallback = with.fallback.as_ref().unwrap();
        assert!(fallback.metadata.fallback);
        assert!(!fallback.metadata.fallback_errors.is_empty());

        let without = validator.validate_configuration(
            &config,
            &ValidationOptions {
                generate_fallback: false,
                ..Default::default()
            },
        );
        assert!(without.fallback.is_none());
        assert!(!without.valid);
    }

    #[test]
    fn test_results_are_cached_per_mode() {
        let validator = SchemaValidator::default();
        let config = valid_config();
        let first = validator.validate_configuration(&config, &ValidationOptions::default());
        let second = validator.validate_configuration(&config, &ValidationOptions::default());
        assert!(!first.metadata.cached);
        assert!(second.metadata.cached);

        let staging = validator.validate_configuration(
            &config,
            &ValidationOptions {
                mode: ValidationMode::Staging,
                ..Default::default()
            },
        );
        assert!(!staging.metadata.cached);
    }

    #[test]
    fn test_docker_and_modal_conflict() {
        let mut config = valid_config();
        config.env.modal = Some(ModalConfig {
            image: "python:3.11".to_string(),
            cpu: 2.0,
            memory: 4096,
            timeout: 3600,
        });
        let result = SchemaValidator::default()
            .validate_configuration(&config, &ValidationOptions::default());
        assert!(result
            .errors
            .iter()
            .any(|e| e.category == IssueCategory::CrossComponent
                && e.message.contains("mutually exclusive")));
    }

    #[test]
    fn test_unparseable_yaml() {
        let result = SchemaValidator::default()
            .validate_yaml("agent: [unclosed", &ValidationOptions::default());
        assert!(!result.valid);
        assert_eq!(result.errors[0].category, IssueCategory::Schema);
        assert!(result.fallback.is_some());
    }
}
