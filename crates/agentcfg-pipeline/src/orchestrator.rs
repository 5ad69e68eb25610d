//! Pipeline sequencing and the no-failure boundary
//!
//! `ConfigOrchestrator` runs context integration, generation, validation and
//! optimization in order and packages the result. Every error or panic below it turns
//! into an emergency package; its public operations never fail.

use crate::artifacts::{self, Artifacts};
use crate::context::{ContextIntegration, DefaultContextIntegration, IntegratedContext};
use crate::error::{OrchestrationError, Result};
use crate::history::{GenerationEvent, GenerationHistory};
use crate::presets::{self, Preset};
use crate::webhook;
use agentcfg_config::loader::formats::yaml;
use agentcfg_config::{AgentConfiguration, ProblemStatement, Settings, ValidationMode};
use agentcfg_core::cache::hash_parts;
use agentcfg_core::generator::GENERATOR_NAME;
use agentcfg_core::optimizer::OptimizationCache;
use agentcfg_core::validator::{fallback, ValidationCache};
use agentcfg_core::{
    CachePolicy, ConfigGenerator, CostPerformanceOptimizer, GeneratorOptions, OptimizationOptions,
    OptimizationResult, PlatformContext, ProblemContext, RawEnvironment, SchemaValidator,
    TtlCache, ValidationOptions, ValidationResult,
};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Per-call options; every field has a working default
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub preset: Option<Preset>,
    pub optimize: bool,
    pub optimization: OptimizationOptions,
    /// Generator returns a safe document instead of failing on missing inputs
    pub fallback_mode: bool,
    pub use_cache: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl OrchestratorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            preset: None,
            optimize: settings.optimization.enabled,
            optimization: OptimizationOptions::from_settings(&settings.optimization),
            fallback_mode: true,
            use_cache: true,
        }
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageMetadata {
    pub generator: String,
    pub generated_at: String,
    pub repository: Option<String>,
    pub event: Option<String>,
    pub preset: Option<String>,
    pub provider: String,
    pub model: String,
    pub problem_type: String,
    pub cache_key: String,
    pub cached: bool,
    /// The validator replaced the generated document
    pub fallback: bool,
    /// The pipeline failed and this is the emergency package
    pub error_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub mapping_errors: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigPackage {
    pub config: AgentConfiguration,
    pub yaml_text: String,
    pub metadata: PackageMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationResult>,
    pub artifacts: Artifacts,
}

impl ConfigPackage {
    pub fn is_emergency(&self) -> bool {
        self.metadata.error_fallback
    }

    pub async fn write_to(&self, dir: &Path) -> Result<Vec<std::path::PathBuf>> {
        artifacts::write_artifacts(dir, &self.yaml_text, &self.artifacts).await
    }
}

/// Result of the CI-orchestration adapter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationPlan {
    pub package: ConfigPackage,
    /// Step outputs for the CI runner
    pub outputs: BTreeMap<String, String>,
}

pub struct ConfigOrchestrator {
    settings: Settings,
    integration: Arc<dyn ContextIntegration>,
    generator: ConfigGenerator,
    validator: SchemaValidator,
    optimizer: CostPerformanceOptimizer,
    packages: Arc<TtlCache<String, ConfigPackage>>,
    history: GenerationHistory,
}

impl Default for ConfigOrchestrator {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl ConfigOrchestrator {
    pub fn new(settings: Settings) -> Self {
        Self::with_integration(settings, Arc::new(DefaultContextIntegration))
    }

    pub fn with_integration(settings: Settings, integration: Arc<dyn ContextIntegration>) -> Self {
        let cache = &settings.cache;
        let policy =
            |secs: u64| CachePolicy::bounded(Duration::from_secs(secs), cache.max_entries);

        let validation_cache: Arc<ValidationCache> =
            Arc::new(TtlCache::new(policy(cache.validation_ttl_secs)));
        let optimization_cache: Arc<OptimizationCache> =
            Arc::new(TtlCache::new(policy(cache.optimization_ttl_secs)));
        let packages = Arc::new(TtlCache::new(policy(cache.config_ttl_secs)));

        Self {
            history: GenerationHistory::new(cache.history_limit),
            integration,
            generator: ConfigGenerator::new(),
            validator: SchemaValidator::new(validation_cache),
            optimizer: CostPerformanceOptimizer::new(optimization_cache),
            packages,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the full pipeline; never fails
    pub async fn generate_configuration(
        &self,
        platform: &PlatformContext,
        problem: &ProblemContext,
        options: &OrchestratorOptions,
    ) -> ConfigPackage {
        self.guarded(platform, problem, options, None).await
    }

    /// Webhook adapter: derive contexts from the payload and pick a preset when none is given
    pub async fn handle_webhook_configuration(
        &self,
        event: &str,
        payload: &Value,
        env: RawEnvironment,
        options: &OrchestratorOptions,
    ) -> ConfigPackage {
        let started = Instant::now();
        let ctx = match webhook::parse_webhook(event, payload, env.clone()) {
            Ok(ctx) => ctx,
            Err(err) => {
                let platform = PlatformContext::from_env(env).with_event(event);
                let package = self.emergency(&platform, options, &err, started);
                self.record(&package);
                return package;
            }
        };

        let mut options = options.clone();
        if options.preset.is_none() {
            options.preset = presets::auto_select(event, ctx.action.as_deref(), &ctx.problem);
            debug!(
                event,
                action = ctx.action.as_deref().unwrap_or(""),
                preset = options.preset.map(|p| p.as_str()).unwrap_or("none"),
                "Selected preset"
            );
        }
        self.guarded(&ctx.platform, &ctx.problem, &options, Some(payload))
            .await
    }

    /// CI adapter: platform identity from `GITHUB_*` variables plus step outputs
    pub async fn prepare_orchestration_configuration(
        &self,
        env: RawEnvironment,
        problem: &ProblemContext,
        options: &OrchestratorOptions,
    ) -> OrchestrationPlan {
        let platform = PlatformContext::from_env(env);
        let package = self.generate_configuration(&platform, problem, options).await;

        let meta = &package.metadata;
        let mut outputs = BTreeMap::new();
        outputs.insert("config_file".to_string(), artifacts::CONFIG_FILE.to_string());
        outputs.insert("provider".to_string(), meta.provider.clone());
        outputs.insert("model".to_string(), meta.model.clone());
        outputs.insert("problem_type".to_string(), meta.problem_type.clone());
        outputs.insert(
            "valid".to_string(),
            package
                .validation
                .as_ref()
                .map_or(false, |v| v.valid)
                .to_string(),
        );
        outputs.insert("fallback".to_string(), meta.fallback.to_string());
        outputs.insert("error_fallback".to_string(), meta.error_fallback.to_string());
        outputs.insert("cache_key".to_string(), meta.cache_key.clone());
        if let Some(limit) = package.config.agent.cost_limit {
            outputs.insert("cost_limit".to_string(), format!("{:.2}", limit));
        }

        OrchestrationPlan { package, outputs }
    }

    /// Retained generation events of `repository`, oldest first
    pub fn history(&self, repository: &str) -> Vec<GenerationEvent> {
        self.history.for_repository(repository)
    }

    async fn guarded(
        &self,
        platform: &PlatformContext,
        problem: &ProblemContext,
        options: &OrchestratorOptions,
        payload: Option<&Value>,
    ) -> ConfigPackage {
        let started = Instant::now();
        let run = AssertUnwindSafe(self.run_pipeline(platform, problem, options, payload, started));

        let package = match run.catch_unwind().await {
            Ok(Ok(package)) => package,
            Ok(Err(err)) => self.emergency(platform, options, &err, started),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.emergency(platform, options, &OrchestrationError::Panic(message), started)
            }
        };

        self.record(&package);
        package
    }

    async fn run_pipeline(
        &self,
        platform: &PlatformContext,
        problem: &ProblemContext,
        options: &OrchestratorOptions,
        payload: Option<&Value>,
        started: Instant,
    ) -> Result<ConfigPackage> {
        let key = package_key(platform, problem, options.preset);
        if options.use_cache {
            if let Some(mut hit) = self.packages.get(&key) {
                debug!(cache_key = %key, "Package cache hit");
                hit.metadata.cached = true;
                hit.metadata.duration_ms = started.elapsed().as_millis() as u64;
                return Ok(hit);
            }
        }

        let integrated = self
            .integration
            .integrate(platform, payload)
            .await
            .map_err(OrchestrationError::ContextIntegration)?;
        let generator_options = resolve_generator_options(&integrated, options);

        let generation =
            self.generator
                .generate_configuration(platform, problem, &generator_options)?;
        for warning in &generation.warnings {
            warn!(warning = %warning, "Generation warning");
        }

        let validation = self.validator.validate_configuration(
            &generation.config,
            &ValidationOptions {
                mode: ValidationMode::Production,
                generate_fallback: true,
                abort_early: self.settings.validation.abort_early,
                use_cache: options.use_cache,
            },
        );
        let mut config = validation.effective(&generation.config).clone();

        let optimization = if options.optimize && !config.metadata.fallback {
            let mut opt = options.optimization.clone();
            opt.use_cache = opt.use_cache && options.use_cache;
            let result = self.optimizer.optimize_configuration(&config, &opt);
            config = result.optimized_config.clone();
            Some(result)
        } else {
            None
        };

        let yaml_text = yaml::to_string(&config)?;
        let artifacts = artifacts::derive(&config);

        let metadata = PackageMetadata {
            generator: GENERATOR_NAME.to_string(),
            generated_at: generation.metadata.generated_at.clone(),
            repository: platform.repository.clone(),
            event: platform.event_name.clone(),
            preset: options.preset.map(|p| p.as_str().to_string()),
            provider: config.agent.model.provider.to_string(),
            model: config.agent.model.name.clone(),
            problem_type: config.problem_statement.kind.to_string(),
            cache_key: key.clone(),
            cached: false,
            fallback: config.metadata.fallback,
            error_fallback: false,
            error: None,
            warnings: generation.warnings.clone(),
            mapping_errors: generation.metadata.mapping_errors.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            repository = platform.repository.as_deref().unwrap_or("unknown"),
            provider = %metadata.provider,
            model = %metadata.model,
            valid = validation.valid,
            fallback = metadata.fallback,
            "Configuration package ready"
        );

        let package = ConfigPackage {
            config,
            yaml_text,
            metadata,
            validation: Some(validation),
            optimization,
            artifacts,
        };
        if options.use_cache {
            self.packages.insert(key, package.clone());
        }
        Ok(package)
    }

    /// Fixed safe package carrying the failure
    fn emergency(
        &self,
        platform: &PlatformContext,
        options: &OrchestratorOptions,
        err: &OrchestrationError,
        started: Instant,
    ) -> ConfigPackage {
        error!(error = %err, "Pipeline failed; returning emergency configuration");

        let mut config = fallback::safe_document(ProblemStatement::default(), None);
        config.metadata.generator = Some(GENERATOR_NAME.to_string());
        config.metadata.source_event = platform.event_name.clone();
        config.metadata.error_fallback = true;
        config.metadata.fallback_reason = Some(err.to_string());

        let yaml_text = yaml::to_string(&config).unwrap_or_default();
        let artifacts = artifacts::derive(&config);
        ConfigPackage {
            metadata: PackageMetadata {
                generator: GENERATOR_NAME.to_string(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                repository: platform.repository.clone(),
                event: platform.event_name.clone(),
                preset: options.preset.map(|p| p.as_str().to_string()),
                provider: config.agent.model.provider.to_string(),
                model: config.agent.model.name.clone(),
                problem_type: config.problem_statement.kind.to_string(),
                cache_key: String::new(),
                cached: false,
                fallback: false,
                error_fallback: true,
                error: Some(err.to_string()),
                warnings: vec![],
                mapping_errors: vec![],
                duration_ms: started.elapsed().as_millis() as u64,
            },
            config,
            yaml_text,
            validation: None,
            optimization: None,
            artifacts,
        }
    }

    fn record(&self, package: &ConfigPackage) {
        let meta = &package.metadata;
        self.history.record(GenerationEvent {
            timestamp: chrono::Utc::now().to_rfc3339(),
            repository: meta.repository.clone().unwrap_or_else(|| "unknown".to_string()),
            event: meta.event.clone(),
            preset: meta.preset.clone(),
            provider: meta.provider.clone(),
            model: meta.model.clone(),
            valid: package.validation.as_ref().map_or(false, |v| v.valid),
            fallback: meta.fallback,
            error_fallback: meta.error_fallback,
            cached: meta.cached,
            duration_ms: meta.duration_ms,
        });
    }
}

/// Package cache key: repository, commit, event, issue/PR number, preset, plus the
/// comment and trigger text so a new command on the same issue is not served stale
fn package_key(platform: &PlatformContext, problem: &ProblemContext, preset: Option<Preset>) -> String {
    let number = problem.number().map(|n| n.to_string()).unwrap_or_default();
    hash_parts(&[
        platform.repository.as_deref().unwrap_or(""),
        platform.sha.as_deref().unwrap_or(""),
        platform.event_name.as_deref().unwrap_or(""),
        &number,
        preset.map(|p| p.as_str()).unwrap_or(""),
        problem.comment.as_ref().map_or("", |c| c.body.as_str()),
        problem
            .trigger
            .as_ref()
            .and_then(|t| t.text.as_deref())
            .unwrap_or(""),
    ])
}

/// Generator options from the integrated context and the requested preset
pub fn resolve_generator_options(
    integrated: &IntegratedContext,
    options: &OrchestratorOptions,
) -> GeneratorOptions {
    GeneratorOptions {
        fallback_mode: options.fallback_mode,
        overrides: options.preset.map(|p| p.overrides()),
        language: integrated.repository.language.clone(),
        workspace_timeout_cap: integrated.workflow.timeout_secs,
        network_isolated: integrated.security.untrusted_fork,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RepositoryMetadata, SecurityPosture, WorkflowConstraints};

    #[test]
    fn test_resolve_generator_options_from_preset() {
        let options = OrchestratorOptions::default().with_preset(Preset::PrReview);
        let resolved = resolve_generator_options(&IntegratedContext::default(), &options);
        let overrides = resolved.overrides.unwrap();
        assert_eq!(overrides.max_tokens, Some(16384));
        assert_eq!(overrides.max_iterations, Some(40));
        assert!(resolved.fallback_mode);
    }

    #[test]
    fn test_resolve_generator_options_from_context() {
        let integrated = IntegratedContext {
            repository: RepositoryMetadata {
                language: Some("rust".to_string()),
                ..Default::default()
            },
            workflow: WorkflowConstraints {
                runner_os: None,
                timeout_secs: Some(900),
            },
            security: SecurityPosture {
                untrusted_fork: true,
            },
        };
        let resolved = resolve_generator_options(&integrated, &OrchestratorOptions::default());
        assert_eq!(resolved.language.as_deref(), Some("rust"));
        assert_eq!(resolved.workspace_timeout_cap, Some(900));
        assert!(resolved.network_isolated);
        assert!(resolved.overrides.is_none());
    }

    #[test]
    fn test_package_key_depends_on_preset() {
        let platform = PlatformContext::default().with_repository("acme/widgets");
        let problem = ProblemContext::default();
        assert_ne!(
            package_key(&platform, &problem, None),
            package_key(&platform, &problem, Some(Preset::CodeFix))
        );
    }

    #[test]
    fn test_package_key_depends_on_comment_text() {
        use agentcfg_core::generator::{CommentContext, IssueContext};

        let platform = PlatformContext::default()
            .with_repository("acme/widgets")
            .with_event("issue_comment");
        let with_comment = |body: &str| ProblemContext {
            issue: Some(IssueContext {
                number: 42,
                title: "Crash".to_string(),
                ..Default::default()
            }),
            comment: Some(CommentContext {
                author: "octocat".to_string(),
                body: body.to_string(),
            }),
            ..Default::default()
        };
        assert_ne!(
            package_key(&platform, &with_comment("@bot analyze"), None),
            package_key(&platform, &with_comment("@bot fix"), None)
        );
        assert_eq!(
            package_key(&platform, &with_comment("@bot fix"), None),
            package_key(&platform, &with_comment("@bot fix"), None)
        );
    }
}
