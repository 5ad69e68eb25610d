//! Agent configuration document generation
//!
//! Assembles `problem_statement`, `agent` and `env` from the mapped environment and
//! the event context, then serializes the document to YAML.

pub mod context;
pub mod problem;
pub mod tools;

pub use context::{
    parse_repository, CommentContext, IssueContext, PlatformContext, ProblemContext,
    PullRequestContext, TriggerContext,
};
pub use problem::{detect_command, Command};

use crate::cache::hash_parts;
use crate::error::GenerationError;
use crate::mapper::{paths, EnvironmentMapper, MappedConfig, MappingResult};
use crate::providers;
use crate::validator::fallback;
use agentcfg_config::loader::formats::yaml;
use agentcfg_config::{
    parse_memory_mb, AgentConfiguration, AgentSpec, ConfigMetadata, DockerConfig, EnvSpec,
    HistoryProcessorConfig, ModalConfig, ModelConfig, ParserConfig, ProblemStatement, RepoConfig,
    RuntimeOptions, Validate, WorkspaceConfig, TOOL_CALLING_PARSER,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const GENERATOR_NAME: &str = concat!("agentcfg/", env!("CARGO_PKG_VERSION"));

/// Share of `max_tokens` given to conversation history by default
const DEFAULT_WINDOW_RATIO: f64 = 0.4;

/// Overrides applied by a named preset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresetOverrides {
    pub max_tokens: Option<u32>,
    pub max_iterations: Option<u32>,
    /// Tools appended when missing from the selected registry
    pub required_tools: Vec<String>,
    /// Preset name recorded in metadata
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    /// Return a minimal safe document instead of failing on missing preconditions
    pub fallback_mode: bool,
    pub overrides: Option<PresetOverrides>,
    /// Repository language from an external source; wins over the mapped value
    pub language: Option<String>,
    /// Upper bound on the workspace timeout imposed by the runner
    pub workspace_timeout_cap: Option<u32>,
    /// Disable sandbox networking
    pub network_isolated: bool,
}

/// Outcome of the structural `Validate` pass run right after generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickCheck {
    pub valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationMetadata {
    pub generator: String,
    pub generated_at: String,
    pub provider: String,
    pub problem_type: String,
    pub fallback: bool,
    pub mapping_errors: Vec<String>,
    pub defaults_applied: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub config: AgentConfiguration,
    pub yaml_text: String,
    pub metadata: GenerationMetadata,
    pub validation: QuickCheck,
    pub warnings: Vec<String>,
    pub cache_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigGenerator {
    mapper: EnvironmentMapper,
}

impl ConfigGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate_configuration(
        &self,
        platform: &PlatformContext,
        problem: &ProblemContext,
        options: &GeneratorOptions,
    ) -> Result<GenerationResult, GenerationError> {
        let mapping = self.mapper.map_environment(&platform.env);
        let mut warnings = mapping.warnings.clone();

        let repository = platform
            .repository
            .clone()
            .or_else(|| mapping.config.get_str(paths::GITHUB_REPOSITORY).map(str::to_string));

        let identity = match repository {
            Some(value) => parse_repository(&value),
            None => Err(GenerationError::MissingRepository),
        };
        let (owner, name) = match identity {
            Ok(pair) => pair,
            Err(err) if options.fallback_mode => {
                warn!(error = %err, "Generating fallback document");
                return self.fallback_result(platform, problem, options, &mapping, err);
            }
            Err(err) => return Err(err),
        };

        let problem_statement =
            problem::build_problem_statement(problem, Some(&name), platform.run_id.as_deref());
        let agent = build_agent(&mapping, options, &mut warnings);
        let env = build_env(platform, &mapping, options, &owner, &name, &mut warnings);

        let config = AgentConfiguration {
            problem_statement,
            agent,
            env,
            metadata: document_metadata(platform, options),
        };

        debug!(
            repository = %config.env.repo.full_name(),
            provider = %config.agent.model.provider,
            problem_type = %config.problem_statement.kind,
            "Generated configuration"
        );

        self.finish(config, platform, options, &mapping, warnings, false)
    }

    fn fallback_result(
        &self,
        platform: &PlatformContext,
        problem: &ProblemContext,
        options: &GeneratorOptions,
        mapping: &MappingResult,
        err: GenerationError,
    ) -> Result<GenerationResult, GenerationError> {
        let statement =
            problem::build_problem_statement(problem, None, platform.run_id.as_deref());
        let mut config = fallback::safe_document(statement, None);
        config.metadata = ConfigMetadata {
            fallback: true,
            fallback_reason: Some(err.to_string()),
            ..document_metadata(platform, options)
        };
        let warnings = vec![format!("Fallback document generated: {}", err)];
        self.finish(config, platform, options, mapping, warnings, true)
    }

    fn finish(
        &self,
        config: AgentConfiguration,
        platform: &PlatformContext,
        options: &GeneratorOptions,
        mapping: &MappingResult,
        warnings: Vec<String>,
        fallback: bool,
    ) -> Result<GenerationResult, GenerationError> {
        let yaml_text = yaml::to_string(&config)?;

        let validation = match config.validate() {
            Ok(()) => QuickCheck {
                valid: true,
                errors: vec![],
            },
            Err(err) => QuickCheck {
                valid: false,
                errors: vec![err.to_string()],
            },
        };

        let cache_key = generation_cache_key(platform, &config.problem_statement, options);

        let metadata = GenerationMetadata {
            generator: GENERATOR_NAME.to_string(),
            generated_at: config
                .metadata
                .generated_at
                .clone()
                .unwrap_or_else(now_rfc3339),
            provider: config.agent.model.provider.to_string(),
            problem_type: config.problem_statement.kind.to_string(),
            fallback,
            mapping_errors: mapping.errors.iter().map(|e| e.to_string()).collect(),
            defaults_applied: mapping.metadata.defaults_applied.clone(),
        };

        Ok(GenerationResult {
            config,
            yaml_text,
            metadata,
            validation,
            warnings,
            cache_key,
        })
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn document_metadata(platform: &PlatformContext, options: &GeneratorOptions) -> ConfigMetadata {
    ConfigMetadata {
        generator: Some(GENERATOR_NAME.to_string()),
        generated_at: Some(now_rfc3339()),
        source_event: platform.event_name.clone(),
        preset: options.overrides.as_ref().and_then(|o| o.label.clone()),
        ..Default::default()
    }
}

fn generation_cache_key(
    platform: &PlatformContext,
    statement: &ProblemStatement,
    options: &GeneratorOptions,
) -> String {
    let preset = options
        .overrides
        .as_ref()
        .and_then(|o| o.label.as_deref())
        .unwrap_or("");
    hash_parts(&[
        platform.repository.as_deref().unwrap_or(""),
        platform.sha.as_deref().unwrap_or(""),
        platform.event_name.as_deref().unwrap_or(""),
        &statement.id,
        preset,
    ])
}

fn build_agent(
    mapping: &MappingResult,
    options: &GeneratorOptions,
    warnings: &mut Vec<String>,
) -> AgentSpec {
    let mapped = &mapping.config;
    let provider = mapping.provider();
    let profile = providers::profile(provider);
    let overrides = options.overrides.clone().unwrap_or_default();

    let model_name = mapped
        .get_str(paths::MODEL_NAME)
        .unwrap_or(profile.default_model)
        .to_string();
    let ceiling = providers::model_ceiling(&model_name).unwrap_or(profile.max_tokens);

    let requested = overrides
        .max_tokens
        .or_else(|| mapped.get_u32(paths::MAX_TOKENS))
        .unwrap_or_else(|| ceiling.min(profile.default_max_tokens));
    let max_tokens = if requested > ceiling {
        warnings.push(format!(
            "max_tokens {} exceeds the {} limit of {}; clamped",
            requested, model_name, ceiling
        ));
        ceiling
    } else {
        requested
    };

    let parser_name = mapped
        .get_str(paths::PARSER_NAME)
        .unwrap_or(profile.parser)
        .to_string();
    let function_calling = mapped
        .get_bool(paths::FUNCTION_CALLING)
        .unwrap_or(parser_name == TOOL_CALLING_PARSER && profile.function_calling);
    let parser = ParserConfig {
        name: parser_name,
        function_calling,
    };

    let window_size = mapped
        .get_u32(paths::HISTORY_WINDOW)
        .unwrap_or((max_tokens as f64 * DEFAULT_WINDOW_RATIO) as u32);
    let history_processor = HistoryProcessorConfig {
        name: mapped
            .get_str(paths::HISTORY_NAME)
            .unwrap_or(profile.history_processor)
            .to_string(),
        window_size,
    };

    let language = repo_language(mapped, options);
    let tools = match mapped.get_json(paths::TOOLS) {
        Some(value) => match tools::tools_from_json(value) {
            Some(mut explicit) => {
                for name in &overrides.required_tools {
                    if !explicit.iter().any(|t| &t.name == name) {
                        explicit.push(agentcfg_config::ToolConfig::named(name.clone()));
                    }
                }
                explicit
            }
            None => {
                warnings.push("SWE_AGENT_TOOLS is not a list of tools; using defaults".into());
                tools::select_tools(
                    parser.function_calling,
                    language.as_deref(),
                    &overrides.required_tools,
                )
            }
        },
        None => tools::select_tools(
            parser.function_calling,
            language.as_deref(),
            &overrides.required_tools,
        ),
    };

    let max_iterations = overrides
        .max_iterations
        .or_else(|| mapped.get_u32(paths::MAX_ITERATIONS))
        .unwrap_or(crate::mapper::tables::DEFAULT_MAX_ITERATIONS as u32);

    AgentSpec {
        model: ModelConfig {
            name: model_name,
            provider,
            temperature: mapped.get_f64(paths::TEMPERATURE).unwrap_or(0.0),
            top_p: mapped.get_f64(paths::TOP_P).unwrap_or(1.0),
            max_tokens,
            timeout: mapped.get_u32(paths::MODEL_TIMEOUT).unwrap_or(300),
            api_base: mapped.get_str(paths::API_BASE).map(str::to_string),
            api_key_env: mapped.get_str(paths::API_KEY_ENV).map(str::to_string),
        },
        parser,
        history_processor,
        tools,
        cost_limit: mapped.get_f64(paths::COST_LIMIT),
        max_iterations,
        runtime: RuntimeOptions::default(),
    }
}

fn repo_language(mapped: &MappedConfig, options: &GeneratorOptions) -> Option<String> {
    options
        .language
        .clone()
        .or_else(|| mapped.get_str(paths::REPO_LANGUAGE).map(str::to_string))
        .map(|l| l.to_lowercase())
}

fn build_env(
    platform: &PlatformContext,
    mapping: &MappingResult,
    options: &GeneratorOptions,
    owner: &str,
    name: &str,
    warnings: &mut Vec<String>,
) -> EnvSpec {
    let mapped = &mapping.config;

    let server = platform
        .server_url
        .as_deref()
        .or_else(|| mapped.get_str(paths::GITHUB_SERVER_URL))
        .unwrap_or("https://github.com")
        .trim_end_matches('/');

    let repo = RepoConfig {
        github_url: format!("{}/{}/{}.git", server, owner, name),
        owner: owner.to_string(),
        name: name.to_string(),
        git_ref: platform
            .git_ref
            .clone()
            .or_else(|| mapped.get_str(paths::GITHUB_REF).map(str::to_string)),
        base_commit: platform
            .sha
            .clone()
            .or_else(|| mapped.get_str(paths::GITHUB_SHA).map(str::to_string)),
        language: repo_language(mapped, options),
    };

    let mut timeout = mapped.get_u32(paths::WORKSPACE_TIMEOUT).unwrap_or(3600);
    if let Some(cap) = options.workspace_timeout_cap {
        if timeout > cap {
            warnings.push(format!(
                "Workspace timeout {}s capped to runner limit {}s",
                timeout, cap
            ));
            timeout = cap;
        }
    }
    let workspace = WorkspaceConfig {
        path: mapped
            .get_str(paths::WORKSPACE_PATH)
            .unwrap_or(crate::mapper::tables::DEFAULT_WORKSPACE)
            .to_string(),
        timeout,
        cleanup: true,
    };

    let deployment = mapped
        .get_str(paths::DEPLOYMENT)
        .unwrap_or("docker")
        .to_lowercase();
    let (docker, modal) = match deployment.as_str() {
        "modal" => (None, Some(modal_block(mapped, warnings))),
        "local" | "none" => (None, None),
        other => {
            if other != "docker" {
                warnings.push(format!(
                    "Unknown deployment type '{}'; using docker",
                    other
                ));
            }
            (Some(docker_block(mapped, options)), None)
        }
    };

    let environment_variables = mapped
        .get_json(paths::ENV_VARS)
        .and_then(|v| v.as_object())
        .map(|object| {
            object
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default();

    EnvSpec {
        repo,
        workspace,
        docker,
        modal,
        environment_variables,
        secrets: secret_placeholders(mapping),
    }
}

fn docker_block(mapped: &MappedConfig, options: &GeneratorOptions) -> DockerConfig {
    let network_mode = mapped
        .get_str(paths::DOCKER_NETWORK)
        .map(str::to_string)
        .or_else(|| options.network_isolated.then(|| "none".to_string()));
    DockerConfig {
        image: mapped
            .get_str(paths::DOCKER_IMAGE)
            .unwrap_or(crate::mapper::tables::DEFAULT_DOCKER_IMAGE)
            .to_string(),
        memory: mapped.get_str(paths::DOCKER_MEMORY).unwrap_or("4g").to_string(),
        cpus: mapped.get_f64(paths::DOCKER_CPUS).unwrap_or(2.0),
        network_mode,
    }
}

fn modal_block(mapped: &MappedConfig, warnings: &mut Vec<String>) -> ModalConfig {
    let raw_memory = mapped.get_str(paths::MODAL_MEMORY).unwrap_or("4g");
    let memory = parse_memory_mb(raw_memory).unwrap_or_else(|| {
        warnings.push(format!("Unparseable modal memory '{}'; using 4g", raw_memory));
        4096
    });
    ModalConfig {
        image: mapped
            .get_str(paths::MODAL_IMAGE)
            .unwrap_or(crate::mapper::tables::DEFAULT_MODAL_IMAGE)
            .to_string(),
        cpu: mapped.get_f64(paths::MODAL_CPU).unwrap_or(2.0),
        memory,
        timeout: mapped.get_u32(paths::MODAL_TIMEOUT).unwrap_or(3600),
    }
}

/// `${NAME}` for every required secret that is set, `missing` otherwise
fn secret_placeholders(mapping: &MappingResult) -> BTreeMap<String, String> {
    let found = &mapping.metadata.secrets_found;
    let mut secrets: BTreeMap<String, String> = mapping
        .metadata
        .required_secrets
        .iter()
        .map(|name| {
            let value = if found.contains(name) {
                format!("${{{}}}", name)
            } else {
                "missing".to_string()
            };
            (name.clone(), value)
        })
        .collect();
    if found.iter().any(|n| n == "GITHUB_TOKEN") {
        secrets.insert("GITHUB_TOKEN".to_string(), "${GITHUB_TOKEN}".to_string());
    }
    secrets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::RawEnvironment;
    use agentcfg_config::{ProblemType, Provider};
    use pretty_assertions::assert_eq;

    const OPENAI_KEY: &str = "sk-proj-abcdefghijklmnopqrstuvwxyz123456";

    fn platform(pairs: &[(&str, &str)]) -> PlatformContext {
        PlatformContext::from_env(RawEnvironment::from_pairs(pairs.iter().copied()))
    }

    fn bug_issue() -> ProblemContext {
        ProblemContext {
            issue: Some(IssueContext {
                number: 12,
                title: "Panic on empty input".to_string(),
                labels: vec!["bug".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_generates_complete_document() {
        let platform = platform(&[
            ("GITHUB_REPOSITORY", "acme/widgets"),
            ("GITHUB_SHA", "abc123"),
            ("OPENAI_API_KEY", OPENAI_KEY),
            ("GITHUB_TOKEN", "ghs_token"),
        ]);
        let result = ConfigGenerator::new()
            .generate_configuration(&platform, &bug_issue(), &GeneratorOptions::default())
            .unwrap();
        let config = &result.config;

        assert_eq!(config.problem_statement.kind, ProblemType::BugFix);
        assert_eq!(config.problem_statement.id, "widgets-12");
        assert_eq!(config.agent.model.name, "gpt-4o");
        assert_eq!(config.agent.model.provider, Provider::OpenAi);
        assert_eq!(config.agent.model.max_tokens, 4096);
        assert_eq!(config.agent.history_processor.window_size, 1638);
        assert!(config.agent.parser.function_calling);
        assert_eq!(config.env.repo.github_url, "https://github.com/acme/widgets.git");
        assert_eq!(config.env.repo.base_commit.as_deref(), Some("abc123"));
        assert!(config.env.docker.is_some());
        assert!(config.env.modal.is_none());
        assert_eq!(config.env.secrets["OPENAI_API_KEY"], "${OPENAI_API_KEY}");
        assert_eq!(config.env.secrets["GITHUB_TOKEN"], "${GITHUB_TOKEN}");
        assert!(result.validation.valid);
        assert!(result.yaml_text.contains("problem_statement:"));
        assert!(!result.yaml_text.contains(OPENAI_KEY));
    }

    #[test]
    fn test_missing_repository_without_fallback_fails() {
        let err = ConfigGenerator::new()
            .generate_configuration(
                &PlatformContext::default(),
                &bug_issue(),
                &GeneratorOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingRepository));
    }

    #[test]
    fn test_missing_repository_with_fallback() {
        let options = GeneratorOptions {
            fallback_mode: true,
            ..Default::default()
        };
        let result = ConfigGenerator::new()
            .generate_configuration(&PlatformContext::default(), &bug_issue(), &options)
            .unwrap();
        assert!(result.metadata.fallback);
        assert!(result.config.metadata.fallback);
        assert!(result
            .config
            .metadata
            .fallback_reason
            .as_deref()
            .unwrap()
            .contains("Repository identity is missing"));
        assert_eq!(result.config.problem_statement.kind, ProblemType::BugFix);
    }

    #[test]
    fn test_preset_overrides_are_clamped_to_model() {
        let platform = platform(&[
            ("GITHUB_REPOSITORY", "acme/widgets"),
            ("SWE_AGENT_MODEL", "claude-3-5-sonnet-20241022"),
            ("ANTHROPIC_API_KEY", "sk-ant-REDACTED"),
        ]);
        let options = GeneratorOptions {
            overrides: Some(PresetOverrides {
                max_tokens: Some(16384),
                max_iterations: Some(40),
                required_tools: vec!["git_diff".to_string()],
                label: Some("pr_review".to_string()),
            }),
            ..Default::default()
        };
        let result = ConfigGenerator::new()
            .generate_configuration(&platform, &ProblemContext::default(), &options)
            .unwrap();
        assert_eq!(result.config.agent.model.max_tokens, 8192);
        assert_eq!(result.config.agent.max_iterations, 40);
        assert!(result.config.agent.has_tool("git_diff"));
        assert_eq!(
            result.config.agent.history_processor.name,
            "CacheControlHistoryProcessor"
        );
        assert_eq!(result.config.metadata.preset.as_deref(), Some("pr_review"));
        assert!(result.warnings.iter().any(|w| w.contains("clamped")));
    }

    #[test]
    fn test_modal_deployment_and_missing_secrets() {
        let platform = platform(&[
            ("GITHUB_REPOSITORY", "acme/widgets"),
            ("SWE_AGENT_DEPLOYMENT", "modal"),
            ("SWE_AGENT_MODAL_MEMORY", "8g"),
            ("SWE_AGENT_MODEL", "llama3.1"),
        ]);
        let result = ConfigGenerator::new()
            .generate_configuration(&platform, &ProblemContext::default(), &GeneratorOptions::default())
            .unwrap();
        let env = &result.config.env;
        assert!(env.docker.is_none());
        assert_eq!(env.modal.as_ref().map(|m| m.memory), Some(8192));
        assert_eq!(env.secrets["MODAL_TOKEN_ID"], "missing");
        assert_eq!(result.config.agent.parser.name, "ThoughtActionParser");
        assert!(!result.config.agent.parser.function_calling);
        assert!(result.config.agent.has_tool("scroll_up"));
    }

    #[test]
    fn test_runner_constraints_applied() {
        let platform = platform(&[("GITHUB_REPOSITORY", "acme/widgets")]);
        let options = GeneratorOptions {
            workspace_timeout_cap: Some(1800),
            network_isolated: true,
            language: Some("Python".to_string()),
            ..Default::default()
        };
        let result = ConfigGenerator::new()
            .generate_configuration(&platform, &ProblemContext::default(), &options)
            .unwrap();
        let config = &result.config;
        assert_eq!(config.env.workspace.timeout, 1800);
        assert_eq!(
            config.env.docker.as_ref().and_then(|d| d.network_mode.as_deref()),
            Some("none")
        );
        assert_eq!(config.env.repo.language.as_deref(), Some("python"));
        assert!(config.agent.has_tool("python_test_runner"));
    }

    #[test]
    fn test_cache_key_is_stable_for_same_event() {
        let platform = platform(&[("GITHUB_REPOSITORY", "acme/widgets"), ("GITHUB_SHA", "abc")]);
        let generator = ConfigGenerator::new();
        let a = generator
            .generate_configuration(&platform, &bug_issue(), &GeneratorOptions::default())
            .unwrap();
        let b = generator
            .generate_configuration(&platform, &bug_issue(), &GeneratorOptions::default())
            .unwrap();
        assert_eq!(a.cache_key, b.cache_key);
    }
}
