//! Conservative replacement document

use super::environment::is_valid_repo_url;
use super::security::mask_leaks;
use super::ValidationIssue;
use agentcfg_config::{
    AgentConfiguration, AgentSpec, ConfigMetadata, DockerConfig, EnvSpec,
    HistoryProcessorConfig, ModelConfig, ParserConfig, ProblemStatement, Provider, RepoConfig,
    RuntimeOptions, ToolConfig, WorkspaceConfig,
};
use std::collections::BTreeMap;

pub const FALLBACK_MODEL: &str = "gpt-4o-mini";
pub const FALLBACK_COST_LIMIT: f64 = 1.0;
/// Errors copied into the fallback's metadata
pub const RETAINED_ERRORS: usize = 5;

const PLACEHOLDER_REPO: &str = "https://github.com/unknown/unknown.git";

/// Pinned safe document; only the problem statement and repository vary
pub fn safe_document(problem_statement: ProblemStatement, repo: Option<RepoConfig>) -> AgentConfiguration {
    let mut secrets = BTreeMap::new();
    secrets.insert("OPENAI_API_KEY".to_string(), "${OPENAI_API_KEY}".to_string());

    AgentConfiguration {
        problem_statement,
        agent: AgentSpec {
            model: ModelConfig {
                name: FALLBACK_MODEL.to_string(),
                provider: Provider::OpenAi,
                temperature: 0.0,
                top_p: 1.0,
                max_tokens: 4096,
                timeout: 300,
                api_base: None,
                api_key_env: Some("OPENAI_API_KEY".to_string()),
            },
            parser: ParserConfig::tool_calling(),
            history_processor: HistoryProcessorConfig {
                name: "LastNObservations".to_string(),
                window_size: 2048,
            },
            tools: vec![
                ToolConfig::shell(),
                ToolConfig::named("str_replace_editor"),
                ToolConfig::named("submit"),
            ],
            cost_limit: Some(FALLBACK_COST_LIMIT),
            max_iterations: 30,
            runtime: RuntimeOptions::default(),
        },
        env: EnvSpec {
            repo: repo.unwrap_or_else(|| RepoConfig {
                github_url: PLACEHOLDER_REPO.to_string(),
                owner: "unknown".to_string(),
                name: "unknown".to_string(),
                git_ref: None,
                base_commit: None,
                language: None,
            }),
            workspace: WorkspaceConfig {
                path: "/workspace".to_string(),
                timeout: 1800,
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

/// Fallback for a document that failed validation
///
/// Keeps the problem statement with key-shaped text masked, and the repository when its
/// URL is well formed.
pub fn fallback_for(original: &AgentConfiguration, errors: &[ValidationIssue]) -> AgentConfiguration {
    let repo = is_valid_repo_url(&original.env.repo.github_url).then(|| original.env.repo.clone());
    let mut doc = safe_document(masked_statement(&original.problem_statement), repo);
    doc.metadata.generator = original.metadata.generator.clone();
    doc.metadata.source_event = original.metadata.source_event.clone();
    doc.metadata.preset = original.metadata.preset.clone();
    annotate(&mut doc, errors);
    doc
}

fn masked_statement(statement: &ProblemStatement) -> ProblemStatement {
    ProblemStatement {
        text: mask_leaks(&statement.text),
        title: statement.title.as_deref().map(mask_leaks),
        labels: statement.labels.iter().map(|l| mask_leaks(l)).collect(),
        url: statement.url.as_deref().map(mask_leaks),
        ..statement.clone()
    }
}

/// Mark `doc` as a fallback carrying the first few triggering errors
pub fn annotate(doc: &mut AgentConfiguration, errors: &[ValidationIssue]) {
    doc.metadata.fallback = true;
    doc.metadata.fallback_reason = Some(format!(
        "validation failed with {} error(s)",
        errors.len()
    ));
    doc.metadata.fallback_errors = errors
        .iter()
        .take(RETAINED_ERRORS)
        .map(ToString::to_string)
        .collect();
}
