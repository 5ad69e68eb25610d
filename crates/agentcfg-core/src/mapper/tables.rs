//! Fixed environment lookup tables

use super::value::{MappedValue, ValueKind};

/// Environment variable copied verbatim to a dot-path
#[derive(Debug, Clone, Copy)]
pub struct SecretMapping {
    pub env: &'static str,
    pub path: &'static str,
}

/// Environment variable coerced and checked against a kind
#[derive(Debug, Clone, Copy)]
pub struct VariableMapping {
    pub env: &'static str,
    pub path: &'static str,
    pub kind: ValueKind,
}

const fn secret(env: &'static str, path: &'static str) -> SecretMapping {
    SecretMapping { env, path }
}

const fn var(env: &'static str, path: &'static str, kind: ValueKind) -> VariableMapping {
    VariableMapping { env, path, kind }
}

pub const SECRETS: &[SecretMapping] = &[
    secret("OPENAI_API_KEY", "secrets.openai_api_key"),
    secret("ANTHROPIC_API_KEY", "secrets.anthropic_api_key"),
    secret("DEEPSEEK_API_KEY", "secrets.deepseek_api_key"),
    secret("OPENROUTER_API_KEY", "secrets.openrouter_api_key"),
    secret("GROQ_API_KEY", "secrets.groq_api_key"),
    secret("TOGETHER_API_KEY", "secrets.together_api_key"),
    secret("MISTRAL_API_KEY", "secrets.mistral_api_key"),
    secret("GEMINI_API_KEY", "secrets.gemini_api_key"),
    secret("AZURE_OPENAI_API_KEY", "secrets.azure_openai_api_key"),
    secret("AZURE_OPENAI_ENDPOINT", "secrets.azure_openai_endpoint"),
    secret("GITHUB_TOKEN", "secrets.github_token"),
    secret("MODAL_TOKEN_ID", "secrets.modal_token_id"),
    secret("MODAL_TOKEN_SECRET", "secrets.modal_token_secret"),
    secret("DOCKER_USERNAME", "secrets.docker_username"),
    secret("DOCKER_PASSWORD", "secrets.docker_password"),
    secret("WEBHOOK_SECRET", "secrets.webhook_secret"),
];

pub const VARIABLES: &[VariableMapping] = &[
    var("SWE_AGENT_MODEL", paths::MODEL_NAME, ValueKind::Text),
    var("SWE_AGENT_PROVIDER", paths::MODEL_PROVIDER, ValueKind::Text),
    var("SWE_AGENT_TEMPERATURE", paths::TEMPERATURE, ValueKind::Number),
    var("SWE_AGENT_TOP_P", paths::TOP_P, ValueKind::Number),
    var("SWE_AGENT_MAX_TOKENS", paths::MAX_TOKENS, ValueKind::Integer),
    var("SWE_AGENT_TIMEOUT", paths::MODEL_TIMEOUT, ValueKind::Integer),
    var("SWE_AGENT_API_BASE", paths::API_BASE, ValueKind::Text),
    var("SWE_AGENT_COST_LIMIT", paths::COST_LIMIT, ValueKind::Number),
    var("SWE_AGENT_MAX_ITERATIONS", paths::MAX_ITERATIONS, ValueKind::Integer),
    var("SWE_AGENT_PARSER", paths::PARSER_NAME, ValueKind::Text),
    var("SWE_AGENT_FUNCTION_CALLING", paths::FUNCTION_CALLING, ValueKind::Bool),
    var("SWE_AGENT_HISTORY_PROCESSOR", paths::HISTORY_NAME, ValueKind::Text),
    var("SWE_AGENT_HISTORY_WINDOW", paths::HISTORY_WINDOW, ValueKind::Integer),
    var("SWE_AGENT_TOOLS", paths::TOOLS, ValueKind::Json),
    var("SWE_AGENT_DEPLOYMENT", paths::DEPLOYMENT, ValueKind::Text),
    var("SWE_AGENT_DOCKER_IMAGE", paths::DOCKER_IMAGE, ValueKind::Text),
    var("SWE_AGENT_DOCKER_MEMORY", paths::DOCKER_MEMORY, ValueKind::Text),
    var("SWE_AGENT_DOCKER_CPUS", paths::DOCKER_CPUS, ValueKind::Number),
    var("SWE_AGENT_DOCKER_NETWORK", paths::DOCKER_NETWORK, ValueKind::Text),
    var("SWE_AGENT_MODAL_IMAGE", paths::MODAL_IMAGE, ValueKind::Text),
    var("SWE_AGENT_MODAL_CPU", paths::MODAL_CPU, ValueKind::Number),
    var("SWE_AGENT_MODAL_MEMORY", paths::MODAL_MEMORY, ValueKind::Text),
    var("SWE_AGENT_MODAL_TIMEOUT", paths::MODAL_TIMEOUT, ValueKind::Integer),
    var("SWE_AGENT_WORKSPACE", paths::WORKSPACE_PATH, ValueKind::Text),
    var("SWE_AGENT_WORKSPACE_TIMEOUT", paths::WORKSPACE_TIMEOUT, ValueKind::Integer),
    var("SWE_AGENT_REPO_LANGUAGE", paths::REPO_LANGUAGE, ValueKind::Text),
    var("SWE_AGENT_ENV_VARS", paths::ENV_VARS, ValueKind::Json),
    var("SWE_AGENT_OPTIMIZATION_MODE", paths::OPTIMIZATION_MODE, ValueKind::Text),
    var("SWE_AGENT_PERFORMANCE_PROFILE", paths::PERFORMANCE_PROFILE, ValueKind::Text),
    var("SWE_AGENT_LOG_LEVEL", paths::LOG_LEVEL, ValueKind::Text),
    var("GITHUB_REPOSITORY", paths::GITHUB_REPOSITORY, ValueKind::Text),
    var("GITHUB_SHA", paths::GITHUB_SHA, ValueKind::Text),
    var("GITHUB_REF", paths::GITHUB_REF, ValueKind::Text),
    var("GITHUB_SERVER_URL", paths::GITHUB_SERVER_URL, ValueKind::Text),
    var("GITHUB_ACTOR", paths::GITHUB_ACTOR, ValueKind::Text),
    var("GITHUB_EVENT_NAME", paths::GITHUB_EVENT_NAME, ValueKind::Text),
    var("GITHUB_RUN_ID", paths::GITHUB_RUN_ID, ValueKind::Text),
];

/// Dot-paths shared by the mapper and its consumers
pub mod paths {
    pub const MODEL_NAME: &str = "agent.model.name";
    pub const MODEL_PROVIDER: &str = "agent.model.provider";
    pub const TEMPERATURE: &str = "agent.model.temperature";
    pub const TOP_P: &str = "agent.model.top_p";
    pub const MAX_TOKENS: &str = "agent.model.max_tokens";
    pub const MODEL_TIMEOUT: &str = "agent.model.timeout";
    pub const API_BASE: &str = "agent.model.api_base";
    pub const API_KEY_ENV: &str = "agent.model.api_key_env";
    pub const COST_LIMIT: &str = "agent.cost_limit";
    pub const MAX_ITERATIONS: &str = "agent.max_iterations";
    pub const PARSER_NAME: &str = "agent.parser.name";
    pub const FUNCTION_CALLING: &str = "agent.parser.function_calling";
    pub const HISTORY_NAME: &str = "agent.history_processor.name";
    pub const HISTORY_WINDOW: &str = "agent.history_processor.window_size";
    pub const TOOLS: &str = "agent.tools";
    pub const DEPLOYMENT: &str = "env.deployment.type";
    pub const DOCKER_IMAGE: &str = "env.docker.image";
    pub const DOCKER_MEMORY: &str = "env.docker.memory";
    pub const DOCKER_CPUS: &str = "env.docker.cpus";
    pub const DOCKER_NETWORK: &str = "env.docker.network_mode";
    pub const MODAL_IMAGE: &str = "env.modal.image";
    pub const MODAL_CPU: &str = "env.modal.cpu";
    pub const MODAL_MEMORY: &str = "env.modal.memory";
    pub const MODAL_TIMEOUT: &str = "env.modal.timeout";
    pub const WORKSPACE_PATH: &str = "env.workspace.path";
    pub const WORKSPACE_TIMEOUT: &str = "env.workspace.timeout";
    pub const REPO_LANGUAGE: &str = "env.repo.language";
    pub const ENV_VARS: &str = "env.environment_variables";
    pub const OPTIMIZATION_MODE: &str = "optimization.mode";
    pub const PERFORMANCE_PROFILE: &str = "optimization.profile";
    pub const LOG_LEVEL: &str = "logging.level";
    pub const GITHUB_REPOSITORY: &str = "github.repository";
    pub const GITHUB_SHA: &str = "github.sha";
    pub const GITHUB_REF: &str = "github.ref";
    pub const GITHUB_SERVER_URL: &str = "github.server_url";
    pub const GITHUB_ACTOR: &str = "github.actor";
    pub const GITHUB_EVENT_NAME: &str = "github.event_name";
    pub const GITHUB_RUN_ID: &str = "github.run_id";
}

pub const DEFAULT_COST_LIMIT: f64 = 2.0;
pub const DEFAULT_MAX_ITERATIONS: i64 = 50;
pub const DEFAULT_DOCKER_IMAGE: &str = "sweagent/swe-agent:latest";
pub const DEFAULT_MODAL_IMAGE: &str = "python:3.11";
pub const DEFAULT_WORKSPACE: &str = "/workspace";

/// Provider-independent defaults; `agent.model.name` is filled from the resolved provider
pub fn defaults() -> Vec<(&'static str, MappedValue)> {
    vec![
        (paths::TEMPERATURE, MappedValue::Float(0.0)),
        (paths::TOP_P, MappedValue::Float(1.0)),
        (paths::MODEL_TIMEOUT, MappedValue::Int(300)),
        (paths::COST_LIMIT, MappedValue::Float(DEFAULT_COST_LIMIT)),
        (paths::MAX_ITERATIONS, MappedValue::Int(DEFAULT_MAX_ITERATIONS)),
        (paths::DEPLOYMENT, MappedValue::Text("docker".to_string())),
        (paths::WORKSPACE_PATH, MappedValue::Text(DEFAULT_WORKSPACE.to_string())),
        (paths::WORKSPACE_TIMEOUT, MappedValue::Int(3600)),
        (
            paths::GITHUB_SERVER_URL,
            MappedValue::Text("https://github.com".to_string()),
        ),
        (paths::OPTIMIZATION_MODE, MappedValue::Text("balanced".to_string())),
        (paths::LOG_LEVEL, MappedValue::Text("info".to_string())),
    ]
}

/// Defaults of the selected deployment block only
pub fn deployment_defaults(deployment: &str) -> Vec<(&'static str, MappedValue)> {
    match deployment {
        "docker" => vec![
            (paths::DOCKER_IMAGE, MappedValue::Text(DEFAULT_DOCKER_IMAGE.to_string())),
            (paths::DOCKER_MEMORY, MappedValue::Text("4g".to_string())),
            (paths::DOCKER_CPUS, MappedValue::Float(2.0)),
        ],
        "modal" => vec![
            (paths::MODAL_IMAGE, MappedValue::Text(DEFAULT_MODAL_IMAGE.to_string())),
            (paths::MODAL_CPU, MappedValue::Float(2.0)),
            (paths::MODAL_MEMORY, MappedValue::Text("4g".to_string())),
            (paths::MODAL_TIMEOUT, MappedValue::Int(3600)),
        ],
        _ => vec![],
    }
}

/// Secrets a modal deployment needs regardless of provider
pub const MODAL_SECRETS: &[&str] = &["MODAL_TOKEN_ID", "MODAL_TOKEN_SECRET"];

/// Dot-path of a secret environment name
pub fn secret_path(env: &str) -> String {
    SECRETS
        .iter()
        .find(|s| s.env == env)
        .map(|s| s.path.to_string())
        .unwrap_or_else(|| format!("secrets.{}", env.to_lowercase()))
}
