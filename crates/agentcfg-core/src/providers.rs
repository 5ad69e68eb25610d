//! Provider catalogue: models, pricing, ceilings, key formats and detection
//!
//! All tables are static. Rates are USD per 1K tokens.

use crate::mapper::RawEnvironment;
use agentcfg_config::{AgentSpec, Provider, THOUGHT_ACTION_PARSER, TOOL_CALLING_PARSER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Pricing and output ceiling of one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: &'static str,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    pub max_tokens: u32,
}

const fn model(name: &'static str, input: f64, output: f64, max_tokens: u32) -> ModelSpec {
    ModelSpec {
        name,
        input_per_1k: input,
        output_per_1k: output,
        max_tokens,
    }
}

/// Static defaults for one provider
#[derive(Debug)]
pub struct ProviderProfile {
    pub provider: Provider,
    /// Secrets the provider cannot run without
    pub secrets: &'static [&'static str],
    /// Anchored key-format pattern for the primary secret
    pub key_pattern: Option<&'static str>,
    /// Lowercase model-name prefixes that identify the provider
    pub model_prefixes: &'static [&'static str],
    pub models: &'static [ModelSpec],
    pub default_model: &'static str,
    /// Cheaper model of comparable capability, when one exists
    pub economy_model: Option<&'static str>,
    pub parser: &'static str,
    pub history_processor: &'static str,
    pub function_calling: bool,
    /// Ceiling used when the model itself is not in the catalogue
    pub max_tokens: u32,
    pub default_max_tokens: u32,
    pub supports_prompt_cache: bool,
}

impl ProviderProfile {
    /// Environment variable holding the primary API key
    pub fn primary_secret(&self) -> Option<&'static str> {
        self.secrets.first().copied()
    }

    pub fn model(&self, name: &str) -> Option<&'static ModelSpec> {
        let lowered = name.to_lowercase();
        self.models
            .iter()
            .find(|m| m.name.to_lowercase() == lowered)
    }
}

static PROFILES: [ProviderProfile; 10] = [
    ProviderProfile {
        provider: Provider::OpenAi,
        secrets: &["OPENAI_API_KEY"],
        key_pattern: Some(r"^sk-(proj-)?[A-Za-z0-9_-]{20,}$"),
        model_prefixes: &["gpt-", "o1", "o3", "chatgpt-"],
        models: &[
            model("gpt-4o", 0.0025, 0.01, 16384),
            model("gpt-4o-mini", 0.00015, 0.0006, 16384),
            model("gpt-4-turbo", 0.01, 0.03, 4096),
            model("gpt-4", 0.03, 0.06, 8192),
            model("gpt-3.5-turbo", 0.0005, 0.0015, 4096),
            model("o1-mini", 0.003, 0.012, 65536),
        ],
        default_model: "gpt-4o",
        economy_model: Some("gpt-4o-mini"),
        parser: TOOL_CALLING_PARSER,
        history_processor: "LastNObservations",
        function_calling: true,
        max_tokens: 16384,
        default_max_tokens: 4096,
        supports_prompt_cache: true,
    },
    ProviderProfile {
        provider: Provider::Anthropic,
        secrets: &["ANTHROPIC_API_KEY"],
        key_pattern: Some(r"^sk-ant-[A-Za-z0-9_-]{20,}$"),
        model_prefixes: &["claude"],
        models: &[
            model("claude-3-5-sonnet-20241022", 0.003, 0.015, 8192),
            model("claude-3-5-haiku-20241022", 0.0008, 0.004, 8192),
            model("claude-3-opus-20240229", 0.015, 0.075, 4096),
        ],
        default_model: "claude-3-5-sonnet-20241022",
        economy_model: Some("claude-3-5-haiku-20241022"),
        parser: TOOL_CALLING_PARSER,
        history_processor: "CacheControlHistoryProcessor",
        function_calling: true,
        max_tokens: 8192,
        default_max_tokens: 4096,
        supports_prompt_cache: true,
    },
    ProviderProfile {
        provider: Provider::DeepSeek,
        secrets: &["DEEPSEEK_API_KEY"],
        key_pattern: Some(r"^sk-[A-Za-z0-9]{20,}$"),
        model_prefixes: &["deepseek"],
        models: &[
            model("deepseek-chat", 0.00014, 0.00028, 8192),
            model("deepseek-coder", 0.00014, 0.00028, 8192),
            model("deepseek-reasoner", 0.00055, 0.00219, 8192),
        ],
        default_model: "deepseek-chat",
        economy_model: None,
        parser: TOOL_CALLING_PARSER,
        history_processor: "LastNObservations",
        function_calling: true,
        max_tokens: 8192,
        default_max_tokens: 4096,
        supports_prompt_cache: true,
    },
    ProviderProfile {
        provider: Provider::OpenRouter,
        secrets: &["OPENROUTER_API_KEY"],
        key_pattern: Some(r"^sk-or-(v1-)?[A-Za-z0-9]{20,}$"),
        model_prefixes: &[],
        models: &[],
        default_model: "openrouter/anthropic/claude-3.5-sonnet",
        economy_model: None,
        parser: TOOL_CALLING_PARSER,
        history_processor: "LastNObservations",
        function_calling: true,
        max_tokens: 8192,
        default_max_tokens: 4096,
        supports_prompt_cache: false,
    },
    ProviderProfile {
        provider: Provider::Groq,
        secrets: &["GROQ_API_KEY"],
        key_pattern: Some(r"^gsk_[A-Za-z0-9]{20,}$"),
        model_prefixes: &["llama-3", "mixtral"],
        models: &[
            model("llama-3.1-70b-versatile", 0.00059, 0.00079, 8192),
            model("llama-3.1-8b-instant", 0.00005, 0.00008, 8192),
            model("mixtral-8x7b-32768", 0.00024, 0.00024, 32768),
        ],
        default_model: "llama-3.1-70b-versatile",
        economy_model: Some("llama-3.1-8b-instant"),
        parser: TOOL_CALLING_PARSER,
        history_processor: "LastNObservations",
        function_calling: true,
        max_tokens: 8192,
        default_max_tokens: 4096,
        supports_prompt_cache: false,
    },
    ProviderProfile {
        provider: Provider::Together,
        secrets: &["TOGETHER_API_KEY"],
        key_pattern: Some(r"^[A-Za-z0-9]{40,}$"),
        model_prefixes: &["meta-llama/", "qwen/"],
        models: &[
            model("meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo", 0.00088, 0.00088, 8192),
            model("Qwen/Qwen2.5-Coder-32B-Instruct", 0.0008, 0.0008, 8192),
        ],
        default_model: "Qwen/Qwen2.5-Coder-32B-Instruct",
        economy_model: None,
        parser: THOUGHT_ACTION_PARSER,
        history_processor: "LastNObservations",
        function_calling: false,
        max_tokens: 8192,
        default_max_tokens: 4096,
        supports_prompt_cache: false,
    },
    ProviderProfile {
        provider: Provider::Mistral,
        secrets: &["MISTRAL_API_KEY"],
        key_pattern: Some(r"^[A-Za-z0-9]{32}$"),
        model_prefixes: &["mistral", "codestral"],
        models: &[
            model("mistral-large-latest", 0.002, 0.006, 8192),
            model("codestral-latest", 0.0003, 0.0009, 8192),
            model("mistral-small-latest", 0.0002, 0.0006, 8192),
        ],
        default_model: "mistral-large-latest",
        economy_model: Some("mistral-small-latest"),
        parser: TOOL_CALLING_PARSER,
        history_processor: "LastNObservations",
        function_calling: true,
        max_tokens: 8192,
        default_max_tokens: 4096,
        supports_prompt_cache: false,
    },
    ProviderProfile {
        provider: Provider::Gemini,
        secrets: &["GEMINI_API_KEY"],
        key_pattern: Some(r"^AIza[0-9A-Za-z_-]{35}$"),
        model_prefixes: &["gemini"],
        models: &[
            model("gemini-1.5-pro", 0.00125, 0.005, 8192),
            model("gemini-1.5-flash", 0.000075, 0.0003, 8192),
        ],
        default_model: "gemini-1.5-pro",
        economy_model: Some("gemini-1.5-flash"),
        parser: TOOL_CALLING_PARSER,
        history_processor: "LastNObservations",
        function_calling: true,
        max_tokens: 8192,
        default_max_tokens: 4096,
        supports_prompt_cache: false,
    },
    ProviderProfile {
        provider: Provider::AzureOpenAi,
        secrets: &["AZURE_OPENAI_API_KEY", "AZURE_OPENAI_ENDPOINT"],
        key_pattern: Some(r"^[A-Fa-f0-9]{32}$"),
        model_prefixes: &[],
        models: &[],
        default_model: "azure/gpt-4o",
        economy_model: Some("azure/gpt-4o-mini"),
        parser: TOOL_CALLING_PARSER,
        history_processor: "LastNObservations",
        function_calling: true,
        max_tokens: 16384,
        default_max_tokens: 4096,
        supports_prompt_cache: false,
    },
    ProviderProfile {
        provider: Provider::Ollama,
        secrets: &[],
        key_pattern: None,
        model_prefixes: &["llama3", "qwen2", "codellama"],
        models: &[
            model("llama3.1", 0.0, 0.0, 8192),
            model("qwen2.5-coder", 0.0, 0.0, 32768),
            model("codellama", 0.0, 0.0, 4096),
        ],
        default_model: "llama3.1",
        economy_model: None,
        parser: THOUGHT_ACTION_PARSER,
        history_processor: "LastNObservations",
        function_calling: false,
        max_tokens: 8192,
        default_max_tokens: 4096,
        supports_prompt_cache: false,
    },
];

static KEY_PATTERNS: Lazy<HashMap<Provider, Regex>> = Lazy::new(|| {
    PROFILES
        .iter()
        .filter_map(|p| {
            p.key_pattern
                .and_then(|pattern| Regex::new(pattern).ok())
                .map(|re| (p.provider, re))
        })
        .collect()
});

pub fn profile(provider: Provider) -> &'static ProviderProfile {
    PROFILES
        .iter()
        .find(|p| p.provider == provider)
        .unwrap_or(&PROFILES[0])
}

pub fn profiles() -> &'static [ProviderProfile] {
    &PROFILES
}

/// How the provider was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Explicit,
    ModelPattern,
    SecretPresent,
    Default,
}

/// Outcome of provider detection for one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDetection {
    pub provider: Provider,
    pub source: DetectionSource,
    /// Model name with any `<provider>/` prefix removed
    pub model: String,
    pub api_key_env: Option<&'static str>,
    pub key_present: bool,
    pub key_valid: bool,
}

/// Split a `<provider>/<model>` name when the prefix names a known provider
pub fn split_provider_prefix(model: &str) -> Option<(Provider, &str)> {
    let (prefix, rest) = model.split_once('/')?;
    let provider = prefix.parse::<Provider>().ok()?;
    Some((provider, rest))
}

/// Provider implied by the model name alone
pub fn match_model(model: &str) -> Option<Provider> {
    if let Some((provider, _)) = split_provider_prefix(model) {
        return Some(provider);
    }

    let lowered = model.to_lowercase();
    PROFILES
        .iter()
        .find(|p| p.model(&lowered).is_some())
        .or_else(|| {
            PROFILES.iter().find(|p| {
                p.model_prefixes
                    .iter()
                    .any(|prefix| lowered.starts_with(prefix))
            })
        })
        .map(|p| p.provider)
}

/// First provider, in catalogue order, whose primary secret is set
pub fn provider_with_secret(env: &RawEnvironment) -> Option<Provider> {
    PROFILES
        .iter()
        .find(|p| p.primary_secret().is_some_and(|s| env.get(s).is_some()))
        .map(|p| p.provider)
}

/// Resolve the active provider: explicit override, then model pattern, then first
/// provider with a secret present, then the hard default.
pub fn resolve_provider(
    explicit: Option<Provider>,
    model: Option<&str>,
    env: &RawEnvironment,
) -> (Provider, DetectionSource) {
    explicit
        .map(|p| (p, DetectionSource::Explicit))
        .or_else(|| model.and_then(match_model).map(|p| (p, DetectionSource::ModelPattern)))
        .or_else(|| provider_with_secret(env).map(|p| (p, DetectionSource::SecretPresent)))
        .unwrap_or((Provider::OpenAi, DetectionSource::Default))
}

/// Detect the provider of `model` and check its key in `env`
pub fn detect_provider(model: &str, env: &RawEnvironment) -> ProviderDetection {
    let (provider, source) = resolve_provider(None, Some(model), env);
    let stripped = split_provider_prefix(model)
        .map(|(_, rest)| rest)
        .unwrap_or(model)
        .to_string();
    let api_key_env = profile(provider).primary_secret();
    let key = api_key_env.and_then(|name| env.get(name));

    ProviderDetection {
        provider,
        source,
        model: stripped,
        api_key_env,
        key_present: key.is_some(),
        key_valid: match (api_key_env, key) {
            (None, _) => true,
            (Some(_), Some(key)) => validate_api_key(provider, key),
            (Some(_), None) => false,
        },
    }
}

/// Whether `key` has the provider's documented shape
pub fn validate_api_key(provider: Provider, key: &str) -> bool {
    match KEY_PATTERNS.get(&provider) {
        Some(re) => re.is_match(key.trim()),
        None => true,
    }
}

/// Catalogue entry for a model, looking through provider prefixes
pub fn model_spec(model: &str) -> Option<&'static ModelSpec> {
    let mut candidates = vec![model];
    if let Some((_, rest)) = split_provider_prefix(model) {
        candidates.push(rest);
    }
    if let Some((_, last)) = model.rsplit_once('/') {
        candidates.push(last);
    }

    candidates
        .into_iter()
        .find_map(|name| PROFILES.iter().find_map(|p| p.model(name)))
}

/// Known output-token ceiling of a model
pub fn model_ceiling(model: &str) -> Option<u32> {
    model_spec(model).map(|m| m.max_tokens)
}

/// Rates for a model, falling back to the provider's default model
pub fn model_rates(model: &str, provider: Provider) -> (f64, f64) {
    model_spec(model)
        .or_else(|| model_spec(profile(provider).default_model))
        .map(|m| (m.input_per_1k, m.output_per_1k))
        .unwrap_or((0.003, 0.015))
}

/// Share of tokens assumed to be input (prompt + history) in a single call
pub const INPUT_SHARE: f64 = 0.7;

/// Cost of `tokens` tokens on the provider's default model
pub fn estimate_cost(provider: Provider, tokens: u64) -> f64 {
    let (input, output) = model_rates(profile(provider).default_model, provider);
    let thousands = tokens as f64 / 1000.0;
    thousands * (INPUT_SHARE * input + (1.0 - INPUT_SHARE) * output)
}

/// Tokens consumed by one agent iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationTokens {
    pub input: u64,
    pub output: u64,
}

/// Fixed system prompt and tool schema overhead per call
const PROMPT_OVERHEAD_TOKENS: u64 = 1500;

/// Heuristic token usage of one iteration: the history window (mostly full) plus fixed
/// overhead in, a fraction of the output ceiling out
pub fn iteration_tokens(agent: &AgentSpec) -> IterationTokens {
    let window = agent.history_processor.window_size as u64;
    IterationTokens {
        input: (window as f64 * 0.75) as u64 + PROMPT_OVERHEAD_TOKENS,
        output: (agent.model.max_tokens as f64 * 0.15) as u64,
    }
}

/// Estimated spend of a full run at `max_iterations`
pub fn estimate_run_cost(agent: &AgentSpec) -> f64 {
    estimate_iteration_cost(agent) * agent.max_iterations as f64
}

pub fn estimate_iteration_cost(agent: &AgentSpec) -> f64 {
    let (input_rate, output_rate) = model_rates(&agent.model.name, agent.model.provider);
    let tokens = iteration_tokens(agent);
    tokens.input as f64 / 1000.0 * input_rate + tokens.output as f64 / 1000.0 * output_rate
}
