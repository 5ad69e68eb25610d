//! Model provider identifiers

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream model vendor inferred from a model identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openrouter")]
    OpenRouter,
    Groq,
    Together,
    Mistral,
    Gemini,
    #[serde(rename = "azure")]
    AzureOpenAi,
    Ollama,
}

impl Provider {
    /// Every provider, in secret-scan order
    pub const ALL: [Provider; 10] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::DeepSeek,
        Provider::OpenRouter,
        Provider::Groq,
        Provider::Together,
        Provider::Mistral,
        Provider::Gemini,
        Provider::AzureOpenAi,
        Provider::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::DeepSeek => "deepseek",
            Provider::OpenRouter => "openrouter",
            Provider::Groq => "groq",
            Provider::Together => "together",
            Provider::Mistral => "mistral",
            Provider::Gemini => "gemini",
            Provider::AzureOpenAi => "azure",
            Provider::Ollama => "ollama",
        }
    }

    /// Providers that run on the caller's own hardware
    pub fn is_local(&self) -> bool {
        matches!(self, Provider::Ollama)
    }

    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.as_str()).collect()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        let provider = match lowered.as_str() {
            "openai" => Provider::OpenAi,
            "anthropic" | "claude" => Provider::Anthropic,
            "deepseek" => Provider::DeepSeek,
            "openrouter" => Provider::OpenRouter,
            "groq" => Provider::Groq,
            "together" | "togetherai" => Provider::Together,
            "mistral" => Provider::Mistral,
            "gemini" | "google" => Provider::Gemini,
            "azure" | "azure_openai" => Provider::AzureOpenAi,
            "ollama" | "local" => Provider::Ollama,
            _ => {
                return Err(ConfigError::invalid_enum(
                    "agent.model.provider",
                    s,
                    &Self::names(),
                ))
            }
        };
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("Claude".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert_eq!("local".parse::<Provider>().unwrap(), Provider::Ollama);
    }

    #[test]
    fn test_unknown_provider() {
        assert!("openia".parse::<Provider>().is_err());
    }

    #[test]
    fn test_serde_name_matches_as_str() {
        let yaml = serde_yaml::to_string(&Provider::AzureOpenAi).unwrap();
        assert_eq!(yaml.trim(), "azure");
    }
}
