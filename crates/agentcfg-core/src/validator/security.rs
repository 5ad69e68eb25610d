//! Stage 4: leaked secrets, unsafe paths and risky sandbox settings
//!
//! Every error here makes the document invalid regardless of mode.

use super::{IssueCategory, StageReport};
use agentcfg_config::loader::formats::yaml;
use agentcfg_config::AgentConfiguration;
use once_cell::sync::Lazy;
use regex::Regex;

/// Key shapes that must never appear in a serialized document
static LEAK_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("anthropic", r"\bsk-ant-[A-Za-z0-9_-]{20,}"),
        ("openrouter", r"\bsk-or-[A-Za-z0-9_-]{20,}"),
        ("openai", r"\bsk-(?:proj-)?[A-Za-z0-9_-]{20,}"),
        ("groq", r"\bgsk_[A-Za-z0-9]{20,}"),
        ("google", r"\bAIza[0-9A-Za-z_-]{35}"),
        ("github", r"\bghp_[A-Za-z0-9]{36}"),
        ("github", r"\bgithub_pat_[A-Za-z0-9_]{22,}"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid regex")))
    .collect()
});

const SENSITIVE_DIRS: &[&str] = &[
    "/", "/etc", "/root", "/bin", "/sbin", "/usr", "/boot", "/dev", "/proc", "/sys", "/var/run",
];

/// Fragments of variable names that suggest a credential
const SECRET_NAME_HINTS: &[&str] = &["KEY", "TOKEN", "SECRET", "PASSWORD"];

/// Leaked key-shaped substrings of `text`, redacted to their first characters
pub fn find_leaks(text: &str) -> Vec<(&'static str, String)> {
    let mut found: Vec<(&'static str, String)> = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for (kind, re) in LEAK_PATTERNS.iter() {
        for m in re.find_iter(text) {
            // `sk-ant-...` also matches the generic `sk-` pattern
            if spans.iter().any(|(s, e)| m.start() < *e && *s < m.end()) {
                continue;
            }
            spans.push((m.start(), m.end()));
            found.push((*kind, redact(m.as_str())));
        }
    }
    found
}

/// `text` with every key-shaped substring replaced by its redacted form
pub fn mask_leaks(text: &str) -> String {
    LEAK_PATTERNS.iter().fold(text.to_string(), |masked, (_, re)| {
        re.replace_all(&masked, |caps: &regex::Captures| redact(&caps[0]))
            .into_owned()
    })
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(6).collect();
    format!("{}***", visible)
}

/// Path traversal, home expansion, or a sensitive system directory
pub fn unsafe_workspace(path: &str) -> Option<String> {
    if path.split('/').any(|segment| segment == "..") {
        return Some("contains '..' traversal".to_string());
    }
    if path.contains('~') {
        return Some("contains '~' home expansion".to_string());
    }
    let normalized = match path.trim_end_matches('/') {
        "" => "/",
        other => other,
    };
    SENSITIVE_DIRS
        .iter()
        .find(|dir| {
            normalized == **dir
                || (**dir != "/" && normalized.starts_with(&format!("{}/", dir)))
        })
        .map(|dir| format!("targets sensitive system directory {}", dir))
}

/// Leak scan over the serialized document; a document that cannot be serialized is not clean
fn scan_serialized(serialized: agentcfg_config::Result<String>, report: &mut StageReport) {
    match serialized {
        Ok(text) => {
            for (kind, redacted) in find_leaks(&text) {
                report.error(
                    IssueCategory::Security,
                    "$",
                    format!("document contains a {} credential ({})", kind, redacted),
                );
            }
        }
        Err(err) => report.error(
            IssueCategory::Security,
            "$",
            format!("document could not be serialized for the credential scan: {}", err),
        ),
    }
}

pub fn check(config: &AgentConfiguration, report: &mut StageReport) {
    scan_serialized(yaml::to_string(config), report);

    if let Some(reason) = unsafe_workspace(&config.env.workspace.path) {
        report.error(
            IssueCategory::Security,
            "env.workspace.path",
            format!("workspace path '{}' {}", config.env.workspace.path, reason),
        );
    }

    for (index, tool) in config.agent.tools.iter().enumerate() {
        let unrestricted = tool
            .restricted_commands
            .as_ref()
            .map_or(true, |list| list.is_empty());
        if tool.is_shell() && unrestricted {
            report.warn(
                IssueCategory::Security,
                format!("agent.tools[{}].restricted_commands", index),
                "shell tool has no restricted command list",
            );
        }
    }

    if config.env.docker.as_ref().is_some_and(|d| d.uses_host_network()) {
        report.warn(
            IssueCategory::Security,
            "env.docker.network_mode",
            "host networking exposes the runner network to the agent",
        );
    }

    for (name, value) in &config.env.environment_variables {
        let upper = name.to_uppercase();
        let looks_secret = SECRET_NAME_HINTS.iter().any(|hint| upper.contains(hint));
        if looks_secret && !value.starts_with("${") {
            report.warn(
                IssueCategory::Security,
                format!("env.environment_variables.{}", name),
                "credential-like variable holds a literal value; use env.secrets",
            );
        }
    }
}
