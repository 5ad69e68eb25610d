//! Named option bundles for common task shapes

use crate::error::OrchestrationError;
use agentcfg_core::generator::{detect_command, Command, ProblemContext};
use agentcfg_core::PresetOverrides;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    IssueAnalysis,
    PrReview,
    CodeFix,
    TestGeneration,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::IssueAnalysis,
        Preset::PrReview,
        Preset::CodeFix,
        Preset::TestGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::IssueAnalysis => "issue_analysis",
            Preset::PrReview => "pr_review",
            Preset::CodeFix => "code_fix",
            Preset::TestGeneration => "test_generation",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::IssueAnalysis => "Investigate an issue and report findings without changes",
            Preset::PrReview => "Review the changes of a pull request",
            Preset::CodeFix => "Reproduce and fix a reported bug",
            Preset::TestGeneration => "Write or extend tests for existing code",
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            Preset::IssueAnalysis => 8192,
            Preset::PrReview => 16384,
            Preset::CodeFix => 8192,
            Preset::TestGeneration => 12288,
        }
    }

    pub fn max_iterations(&self) -> u32 {
        match self {
            Preset::IssueAnalysis => 30,
            Preset::PrReview => 40,
            Preset::CodeFix => 60,
            Preset::TestGeneration => 50,
        }
    }

    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            Preset::IssueAnalysis => &["find_file", "search_dir", "search_file"],
            Preset::PrReview => &["search_file", "git_diff"],
            Preset::CodeFix => &["str_replace_editor", "search_dir"],
            Preset::TestGeneration => &["create", "str_replace_editor"],
        }
    }

    pub fn overrides(&self) -> PresetOverrides {
        PresetOverrides {
            max_tokens: Some(self.max_tokens()),
            max_iterations: Some(self.max_iterations()),
            required_tools: self.required_tools().iter().map(|t| t.to_string()).collect(),
            label: Some(self.as_str().to_string()),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| OrchestrationError::UnknownPreset {
                name: s.to_string(),
                expected: Preset::ALL.map(|p| p.as_str()).join(", "),
            })
    }
}

fn preset_for_command(command: Command) -> Preset {
    match command {
        Command::Analyze => Preset::IssueAnalysis,
        Command::Fix => Preset::CodeFix,
        Command::Test => Preset::TestGeneration,
        Command::Review => Preset::PrReview,
    }
}

/// Preset for an event when the caller did not name one.
///
/// Explicit commands win; then pull request events; then issue labels.
pub fn auto_select(event: &str, action: Option<&str>, problem: &ProblemContext) -> Option<Preset> {
    let command_text = problem
        .comment
        .as_ref()
        .map(|c| c.body.as_str())
        .or_else(|| problem.trigger.as_ref().and_then(|t| t.text.as_deref()));
    if let Some(command) = command_text.and_then(detect_command) {
        return Some(preset_for_command(command));
    }

    match event {
        "pull_request" | "pull_request_target" => match action {
            Some("closed") => None,
            _ => Some(Preset::PrReview),
        },
        "pull_request_review" | "pull_request_review_comment" => Some(Preset::PrReview),
        "issue_comment" if problem.pull_request.is_some() => Some(Preset::PrReview),
        "issues" | "issue_comment" => {
            let issue = problem.issue.as_ref()?;
            if action == Some("closed") {
                None
            } else if issue.has_label("bug") {
                Some(Preset::CodeFix)
            } else if issue.has_label("test") || issue.has_label("tests") {
                Some(Preset::TestGeneration)
            } else {
                Some(Preset::IssueAnalysis)
            }
        }
        _ => None,
    }
}
