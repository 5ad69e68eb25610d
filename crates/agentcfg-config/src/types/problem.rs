//! Problem statement section of the agent configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of task the agent is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    PullRequestReview,
    BugFix,
    FeatureRequest,
    /// `analyze` command: insights without code changes
    Analysis,
    /// `fix` command
    FixRequest,
    /// `test` command
    TestRequest,
    /// `review` command
    CodeReview,
    GeneralAnalysis,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::PullRequestReview => "pull_request_review",
            ProblemType::BugFix => "bug_fix",
            ProblemType::FeatureRequest => "feature_request",
            ProblemType::Analysis => "analysis",
            ProblemType::FixRequest => "fix_request",
            ProblemType::TestRequest => "test_request",
            ProblemType::CodeReview => "code_review",
            ProblemType::GeneralAnalysis => "general_analysis",
        }
    }

    /// Whether the agent is expected to produce a patch
    pub fn expects_changes(&self) -> bool {
        matches!(
            self,
            ProblemType::BugFix | ProblemType::FeatureRequest | ProblemType::FixRequest
        )
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `problem_statement` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemStatement {
    #[serde(rename = "type")]
    pub kind: ProblemType,

    /// Instance id, `<repo-name>-<number>` when a number is known
    pub id: String,

    /// Full text handed to the agent
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for ProblemStatement {
    fn default() -> Self {
        Self {
            kind: ProblemType::GeneralAnalysis,
            id: "unknown".to_string(),
            text: "Analyze the repository and report findings.".to_string(),
            title: None,
            labels: Vec::new(),
            url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_serializes_snake_case() {
        let yaml = serde_yaml::to_string(&ProblemType::PullRequestReview).unwrap();
        assert_eq!(yaml.trim(), "pull_request_review");
        assert_eq!(ProblemType::BugFix.to_string(), "bug_fix");
    }

    #[test]
    fn test_kind_field_renamed_to_type() {
        let statement = ProblemStatement::default();
        let yaml = serde_yaml::to_string(&statement).unwrap();
        assert!(yaml.contains("type: general_analysis"));
        assert!(!yaml.contains("labels"));
    }
}
