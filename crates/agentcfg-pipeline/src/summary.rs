//! Redacted view of a package for comment formatting
//!
//! Built only from validation and optimization metadata; the secrets map is never read.

use crate::orchestrator::ConfigPackage;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSummary {
    pub model: String,
    pub provider: String,
    pub preset: Option<String>,
    pub valid: bool,
    pub fallback: bool,
    pub error_fallback: bool,
    pub errors: Vec<String>,
    pub warnings: usize,
    pub optimizations: Vec<String>,
    pub estimated_cost: Option<f64>,
    pub estimated_saving: Option<f64>,
}

impl PackageSummary {
    pub fn from_package(package: &ConfigPackage) -> Self {
        let meta = &package.metadata;
        let validation = package.validation.as_ref();
        let optimization = package.optimization.as_ref();
        Self {
            model: meta.model.clone(),
            provider: meta.provider.clone(),
            preset: meta.preset.clone(),
            valid: validation.is_some_and(|v| v.valid),
            fallback: meta.fallback,
            error_fallback: meta.error_fallback,
            errors: validation.map(|v| v.error_messages()).unwrap_or_default(),
            warnings: validation.map_or(0, |v| v.warnings.len()),
            optimizations: optimization
                .map(|o| o.metadata.applied.clone())
                .unwrap_or_default(),
            estimated_cost: optimization.map(|o| o.cost_impact.after),
            estimated_saving: optimization.map(|o| o.cost_impact.saving),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let status = if self.error_fallback {
            "emergency configuration"
        } else if self.fallback {
            "fallback configuration"
        } else if self.valid {
            "valid"
        } else {
            "invalid"
        };
        let _ = writeln!(out, "**Agent configuration**: {}", status);
        let _ = writeln!(out);
        let _ = writeln!(out, "| Model | Provider | Preset |");
        let _ = writeln!(out, "|---|---|---|");
        let _ = writeln!(
            out,
            "| `{}` | {} | {} |",
            self.model,
            self.provider,
            self.preset.as_deref().unwrap_or("-")
        );
        if let Some(cost) = self.estimated_cost {
            let _ = writeln!(out);
            let _ = write!(out, "Estimated cost per run: ${:.2}", cost);
            match self.estimated_saving {
                Some(saving) if saving > 0.0 => {
                    let _ = writeln!(out, " (saves ${:.2})", saving);
                }
                _ => {
                    let _ = writeln!(out);
                }
            }
        }
        if !self.optimizations.is_empty() {
            let _ = writeln!(out, "Optimizations: {}", self.optimizations.join(", "));
        }
        if !self.errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "<details><summary>{} validation error(s)</summary>", self.errors.len());
            let _ = writeln!(out);
            for error in &self.errors {
                let _ = writeln!(out, "- {}", error);
            }
            let _ = writeln!(out, "</details>");
        }
        out
    }
}
