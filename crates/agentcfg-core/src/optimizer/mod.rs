//! Cost and performance optimization
//!
//! The optimizer analyses a document, walks the strategy registry in priority order,
//! gates each proposal by the optimization mode and merges the applicable patches onto
//! a clone of the input. The input is never modified.

pub mod analysis;
pub mod patch;
pub mod strategy;

use crate::cache::{hash_parts, CachePolicy, TtlCache};
use agentcfg_config::{AgentConfiguration, OptimizationMode, OptimizationSettings, PerformanceProfile};
use analysis::{analyze, ConfigAnalysis};
use patch::ConfigPatch;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use strategy::{StrategyCategory, StrategyKind, REGISTRY};
use tracing::debug;

/// Default lifetime of cached optimization results
pub const OPTIMIZATION_TTL: Duration = Duration::from_secs(600);

pub type OptimizationCache = TtlCache<String, OptimizationResult>;

#[derive(Debug, Clone)]
pub struct OptimizationOptions {
    pub mode: OptimizationMode,
    /// Clamp the optimized document to this profile's ceilings
    pub profile: Option<PerformanceProfile>,
    /// Also apply strategies that are not auto-applied (model selection)
    pub apply_manual: bool,
    pub use_cache: bool,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            mode: OptimizationMode::Balanced,
            profile: None,
            apply_manual: false,
            use_cache: true,
        }
    }
}

impl OptimizationOptions {
    pub fn from_settings(settings: &OptimizationSettings) -> Self {
        Self {
            mode: settings.mode,
            profile: settings.profile,
            apply_manual: settings.apply_manual,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub strategy: StrategyKind,
    pub category: StrategyCategory,
    pub priority: usize,
    pub potential: f64,
    pub auto_apply: bool,
    /// Whether the patch was merged into the optimized document
    pub applied: bool,
    pub estimated_saving: f64,
    pub rationale: String,
    pub changes: ConfigPatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostImpact {
    pub before: f64,
    pub after: f64,
    pub saving: f64,
    /// Percentage of `before`
    pub saving_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceImpact {
    pub before_score: f64,
    pub after_score: f64,
    pub improvement: f64,
    pub max_run_secs_before: u64,
    pub max_run_secs_after: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationMetadata {
    pub mode: OptimizationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<PerformanceProfile>,
    /// Names of the strategies merged into the optimized document
    pub applied: Vec<String>,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub original_config: AgentConfiguration,
    pub optimized_config: AgentConfiguration,
    pub analysis: ConfigAnalysis,
    pub recommendations: Vec<Recommendation>,
    pub cost_impact: CostImpact,
    pub performance_impact: PerformanceImpact,
    pub metadata: OptimizationMetadata,
}

impl OptimizationResult {
    /// The combined patch that turned the original into the optimized document
    pub fn applied_patch(&self) -> ConfigPatch {
        self.recommendations
            .iter()
            .filter(|r| r.applied)
            .fold(ConfigPatch::default(), |acc, r| acc.merge(&r.changes))
    }
}

pub struct CostPerformanceOptimizer {
    cache: Arc<OptimizationCache>,
}

impl Default for CostPerformanceOptimizer {
    fn default() -> Self {
        Self::new(Arc::new(TtlCache::new(CachePolicy::with_ttl(OPTIMIZATION_TTL))))
    }
}

impl CostPerformanceOptimizer {
    pub fn new(cache: Arc<OptimizationCache>) -> Self {
        Self { cache }
    }

    pub fn optimize_configuration(
        &self,
        config: &AgentConfiguration,
        options: &OptimizationOptions,
    ) -> OptimizationResult {
        let key = cache_key(config, options);
        if options.use_cache {
            if let Some(mut hit) = self.cache.get(&key) {
                debug!(mode = options.mode.as_str(), "Optimization cache hit");
                hit.metadata.cached = true;
                return hit;
            }
        }

        let result = optimize(config, options);
        debug!(
            mode = options.mode.as_str(),
            recommendations = result.recommendations.len(),
            applied = result.metadata.applied.len(),
            saving = result.cost_impact.saving,
            "Optimization complete"
        );
        if options.use_cache {
            self.cache.insert(key, result.clone());
        }
        result
    }

    /// Recommendations only, without building an optimized document
    pub fn recommend(
        &self,
        config: &AgentConfiguration,
        options: &OptimizationOptions,
    ) -> Vec<Recommendation> {
        recommendations(config, &analyze(config), options)
    }
}

fn cache_key(config: &AgentConfiguration, options: &OptimizationOptions) -> String {
    let serialized = serde_json::to_string(config).unwrap_or_default();
    let profile = options.profile.map(|p| p.as_str()).unwrap_or("none");
    let manual = if options.apply_manual { "manual" } else { "auto" };
    hash_parts(&[&serialized, options.mode.as_str(), profile, manual])
}

fn recommendations(
    config: &AgentConfiguration,
    analysis: &ConfigAnalysis,
    options: &OptimizationOptions,
) -> Vec<Recommendation> {
    REGISTRY
        .iter()
        .filter_map(|kind| {
            let proposal = kind.propose(config, analysis)?;
            if proposal.patch.is_empty() || !kind.applicable(options.mode, &proposal) {
                return None;
            }
            let auto_apply = kind.auto_apply();
            Some(Recommendation {
                strategy: *kind,
                category: kind.category(),
                priority: kind.priority(),
                potential: proposal.potential,
                auto_apply,
                applied: auto_apply || options.apply_manual,
                estimated_saving: proposal.estimated_saving,
                rationale: proposal.rationale,
                changes: proposal.patch,
            })
        })
        .collect()
}

fn optimize(config: &AgentConfiguration, options: &OptimizationOptions) -> OptimizationResult {
    let analysis = analyze(config);
    let recommendations = recommendations(config, &analysis, options);

    let merged = recommendations
        .iter()
        .filter(|r| r.applied)
        .fold(ConfigPatch::default(), |acc, r| acc.merge(&r.changes));

    let mut optimized = config.clone();
    merged.apply_to(&mut optimized);
    if let Some(profile) = options.profile {
        clamp_to_profile(&mut optimized, profile);
    }

    let after = analyze(&optimized);
    let cost_impact = cost_impact(&analysis, &after);
    let performance_impact = PerformanceImpact {
        before_score: analysis.performance.overall,
        after_score: after.performance.overall,
        improvement: after.performance.overall - analysis.performance.overall,
        max_run_secs_before: analysis.performance.max_run_secs,
        max_run_secs_after: after.performance.max_run_secs,
    };

    OptimizationResult {
        original_config: config.clone(),
        optimized_config: optimized,
        analysis,
        metadata: OptimizationMetadata {
            mode: options.mode,
            profile: options.profile,
            applied: recommendations
                .iter()
                .filter(|r| r.applied)
                .map(|r| r.strategy.as_str().to_string())
                .collect(),
            cached: false,
        },
        recommendations,
        cost_impact,
        performance_impact,
    }
}

fn cost_impact(before: &ConfigAnalysis, after: &ConfigAnalysis) -> CostImpact {
    let (b, a) = (before.cost.estimated_total, after.cost.estimated_total);
    CostImpact {
        before: b,
        after: a,
        saving: b - a,
        saving_pct: if b > 0.0 { (b - a) / b * 100.0 } else { 0.0 },
    }
}

/// Hold max_tokens, timeout and iterations under the profile ceilings
fn clamp_to_profile(config: &mut AgentConfiguration, profile: PerformanceProfile) {
    let ceilings = profile.ceilings();
    let agent = &mut config.agent;
    agent.model.max_tokens = agent.model.max_tokens.min(ceilings.max_tokens);
    agent.model.timeout = agent.model.timeout.min(ceilings.timeout);
    agent.max_iterations = agent.max_iterations.min(ceilings.max_iterations);

    if agent.history_processor.window_size > agent.model.max_tokens {
        agent.history_processor.window_size = (agent.model.max_tokens as f64 * 0.4) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::test_support::valid_config;

    fn uncached(mode: OptimizationMode) -> OptimizationOptions {
        OptimizationOptions {
            mode,
            use_cache: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let config = valid_config();
        let before = config.clone();
        let result = CostPerformanceOptimizer::default()
            .optimize_configuration(&config, &uncached(OptimizationMode::Aggressive));
        assert_eq!(config, before);
        assert_eq!(result.original_config, before);
    }

    #[test]
    fn test_model_selection_needs_confirmation() {
        let config = valid_config();
        let optimizer = CostPerformanceOptimizer::default();
        let result = optimizer.optimize_configuration(&config, &uncached(OptimizationMode::Aggressive));
        let model = result
            .recommendations
            .iter()
            .find(|r| r.strategy == StrategyKind::ModelSelection)
            .unwrap();
        assert!(!model.auto_apply && !model.applied);
        assert_eq!(result.optimized_config.agent.model.name, "gpt-4o");

        let manual = OptimizationOptions {
            apply_manual: true,
            ..uncached(OptimizationMode::Aggressive)
        };
        let result = optimizer.optimize_configuration(&config, &manual);
        assert_eq!(result.optimized_config.agent.model.name, "gpt-4o-mini");
        assert!(result.cost_impact.saving > 0.0);
    }

    #[test]
    fn test_recommendations_follow_priority_order() {
        let result = CostPerformanceOptimizer::default()
            .optimize_configuration(&valid_config(), &uncached(OptimizationMode::Aggressive));
        let priorities: Vec<usize> = result.recommendations.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_deterministic_replay() {
        let optimizer = CostPerformanceOptimizer::default();
        let options = uncached(OptimizationMode::Balanced);
        let a = optimizer.optimize_configuration(&valid_config(), &options);
        let b = optimizer.optimize_configuration(&valid_config(), &options);
        assert_eq!(a, b);
    }

    #[test]
    fn test_conservative_applies_less_than_aggressive() {
        let optimizer = CostPerformanceOptimizer::default();
        let config = valid_config();
        let aggressive = optimizer.optimize_configuration(&config, &uncached(OptimizationMode::Aggressive));
        let conservative =
            optimizer.optimize_configuration(&config, &uncached(OptimizationMode::Conservative));
        assert!(conservative.recommendations.len() < aggressive.recommendations.len());
        assert!(conservative.recommendations.iter().all(|r| r.potential > 0.5));
    }

    #[test]
    fn test_profile_ceilings_hold() {
        let mut config = valid_config();
        config.agent.model.max_tokens = 16384;
        config.agent.history_processor.window_size = 6000;
        config.agent.model.timeout = 900;
        config.agent.max_iterations = 80;
        let options = OptimizationOptions {
            profile: Some(PerformanceProfile::Fast),
            ..uncached(OptimizationMode::Aggressive)
        };
        let result = CostPerformanceOptimizer::default().optimize_configuration(&config, &options);
        let ceilings = PerformanceProfile::Fast.ceilings();
        let agent = &result.optimized_config.agent;
        assert!(agent.model.max_tokens <= ceilings.max_tokens);
        assert!(agent.model.timeout <= ceilings.timeout);
        assert!(agent.max_iterations <= ceilings.max_iterations);
        assert!(agent.history_processor.window_size <= agent.model.max_tokens);
    }

    #[test]
    fn test_cached_result_is_marked() {
        let optimizer = CostPerformanceOptimizer::default();
        let options = OptimizationOptions::default();
        let first = optimizer.optimize_configuration(&valid_config(), &options);
        let second = optimizer.optimize_configuration(&valid_config(), &options);
        assert!(!first.metadata.cached);
        assert!(second.metadata.cached);
        assert_eq!(first.optimized_config, second.optimized_config);
    }
}
