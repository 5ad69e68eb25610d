//! Orchestration of the configuration pipeline
//!
//! `ConfigOrchestrator` sequences context integration, generation, validation and
//! optimization, applies presets, caches packages and records history. Webhook and CI
//! callers go through its adapters; none of its operations return an error.

pub mod artifacts;
pub mod context;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod presets;
pub mod summary;
pub mod webhook;

pub use artifacts::Artifacts;
pub use context::{ContextIntegration, DefaultContextIntegration, IntegratedContext};
pub use error::OrchestrationError;
pub use history::GenerationEvent;
pub use orchestrator::{
    resolve_generator_options, ConfigOrchestrator, ConfigPackage, OrchestrationPlan,
    OrchestratorOptions, PackageMetadata,
};
pub use presets::Preset;
pub use summary::PackageSummary;
