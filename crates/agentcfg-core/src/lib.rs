//! Configuration compilation pipeline stages
//!
//! Environment mapping, document generation, layered validation and cost/performance
//! optimization. Each stage returns a structured result; only the generator can fail,
//! and only when fallback mode is off.

pub mod cache;
pub mod error;
pub mod generator;
pub mod mapper;
pub mod optimizer;
pub mod providers;
pub mod validator;

pub use cache::{compute_hash, CachePolicy, TtlCache};
pub use error::{GenerationError, MappingError};
pub use generator::{
    ConfigGenerator, GenerationResult, GeneratorOptions, PlatformContext, PresetOverrides,
    ProblemContext,
};
pub use mapper::{EnvironmentMapper, MappedConfig, MappedValue, MappingResult, RawEnvironment};
pub use optimizer::{CostPerformanceOptimizer, OptimizationOptions, OptimizationResult};
pub use validator::{SchemaValidator, ValidationOptions, ValidationResult};
