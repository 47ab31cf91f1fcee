//! Shared types, error model, and configuration for the migration planner.
//!
//! This crate is the foundation depended on by all other planner crates.
//! It provides:
//! - [`PlannerError`], the unified error type
//! - Domain types ([`ContextBundle`], [`GenerationRequest`], [`RecommendationRecord`], ...)
//! - Configuration ([`AppConfig`], [`ServiceEnv`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchConfig, BedrockConfig, FailurePolicy, OutputConfig, RetrievalConfig,
    ServiceEnv, config_dir, config_file_path, init_config, load_config, load_config_from,
    require_var,
};
pub use error::{PlannerError, Result};
pub use types::{
    ContextBundle, GenerationRequest, KnowledgeSource, MigrationStrategy, OutputArtifact,
    RECOMMENDATION_HEADER, RecommendationRecord, RecommendationTable, RunId,
};
