//! Datapoint Loss configuration loading and validation.
//!
//! This crate provides:
//! - The typed analysis configuration (JSON or TOML)
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - Config snapshots embedded in reports

pub mod analysis;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use analysis::{load_config, AnalysisConfig, GridConfig, LoadedConfig};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{
    validate_analysis, validate_scoped, ValidationError, ValidationResult, ValidationScope,
};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
