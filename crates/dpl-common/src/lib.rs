//! Datapoint Loss common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - Validated predictions and true labels
//! - Datapoint and group identity types
//! - Feature groupings and the feature table they resolve against
//! - Common error types
//! - Output formats

pub mod error;
pub mod grouping;
pub mod id;
pub mod output;
pub mod prediction;

pub use error::{Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use grouping::{CategoricalLevel, FeatureGrouping, FeatureTable};
pub use id::{DatapointId, GroupId};
pub use output::OutputFormat;
pub use prediction::{Label, Prediction, Predictions};

/// Schema version for JSON reports.
pub const SCHEMA_VERSION: &str = "1.0.0";
