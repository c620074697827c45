//! Error types for Datapoint Loss.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation suggestions for humans
//! - Suggested actions for agents
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Degenerate Weight
//!   Reason: weight 'entropy' is degenerate at threshold 0: w(c) = inf
//!   Fix: Drop the grid endpoints ('--exclude-endpoints') or pick a bounded weight.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "domain",
//!   "message": "weight 'entropy' is degenerate at threshold 0: w(c) = inf",
//!   "suggested_action": "exclude_endpoints",
//!   "context": { "threshold": 0.0, "weight": "entropy" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Datapoint Loss operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or misaligned input data.
    Input,
    /// Mathematically undefined computations (weights, integrals, bins).
    Domain,
    /// Configuration file errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Domain => write!(f, "domain"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for agents to take in response to errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Correct the dataset and rerun.
    FixInput,
    /// Rerun with a grid that excludes the 0 and 1 thresholds.
    ExcludeEndpoints,
    /// Rerun with a different weight function.
    ChangeWeight,
    /// Run the configuration check command.
    RunCheck,
    /// Retry the operation.
    Retry,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::ExcludeEndpoints => write!(f, "exclude_endpoints"),
            SuggestedAction::ChangeWeight => write!(f, "change_weight"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for Datapoint Loss.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("misaligned input: {predictions} predictions but {labels} labels")]
    MisalignedInput { predictions: usize, labels: usize },

    #[error("empty dataset: at least one prediction is required")]
    EmptyDataset,

    #[error("invalid probability {value} at datapoint {datapoint} (must be finite and in [0, 1])")]
    InvalidProbability { datapoint: usize, value: f64 },

    #[error("invalid label {value} at datapoint {datapoint} (must be 0 or 1)")]
    InvalidLabel { datapoint: usize, value: i64 },

    #[error("feature column '{0}' not found")]
    MissingFeature(String),

    #[error("feature column '{column}' has {len} rows, expected {expected}")]
    FeatureLength {
        column: String,
        len: usize,
        expected: usize,
    },

    #[error("datapoint {datapoint} activates {active} categorical indicators, expected exactly one")]
    MalformedGrouping { datapoint: usize, active: usize },

    #[error("invalid feature grouping: {0}")]
    InvalidGrouping(String),

    #[error("invalid threshold grid: {0}")]
    InvalidGrid(String),

    #[error("malformed dataset: {0}")]
    MalformedDataset(#[source] serde_json::Error),

    // Domain errors (20-29)
    #[error("weight '{weight}' is degenerate at threshold {threshold}: w(c) = {value}")]
    DegenerateWeight {
        weight: String,
        threshold: f64,
        value: f64,
    },

    #[error("integration failed for datapoint {datapoint}: {reason}")]
    IntegrationFailed { datapoint: usize, reason: String },

    #[error("invalid bin count {0} (must be at least 1)")]
    InvalidBinCount(usize),

    #[error("loss of datapoint {datapoint} diverges: the weight is infinite at threshold {threshold}")]
    DivergentIntegral { datapoint: usize, threshold: f64 },

    // Configuration errors (30-39)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Input errors
    /// - 20-29: Domain errors
    /// - 30-39: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::MisalignedInput { .. } => 10,
            Error::EmptyDataset => 11,
            Error::InvalidProbability { .. } => 12,
            Error::InvalidLabel { .. } => 13,
            Error::MissingFeature(_) => 14,
            Error::FeatureLength { .. } => 15,
            Error::MalformedGrouping { .. } => 16,
            Error::InvalidGrouping(_) => 17,
            Error::InvalidGrid(_) => 18,
            Error::MalformedDataset(_) => 19,
            Error::DegenerateWeight { .. } => 20,
            Error::IntegrationFailed { .. } => 21,
            Error::InvalidBinCount(_) => 22,
            Error::DivergentIntegral { .. } => 23,
            Error::Config(_) => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MisalignedInput { .. }
            | Error::EmptyDataset
            | Error::InvalidProbability { .. }
            | Error::InvalidLabel { .. }
            | Error::MissingFeature(_)
            | Error::FeatureLength { .. }
            | Error::MalformedGrouping { .. }
            | Error::InvalidGrouping(_)
            | Error::InvalidGrid(_)
            | Error::MalformedDataset(_) => ErrorCategory::Input,

            Error::DegenerateWeight { .. }
            | Error::IntegrationFailed { .. }
            | Error::InvalidBinCount(_)
            | Error::DivergentIntegral { .. } => ErrorCategory::Domain,

            Error::Config(_) => ErrorCategory::Config,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns the suggested action for agents.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::MisalignedInput { .. }
            | Error::EmptyDataset
            | Error::InvalidProbability { .. }
            | Error::InvalidLabel { .. }
            | Error::MissingFeature(_)
            | Error::FeatureLength { .. }
            | Error::MalformedGrouping { .. }
            | Error::MalformedDataset(_) => SuggestedAction::FixInput,

            Error::InvalidGrouping(_) | Error::InvalidGrid(_) | Error::InvalidBinCount(_) => {
                SuggestedAction::RunCheck
            }

            Error::DegenerateWeight { .. } => SuggestedAction::ExcludeEndpoints,
            Error::IntegrationFailed { .. } | Error::DivergentIntegral { .. } => {
                SuggestedAction::ChangeWeight
            }

            Error::Config(_) => SuggestedAction::RunCheck,

            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::MisalignedInput { .. } => {
                "Provide exactly one label per predicted probability, in the same order."
            }
            Error::EmptyDataset => "The dataset must contain at least one prediction.",
            Error::InvalidProbability { .. } => {
                "Predicted probabilities must be finite numbers between 0 and 1."
            }
            Error::InvalidLabel { .. } => "True labels must be 0 (negative) or 1 (positive).",
            Error::MissingFeature(_) => {
                "Add the feature column to the dataset's 'features' object or fix the grouping."
            }
            Error::FeatureLength { .. } => {
                "Every feature column must have one value per prediction."
            }
            Error::MalformedGrouping { .. } => {
                "Categorical indicators must be one-hot: exactly one indicator equal to 1 per row."
            }
            Error::InvalidGrouping(_) => {
                "Numeric groupings need at least two increasing boundaries; categorical groupings need at least one level."
            }
            Error::InvalidGrid(_) => {
                "Thresholds must be finite, strictly increasing, and inside [0, 1]."
            }
            Error::MalformedDataset(_) => {
                "Invalid dataset JSON. Expected {\"probabilities\": [..], \"labels\": [..]}; check syntax with 'jq . <file>'."
            }
            Error::DegenerateWeight { .. } => {
                "Drop the grid endpoints ('--exclude-endpoints') or pick a bounded weight."
            }
            Error::IntegrationFailed { .. } => {
                "The integrand could not be resolved to the requested tolerance; loosen quadrature.rel_tol or raise quadrature.max_subintervals."
            }
            Error::InvalidBinCount(_) => "Use at least one histogram bin.",
            Error::DivergentIntegral { .. } => {
                "A confidently wrong prediction (probability 0 for a positive, 1 for a negative) has infinite loss under this weight. Pick a bounded weight or clip the probabilities."
            }
            Error::Config(_) => {
                "Run 'dpl check' to validate configuration, or check syntax in config files."
            }
            Error::Io(_) => "Check that the input file exists and is readable. Retry the operation.",
            Error::Json(_) => "Output could not be serialized. This is a bug; please report it.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::MisalignedInput { .. } => "Misaligned Input",
            Error::EmptyDataset => "Empty Dataset",
            Error::InvalidProbability { .. } => "Invalid Probability",
            Error::InvalidLabel { .. } => "Invalid Label",
            Error::MissingFeature(_) => "Missing Feature",
            Error::FeatureLength { .. } => "Feature Length Mismatch",
            Error::MalformedGrouping { .. } => "Malformed Grouping",
            Error::InvalidGrouping(_) => "Invalid Grouping",
            Error::InvalidGrid(_) => "Invalid Threshold Grid",
            Error::MalformedDataset(_) => "Malformed Dataset",
            Error::DegenerateWeight { .. } => "Degenerate Weight",
            Error::IntegrationFailed { .. } => "Integration Failed",
            Error::InvalidBinCount(_) => "Invalid Bin Count",
            Error::DivergentIntegral { .. } => "Divergent Loss",
            Error::Config(_) => "Configuration Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "Serialization Error",
        }
    }

    /// Format for human consumption: headline, reason and fix.
    pub fn human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Suggested action for agents.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., datapoint index, threshold).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::MisalignedInput {
                predictions,
                labels,
            } => {
                context.insert("predictions".to_string(), serde_json::json!(predictions));
                context.insert("labels".to_string(), serde_json::json!(labels));
            }
            Error::InvalidProbability { datapoint, .. }
            | Error::InvalidLabel { datapoint, .. }
            | Error::IntegrationFailed { datapoint, .. } => {
                context.insert("datapoint".to_string(), serde_json::json!(datapoint));
            }
            Error::MalformedGrouping { datapoint, active } => {
                context.insert("datapoint".to_string(), serde_json::json!(datapoint));
                context.insert("active".to_string(), serde_json::json!(active));
            }
            Error::MissingFeature(column) | Error::FeatureLength { column, .. } => {
                context.insert("column".to_string(), serde_json::json!(column));
            }
            Error::DegenerateWeight {
                weight, threshold, ..
            } => {
                context.insert("weight".to_string(), serde_json::json!(weight));
                context.insert("threshold".to_string(), serde_json::json!(threshold));
            }
            Error::DivergentIntegral {
                datapoint,
                threshold,
            } => {
                context.insert("datapoint".to_string(), serde_json::json!(datapoint));
                context.insert("threshold".to_string(), serde_json::json!(threshold));
            }
            Error::MalformedDataset(e) => {
                context.insert("line".to_string(), serde_json::json!(e.line()));
                context.insert("column".to_string(), serde_json::json!(e.column()));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}
