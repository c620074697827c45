//! Column-oriented JSON datasets.
//!
//! ```json
//! {"probabilities": [0.2, 0.8], "labels": [0, 1], "features": {"age": [31, 54]}}
//! ```
//!
//! Labels are read as plain integers so that a stray `2` is reported with its
//! position instead of failing as an opaque parse error.

use dpl_common::{Error, FeatureTable, Predictions, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw dataset as read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    pub probabilities: Vec<f64>,
    pub labels: Vec<i64>,
    #[serde(default)]
    pub features: FeatureTable,
}

/// A dataset that passed validation.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub predictions: Predictions,
    pub features: FeatureTable,
}

impl Dataset {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::MalformedDataset)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Validate predictions, labels and feature column lengths.
    pub fn validate(self) -> Result<LoadedDataset> {
        let predictions = Predictions::from_slices(&self.probabilities, &self.labels)?;
        self.features.check_rows(predictions.len())?;
        Ok(LoadedDataset {
            predictions,
            features: self.features,
        })
    }
}

/// Read and validate a dataset file.
pub fn load_dataset(path: &Path) -> Result<LoadedDataset> {
    Dataset::from_file(path)?.validate()
}
