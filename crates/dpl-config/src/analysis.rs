//! The analysis configuration and its loader.
//!
//! Files may be JSON or TOML, chosen by extension (`.toml` is TOML, anything
//! else is JSON). Every field has a default, so an empty file is valid.

use dpl_common::{FeatureGrouping, Label};
use dpl_math::{QuadratureConfig, StandardWeight, ThresholdGrid, DEFAULT_BINS, DEFAULT_GRID_POINTS};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::resolve::{resolve_config, ConfigPaths};
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_scoped, ValidationError, ValidationScope};

/// Threshold grid settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Number of evenly spaced thresholds over `[0, 1]`.
    pub points: usize,
    /// Keep the exact thresholds 0 and 1.
    pub include_endpoints: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            points: DEFAULT_GRID_POINTS,
            include_endpoints: true,
        }
    }
}

/// Everything an analysis run needs besides the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub schema_version: String,
    pub weight: StandardWeight,
    pub grid: GridConfig,
    /// Classes to decompose, in order.
    pub targets: Vec<Label>,
    /// Histogram bins for integrated losses.
    pub bins: usize,
    pub quadrature: QuadratureConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<FeatureGrouping>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            weight: StandardWeight::default(),
            grid: GridConfig::default(),
            targets: vec![Label::Negative],
            bins: DEFAULT_BINS,
            quadrature: QuadratureConfig::default(),
            grouping: None,
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON or TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse_for(path, &content)
    }

    /// Parse `content` in the format implied by `path`.
    pub fn parse_for(path: &Path, content: &str) -> Result<Self, ValidationError> {
        if is_toml(path) {
            Self::from_toml_str(content)
        } else {
            Self::from_json_str(content)
        }
    }

    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Parse from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ValidationError> {
        toml::from_str(text)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Canonical JSON form, used for hashing.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Build the threshold grid described by `grid`.
    pub fn threshold_grid(&self) -> dpl_common::Result<ThresholdGrid> {
        let grid = ThresholdGrid::linspace(self.grid.points)?;
        if self.grid.include_endpoints {
            Ok(grid)
        } else {
            grid.without_endpoints()
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

/// A resolved, parsed and validated configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AnalysisConfig,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, read and validate the analysis config.
///
/// With nothing found the built-in defaults are used. Grid settings are left
/// to the commands that build a grid; `dpl bins` never does.
pub fn load_config(cli_path: Option<&Path>) -> Result<LoadedConfig, ValidationError> {
    let paths = resolve_config(cli_path);

    let (config, raw) = match &paths.analysis {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            (AnalysisConfig::parse_for(path, &raw)?, Some(raw))
        }
        None => (AnalysisConfig::default(), None),
    };

    validate_scoped(&config, ValidationScope::Integration)?;
    let snapshot = ConfigSnapshot::new(&config, &paths, raw.as_deref());

    Ok(LoadedConfig {
        config,
        paths,
        snapshot,
    })
}
