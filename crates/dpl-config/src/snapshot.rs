//! Configuration snapshots for reproducibility.
//!
//! A snapshot captures the effective configuration of a run so that a report
//! can be traced back to the exact settings that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::AnalysisConfig;
use crate::resolve::ConfigPaths;

/// The effective configuration of one run, with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Capture time.
    pub timestamp: DateTime<Utc>,

    /// Machine that ran the analysis.
    #[serde(default)]
    pub hostname: Option<String>,

    /// `schema_version` of the config.
    pub schema_version: String,

    /// SHA-256 of the raw config file, when one was read.
    #[serde(default)]
    pub source_hash: Option<String>,

    /// Path the config was loaded from.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Where the config came from.
    pub config_source: String,

    /// SHA-256 of the effective configuration in canonical JSON, so JSON and
    /// TOML files with the same settings hash alike.
    pub config_hash: String,

    /// Settings that change results, for a glance at a report.
    pub summary: ConfigSummary,
}

/// Result-relevant settings in flat form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub weight: String,
    pub grid_points: usize,
    pub include_endpoints: bool,
    pub targets: Vec<u8>,
    pub bins: usize,
    /// `numeric`, `categorical` or absent.
    #[serde(default)]
    pub grouping: Option<String>,
}

impl ConfigSummary {
    fn of(config: &AnalysisConfig) -> Self {
        ConfigSummary {
            weight: config.weight.to_string(),
            grid_points: config.grid.points,
            include_endpoints: config.grid.include_endpoints,
            targets: config.targets.iter().map(|t| t.as_u8()).collect(),
            bins: config.bins,
            grouping: config.grouping.as_ref().map(|g| match g {
                dpl_common::FeatureGrouping::Numeric { .. } => "numeric".to_string(),
                dpl_common::FeatureGrouping::Categorical { .. } => "categorical".to_string(),
            }),
        }
    }
}

impl ConfigSnapshot {
    /// Create a snapshot of an effective configuration.
    pub fn new(config: &AnalysisConfig, paths: &ConfigPaths, raw: Option<&str>) -> Self {
        let canonical = config.to_json().unwrap_or_default();

        ConfigSnapshot {
            timestamp: Utc::now(),
            hostname: hostname::get()
                .ok()
                .map(|h| h.to_string_lossy().to_string()),
            schema_version: config.schema_version.clone(),
            source_hash: raw.map(hash_content),
            config_path: paths.analysis.as_ref().map(|p| p.display().to_string()),
            config_source: paths.source.to_string(),
            config_hash: hash_content(&canonical),
            summary: ConfigSummary::of(config),
        }
    }

    /// Re-snapshot after command-line overrides.
    ///
    /// Provenance (path, source, raw file hash) is kept; the effective hash
    /// and summary describe `config`.
    pub fn with_effective(&self, config: &AnalysisConfig) -> Self {
        let canonical = config.to_json().unwrap_or_default();
        ConfigSnapshot {
            timestamp: Utc::now(),
            config_hash: hash_content(&canonical),
            summary: ConfigSummary::of(config),
            ..self.clone()
        }
    }

    /// Snapshot of the built-in defaults.
    pub fn defaults_only() -> Self {
        Self::new(&AnalysisConfig::default(), &ConfigPaths::default(), None)
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Same effective configuration, regardless of provenance or time.
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// First 12 hex digits of the effective config hash.
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

/// Hex SHA-256 of `content`.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
