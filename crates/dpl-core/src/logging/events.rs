//! Pipeline stages and event names shared by every log line.

use serde::{Deserialize, Serialize};

/// Processing stages in the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Dataset loading and validation.
    Load,
    /// Aggregate curve computation.
    Curve,
    /// Per-datapoint decomposition.
    Decompose,
    /// Integrated losses and histogram.
    Integrate,
    /// Report rendering.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Curve => "curve",
            Stage::Decompose => "decompose",
            Stage::Integrate => "integrate",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    pub const DATASET_LOADED: &str = "dataset.loaded";

    pub const CURVE_FINISHED: &str = "curve.finished";
    pub const DECOMPOSE_CLASS_DONE: &str = "decompose.class_done";
    pub const DECOMPOSE_FINISHED: &str = "decompose.finished";
    pub const INTEGRATE_FINISHED: &str = "integrate.finished";
}

/// Correlation data attached to every event of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }
}
