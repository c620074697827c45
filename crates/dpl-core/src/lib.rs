//! Datapoint Loss core library
//!
//! This library provides the pieces behind the `dpl` binary:
//! - Exit codes for CLI operations
//! - Dataset loading and validation
//! - The analysis pipeline (curve, decomposition, integrated losses)
//! - Report types and their renderings
//! - Structured logging
//!
//! The binary entry point is in `main.rs`.

pub mod analysis;
pub mod dataset;
pub mod exit_codes;
pub mod logging;
pub mod report;

pub use analysis::Analyzer;
pub use dataset::{load_dataset, Dataset, LoadedDataset};
pub use exit_codes::ExitCode;
pub use report::{BinsReport, CurveReport, DecomposeReport, Render, ReportHeader};
