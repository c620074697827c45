//! Serializable reports and their text renderings.
//!
//! JSON is the canonical form; Markdown and the one-line summary are views
//! for people and never carry data the JSON lacks.

use chrono::{DateTime, Utc};
use dpl_common::{GroupId, Label, OutputFormat, Result};
use dpl_config::ConfigSnapshot;
use dpl_math::{BinnedLossSample, Decomposition, LossCurve, LossHistogram, StandardWeight};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Common header of every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportHeader {
    pub schema_version: String,
    pub tool_version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    /// Effective configuration of the run.
    pub config: ConfigSnapshot,
}

impl ReportHeader {
    pub fn new(run_id: impl Into<String>, config: ConfigSnapshot) -> Self {
        Self {
            schema_version: dpl_common::SCHEMA_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            run_id: run_id.into(),
            generated_at: Utc::now(),
            config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub negative: usize,
    pub positive: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub threshold: f64,
    pub value: f64,
}

/// Output of `dpl curve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveReport {
    pub header: ReportHeader,
    pub weight: StandardWeight,
    pub n: usize,
    pub class_counts: ClassCounts,
    pub area: f64,
    pub peak: Option<Peak>,
    pub curve: LossCurve,
    pub negative: LossCurve,
    pub positive: LossCurve,
}

/// Per-group totals of a decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub target: Label,
    pub group: GroupId,
    pub label: String,
    pub members: usize,
    /// Trapezoidal area of the group's summed bands.
    pub area: f64,
}

/// Output of `dpl decompose`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeReport {
    pub header: ReportHeader,
    pub weight: StandardWeight,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub groups: Vec<GroupSummary>,
    /// Datapoints that fell outside every numeric bucket.
    pub ungrouped: usize,
    pub decomposition: Decomposition,
}

/// Output of `dpl bins`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinsReport {
    pub header: ReportHeader,
    pub weight: StandardWeight,
    pub targets: Vec<Label>,
    pub total_loss: f64,
    pub histogram: LossHistogram,
    pub samples: Vec<BinnedLossSample>,
}

/// Text views of a report.
pub trait Render: Serialize {
    fn to_markdown(&self) -> String;
    fn to_summary(&self) -> String;

    fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Md => Ok(self.to_markdown()),
            OutputFormat::Summary => Ok(self.to_summary()),
        }
    }
}

/// Row indices for a Markdown table of at most `rows` lines.
fn sample_rows(len: usize, rows: usize) -> Vec<usize> {
    if len <= rows || rows < 2 {
        return (0..len).collect();
    }
    let step = (len - 1) as f64 / (rows - 1) as f64;
    let mut idx: Vec<usize> = (0..rows).map(|i| (i as f64 * step).round() as usize).collect();
    idx.dedup();
    idx
}

const TABLE_ROWS: usize = 11;

impl Render for CurveReport {
    fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Loss curve ({} weight)\n", self.weight);
        let _ = writeln!(
            out,
            "- datapoints: {} ({} negative, {} positive)",
            self.n, self.class_counts.negative, self.class_counts.positive
        );
        let _ = writeln!(out, "- area: {:.6}", self.area);
        if let Some(peak) = self.peak {
            let _ = writeln!(out, "- peak: {:.6} at c = {:.4}", peak.value, peak.threshold);
        }
        let _ = writeln!(out, "\n| c | total | negative | positive |");
        let _ = writeln!(out, "|---|---|---|---|");
        for i in sample_rows(self.curve.len(), TABLE_ROWS) {
            let _ = writeln!(
                out,
                "| {:.4} | {:.6} | {:.6} | {:.6} |",
                self.curve.thresholds[i],
                self.curve.values[i],
                self.negative.values[i],
                self.positive.values[i]
            );
        }
        out
    }

    fn to_summary(&self) -> String {
        let peak = self
            .peak
            .map(|p| format!("{:.6}@{:.4}", p.value, p.threshold))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "[{}] curve weight={} n={} area={:.6} peak={}",
            self.header.run_id, self.weight, self.n, self.area, peak
        )
    }
}

impl Render for DecomposeReport {
    fn to_markdown(&self) -> String {
        let d = &self.decomposition;
        let mut out = String::new();
        let _ = writeln!(out, "# Per-datapoint decomposition ({} weight)\n", self.weight);
        let _ = writeln!(out, "- datapoints: {}", d.n);
        let _ = writeln!(out, "- thresholds: {}", d.thresholds.len());

        for &target in &d.targets {
            let _ = writeln!(out, "\n## Class {}\n", target);
            let _ = writeln!(out, "| order | datapoint | p | multiplier | group | area |");
            let _ = writeln!(out, "|---|---|---|---|---|---|");
            for (order, curve) in d.class_curves(target).enumerate() {
                let group = match (curve.group, &d.group_labels) {
                    (Some(g), Some(labels)) => labels
                        .get(g.index())
                        .cloned()
                        .unwrap_or_else(|| g.to_string()),
                    _ => "-".to_string(),
                };
                let area = LossCurve {
                    thresholds: d.thresholds.clone(),
                    values: curve.band.clone(),
                }
                .area();
                let _ = writeln!(
                    out,
                    "| {} | {} | {:.4} | {} | {} | {:.6} |",
                    order + 1,
                    curve.id,
                    curve.probability,
                    curve.remaining,
                    group,
                    area
                );
            }
        }

        if !self.groups.is_empty() {
            let _ = writeln!(out, "\n## Groups\n");
            let _ = writeln!(out, "| class | group | members | area |");
            let _ = writeln!(out, "|---|---|---|---|");
            for g in &self.groups {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {:.6} |",
                    g.target, g.label, g.members, g.area
                );
            }
            if self.ungrouped > 0 {
                let _ = writeln!(out, "\n{} datapoint(s) outside every group.", self.ungrouped);
            }
        }
        out
    }

    fn to_summary(&self) -> String {
        let d = &self.decomposition;
        let targets: Vec<String> = d.targets.iter().map(|t| t.to_string()).collect();
        format!(
            "[{}] decompose weight={} targets={} curves={} groups={} ungrouped={}",
            self.header.run_id,
            self.weight,
            targets.join(","),
            d.curves.len(),
            self.groups.len(),
            self.ungrouped
        )
    }
}

impl Render for BinsReport {
    fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Integrated losses ({} weight)\n", self.weight);
        let _ = writeln!(out, "- samples: {}", self.samples.len());
        let _ = writeln!(out, "- total loss: {:.6}", self.total_loss);
        let _ = writeln!(out, "- bins: {}", self.histogram.bins.len());
        let _ = writeln!(out, "\n| bin | count | loss |");
        let _ = writeln!(out, "|---|---|---|");
        for b in self.histogram.occupied() {
            let _ = writeln!(
                out,
                "| [{:.3}, {:.3}) | {} | {:.6} |",
                b.lower, b.upper, b.count, b.loss
            );
        }
        out
    }

    fn to_summary(&self) -> String {
        format!(
            "[{}] bins weight={} samples={} total_loss={:.6} occupied={}/{}",
            self.header.run_id,
            self.weight,
            self.samples.len(),
            self.total_loss,
            self.histogram.occupied().count(),
            self.histogram.bins.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_common::DatapointId;

    fn bins_report() -> BinsReport {
        let samples = vec![
            BinnedLossSample {
                id: DatapointId(0),
                probability: 0.25,
                loss: 0.5,
            },
            BinnedLossSample {
                id: DatapointId(1),
                probability: 0.75,
                loss: 0.25,
            },
        ];
        BinsReport {
            header: ReportHeader::new("run-test", ConfigSnapshot::defaults_only()),
            weight: StandardWeight::Uniform,
            targets: vec![Label::Negative],
            total_loss: 0.75,
            histogram: LossHistogram::from_samples(&samples, 4).unwrap(),
            samples,
        }
    }

    #[test]
    fn test_sample_rows() {
        assert_eq!(sample_rows(3, 11), vec![0, 1, 2]);
        let rows = sample_rows(1001, 11);
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[0], 0);
        assert_eq!(rows[10], 1000);
        assert_eq!(rows[5], 500);
    }

    #[test]
    fn test_bins_renderings() {
        let report = bins_report();
        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["header"]["run_id"], "run-test");
        assert_eq!(json["header"]["config"]["summary"]["weight"], "uniform");
        assert_eq!(json["histogram"]["bins"].as_array().unwrap().len(), 4);

        let md = report.render(OutputFormat::Md).unwrap();
        assert!(md.starts_with("# Integrated losses (uniform weight)"));
        assert!(md.contains("| [0.250, 0.500) | 1 | 0.500000 |"));

        let summary = report.render(OutputFormat::Summary).unwrap();
        assert!(summary.contains("samples=2"));
        assert!(summary.contains("occupied=2/4"));
    }
}
