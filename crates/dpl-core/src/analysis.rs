//! The analysis pipeline behind every command.
//!
//! An [`Analyzer`] owns a validated configuration and the grid built from it,
//! and turns a loaded dataset into one of the report types.

use std::borrow::Cow;

use dpl_common::{FeatureGrouping, Label, Predictions, Result};
use dpl_config::{AnalysisConfig, ConfigSnapshot};
use dpl_math::{
    binned_losses_for, class_loss_curve, decompose, loss_curve, GroupingInput, LossHistogram,
    ThresholdGrid,
};
use tracing::{debug, info, info_span};

use crate::dataset::LoadedDataset;
use crate::logging::{event_names, LogContext, Stage};
use crate::report::{
    BinsReport, ClassCounts, CurveReport, DecomposeReport, GroupSummary, Peak, ReportHeader,
};

/// Runs analyses under one configuration.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    /// Absent for analyzers built with [`Analyzer::for_integration`].
    grid: Option<ThresholdGrid>,
    ctx: LogContext,
    snapshot: ConfigSnapshot,
}

impl Analyzer {
    /// Build the threshold grid for `config`.
    ///
    /// `config` is expected to have passed validation already. Reports carry
    /// a provenance-free snapshot until [`Analyzer::with_snapshot`] is used.
    pub fn new(config: AnalysisConfig, ctx: LogContext) -> Result<Self> {
        let grid = config.threshold_grid()?;
        let mut analyzer = Self::for_integration(config, ctx);
        analyzer.grid = Some(grid);
        Ok(analyzer)
    }

    /// An analyzer for [`Analyzer::bins`] only; no grid is built up front.
    ///
    /// Curves and decompositions still work but build the grid per call, and
    /// fail if the grid settings are invalid.
    pub fn for_integration(config: AnalysisConfig, ctx: LogContext) -> Self {
        let snapshot = ConfigSnapshot::new(&config, &Default::default(), None);
        Self {
            config,
            grid: None,
            ctx,
            snapshot,
        }
    }

    /// Snapshot stamped into report headers.
    pub fn with_snapshot(mut self, snapshot: ConfigSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn grid(&self) -> Option<&ThresholdGrid> {
        self.grid.as_ref()
    }

    fn threshold_grid(&self) -> Result<Cow<'_, ThresholdGrid>> {
        match &self.grid {
            Some(grid) => Ok(Cow::Borrowed(grid)),
            None => Ok(Cow::Owned(self.config.threshold_grid()?)),
        }
    }

    fn header(&self) -> ReportHeader {
        ReportHeader::new(self.ctx.run_id.clone(), self.snapshot.clone())
    }

    /// Aggregate curve plus the per-class curves that sum to it.
    pub fn curve(&self, predictions: &Predictions) -> Result<CurveReport> {
        let _span = info_span!("curve", run_id = %self.ctx.run_id).entered();
        let weight = &self.config.weight;
        let grid = self.threshold_grid()?;

        let curve = loss_curve(predictions, weight, &grid)?;
        let negative = class_loss_curve(predictions, weight, &grid, Label::Negative)?;
        let positive = class_loss_curve(predictions, weight, &grid, Label::Positive)?;
        let area = curve.area();
        let peak = curve.peak().map(|(threshold, value)| Peak { threshold, value });

        info!(
            run_id = %self.ctx.run_id,
            stage = %Stage::Curve,
            event = event_names::CURVE_FINISHED,
            weight = %weight,
            points = grid.len(),
            area,
            "aggregate curve computed"
        );

        Ok(CurveReport {
            header: self.header(),
            weight: *weight,
            n: predictions.len(),
            class_counts: ClassCounts {
                negative: predictions.class_count(Label::Negative),
                positive: predictions.class_count(Label::Positive),
            },
            area,
            peak,
            curve,
            negative,
            positive,
        })
    }

    /// Peel every configured target class into per-datapoint curves.
    ///
    /// `grouping` replaces the configured grouping when given.
    pub fn decompose(
        &self,
        dataset: &LoadedDataset,
        grouping: Option<&FeatureGrouping>,
    ) -> Result<DecomposeReport> {
        let _span = info_span!("decompose", run_id = %self.ctx.run_id).entered();
        let weight = &self.config.weight;
        let grouping = grouping.or(self.config.grouping.as_ref());
        let input = grouping.map(|g| GroupingInput::new(g, &dataset.features));
        let grid = self.threshold_grid()?;

        let decomposition = decompose(
            &dataset.predictions,
            weight,
            &grid,
            &self.config.targets,
            input,
        )?;

        for &target in &decomposition.targets {
            debug!(
                run_id = %self.ctx.run_id,
                stage = %Stage::Decompose,
                event = event_names::DECOMPOSE_CLASS_DONE,
                target = target.as_u8(),
                curves = decomposition.class_curves(target).count(),
                "class peeled"
            );
        }

        let mut groups = Vec::new();
        let mut ungrouped = 0;
        if let Some(labels) = &decomposition.group_labels {
            for &target in &decomposition.targets {
                for (group, curve) in decomposition.group_curves(target) {
                    let members = decomposition
                        .class_curves(target)
                        .filter(|c| c.group == Some(group))
                        .count();
                    groups.push(GroupSummary {
                        target,
                        group,
                        label: labels
                            .get(group.index())
                            .cloned()
                            .unwrap_or_else(|| group.to_string()),
                        members,
                        area: curve.area(),
                    });
                }
            }
            ungrouped = decomposition
                .curves
                .iter()
                .filter(|c| c.group.is_none())
                .count();
        }

        info!(
            run_id = %self.ctx.run_id,
            stage = %Stage::Decompose,
            event = event_names::DECOMPOSE_FINISHED,
            curves = decomposition.curves.len(),
            groups = groups.len(),
            ungrouped,
            "decomposition finished"
        );

        Ok(DecomposeReport {
            header: self.header(),
            weight: *weight,
            groups,
            ungrouped,
            decomposition,
        })
    }

    /// Integrated per-datapoint losses and their histogram.
    pub fn bins(&self, predictions: &Predictions) -> Result<BinsReport> {
        let _span = info_span!("integrate", run_id = %self.ctx.run_id).entered();
        let weight = &self.config.weight;

        let samples = binned_losses_for(
            predictions,
            weight,
            &self.config.targets,
            &self.config.quadrature,
        )?;
        let histogram = LossHistogram::from_samples(&samples, self.config.bins)?;
        let total_loss: f64 = samples.iter().map(|s| s.loss).sum();

        info!(
            run_id = %self.ctx.run_id,
            stage = %Stage::Integrate,
            event = event_names::INTEGRATE_FINISHED,
            samples = samples.len(),
            total_loss,
            "integrated losses computed"
        );

        let mut targets = Vec::with_capacity(2);
        for &t in &self.config.targets {
            if !targets.contains(&t) {
                targets.push(t);
            }
        }

        Ok(BinsReport {
            header: self.header(),
            weight: *weight,
            targets,
            total_loss,
            histogram,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_common::FeatureTable;
    use dpl_math::StandardWeight;

    fn dataset() -> LoadedDataset {
        let predictions =
            Predictions::from_slices(&[0.2, 0.6, 0.9, 0.4], &[0_i64, 0, 1, 1]).unwrap();
        let features = FeatureTable::new().with_column("age", vec![20.0, 40.0, 70.0, 35.0]);
        LoadedDataset {
            predictions,
            features,
        }
    }

    fn analyzer(config: AnalysisConfig) -> Analyzer {
        Analyzer::new(config, LogContext::new("run-test")).unwrap()
    }

    #[test]
    fn test_curve_classes_sum_to_total() {
        let report = analyzer(AnalysisConfig::default())
            .curve(&dataset().predictions)
            .unwrap();
        assert_eq!(report.n, 4);
        assert_eq!(report.class_counts, ClassCounts { negative: 2, positive: 2 });
        for i in 0..report.curve.len() {
            let sum = report.negative.values[i] + report.positive.values[i];
            assert!((report.curve.values[i] - sum).abs() < 1e-12);
        }
        assert!(report.peak.is_some());
    }

    #[test]
    fn test_decompose_with_override_grouping() {
        let mut config = AnalysisConfig::default();
        config.targets = vec![Label::Negative, Label::Positive];
        let grouping = FeatureGrouping::numeric("age", vec![0.0, 30.0, 60.0]);

        let report = analyzer(config)
            .decompose(&dataset(), Some(&grouping))
            .unwrap();
        assert_eq!(report.decomposition.curves.len(), 4);
        // age 70 lies outside [0, 60]
        assert_eq!(report.ungrouped, 1);
        let members: usize = report.groups.iter().map(|g| g.members).sum();
        assert_eq!(members, 3);
    }

    #[test]
    fn test_decompose_without_grouping_has_no_groups() {
        let report = analyzer(AnalysisConfig::default())
            .decompose(&dataset(), None)
            .unwrap();
        assert!(report.groups.is_empty());
        assert_eq!(report.ungrouped, 0);
        assert_eq!(report.decomposition.curves.len(), 2);
    }

    #[test]
    fn test_integration_analyzer_skips_grid() {
        let mut config = AnalysisConfig::default();
        config.weight = StandardWeight::Entropy;
        config.targets = vec![Label::Negative, Label::Positive];
        // endpoints would make every curve degenerate, but bins never looks
        assert!(config.grid.include_endpoints);

        let analyzer = Analyzer::for_integration(config, LogContext::new("run-test"));
        assert!(analyzer.grid().is_none());

        let report = analyzer.bins(&dataset().predictions).unwrap();
        let log_loss = (-(0.8f64).ln() - (0.4f64).ln() - (0.9f64).ln() - (0.4f64).ln()) / 4.0;
        assert!((report.total_loss - log_loss).abs() < 1e-9);

        assert!(analyzer.curve(&dataset().predictions).is_err());
    }

    #[test]
    fn test_grid_built_on_demand() {
        let mut config = AnalysisConfig::default();
        config.grid.points = 5;
        let eager = analyzer(config.clone());
        let lazy = Analyzer::for_integration(config, LogContext::new("run-test"));
        assert_eq!(eager.grid().map(|g| g.len()), Some(5));

        let a = eager.curve(&dataset().predictions).unwrap();
        let b = lazy.curve(&dataset().predictions).unwrap();
        assert_eq!(a.curve, b.curve);
    }

    #[test]
    fn test_bins_total_matches_histogram() {
        let mut config = AnalysisConfig::default();
        config.weight = StandardWeight::Quadratic;
        config.targets = vec![Label::Negative, Label::Positive, Label::Negative];
        config.bins = 10;

        let report = analyzer(config).bins(&dataset().predictions).unwrap();
        assert_eq!(report.targets, vec![Label::Negative, Label::Positive]);
        assert_eq!(report.samples.len(), 4);
        assert!((report.total_loss - report.histogram.total_loss()).abs() < 1e-12);

        // quadratic weight integrates to the Brier score: mean (p - y)^2
        let brier = (0.04 + 0.36 + 0.01 + 0.36) / 4.0;
        assert!((report.total_loss - brier).abs() < 1e-8);
    }
}
