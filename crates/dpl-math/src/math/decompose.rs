//! Per-datapoint "peeling" decomposition of the aggregate loss curve.
//!
//! For a target class the members are ordered most-extreme-first: ascending
//! probability for negatives, descending for positives (ties keep input
//! order). Walking that order with a counter `remaining` that starts at the
//! class size and drops by one per datapoint, datapoint `i` gets the peeled
//! curve
//!
//! ```text
//! negatives: w(c) · (c / n) · remaining      if p > c, else 0
//! positives: w(c) · ((1 - c) / n) · remaining if p <= c, else 0
//! ```
//!
//! Because of the ordering, the set of class members that still cost
//! something at `c` is always a suffix of the walk. The peeled curves are
//! therefore nested: wherever a curve is non-zero it exceeds the next one in
//! the walk by exactly its band `w(c) · L(p_i, t, c) / n`. Two identities
//! follow and are what the tests pin down:
//!
//! - the pointwise maximum of a class's peeled curves ([`Decomposition::envelope`])
//!   equals the class-restricted aggregate curve;
//! - the pointwise sum of the exclusive bands ([`Decomposition::band_total`])
//!   equals the same curve.

use dpl_common::{
    DatapointId, FeatureGrouping, FeatureTable, GroupId, Label, Predictions, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::curve::LossCurve;
use super::grid::ThresholdGrid;
use super::kernel::elementary_loss;
use super::weight::WeightFunction;

/// Feature grouping plus the table it is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct GroupingInput<'a> {
    pub grouping: &'a FeatureGrouping,
    pub features: &'a FeatureTable,
}

impl<'a> GroupingInput<'a> {
    pub fn new(grouping: &'a FeatureGrouping, features: &'a FeatureTable) -> Self {
        Self { grouping, features }
    }
}

/// The loss curves contributed by a single datapoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapointCurve {
    pub id: DatapointId,
    pub target: Label,
    pub probability: f64,
    /// Peeling multiplier used for this datapoint.
    pub remaining: usize,
    /// Peeled (stacked) curve.
    pub values: Vec<f64>,
    /// Exclusive band: `w(c) · L(p, t, c) / n`.
    pub band: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

/// Result of a decomposition, curves in peeling order per target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub thresholds: Vec<f64>,
    /// Total number of datapoints used for normalisation.
    pub n: usize,
    pub targets: Vec<Label>,
    pub curves: Vec<DatapointCurve>,
    /// Legend labels indexed by group id, when a grouping was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_labels: Option<Vec<String>>,
}

impl Decomposition {
    /// Curves of one class, in peeling order.
    pub fn class_curves(&self, target: Label) -> impl Iterator<Item = &DatapointCurve> {
        self.curves.iter().filter(move |c| c.target == target)
    }

    /// Peeled curve per datapoint.
    pub fn curves_by_id(&self) -> BTreeMap<DatapointId, &[f64]> {
        self.curves
            .iter()
            .map(|c| (c.id, c.values.as_slice()))
            .collect()
    }

    /// Group per datapoint; ungrouped datapoints are absent.
    pub fn groups_by_id(&self) -> BTreeMap<DatapointId, GroupId> {
        self.curves
            .iter()
            .filter_map(|c| c.group.map(|g| (c.id, g)))
            .collect()
    }

    /// Pointwise maximum of the class's peeled curves.
    pub fn envelope(&self, target: Label) -> LossCurve {
        let mut values = vec![0.0f64; self.thresholds.len()];
        for curve in self.class_curves(target) {
            for (v, &x) in values.iter_mut().zip(&curve.values) {
                *v = v.max(x);
            }
        }
        LossCurve {
            thresholds: self.thresholds.clone(),
            values,
        }
    }

    /// Pointwise sum of the class's exclusive bands.
    pub fn band_total(&self, target: Label) -> LossCurve {
        self.sum_bands(|c| c.target == target)
    }

    /// Summed bands per group for one class.
    pub fn group_curves(&self, target: Label) -> BTreeMap<GroupId, LossCurve> {
        let groups: std::collections::BTreeSet<GroupId> = self
            .class_curves(target)
            .filter_map(|c| c.group)
            .collect();
        groups
            .into_iter()
            .map(|g| {
                (
                    g,
                    self.sum_bands(|c| c.target == target && c.group == Some(g)),
                )
            })
            .collect()
    }

    fn sum_bands<F: Fn(&DatapointCurve) -> bool>(&self, include: F) -> LossCurve {
        let mut values = vec![0.0f64; self.thresholds.len()];
        for curve in self.curves.iter().filter(|c| include(c)) {
            for (v, &x) in values.iter_mut().zip(&curve.band) {
                *v += x;
            }
        }
        LossCurve {
            thresholds: self.thresholds.clone(),
            values,
        }
    }
}

/// Datapoints of `target` in peeling order.
///
/// Ascending probability for negatives, descending for positives; the sort
/// is stable so ties keep their input order.
pub fn peeling_order(predictions: &Predictions, target: Label) -> Vec<DatapointId> {
    let mut ids = predictions.class_members(target);
    let prob = |id: &DatapointId| {
        predictions
            .get(*id)
            .map(|p| p.probability())
            .unwrap_or(f64::NAN)
    };
    match target {
        Label::Negative => ids.sort_by(|a, b| prob(a).total_cmp(&prob(b))),
        Label::Positive => ids.sort_by(|a, b| prob(b).total_cmp(&prob(a))),
    }
    ids
}

/// Decompose the aggregate curve into per-datapoint curves.
///
/// Targets are processed in the given order; repeats are ignored. A class
/// without members contributes no curves.
pub fn decompose<W: WeightFunction + ?Sized>(
    predictions: &Predictions,
    weight: &W,
    grid: &ThresholdGrid,
    targets: &[Label],
    grouping: Option<GroupingInput<'_>>,
) -> Result<Decomposition> {
    let weights = grid.weights(weight)?;
    let n = predictions.len();
    let nf = n as f64;

    if let Some(input) = grouping {
        input.grouping.check_table(input.features, n)?;
    }

    let mut seen = Vec::with_capacity(2);
    for &t in targets {
        if !seen.contains(&t) {
            seen.push(t);
        }
    }

    let mut curves = Vec::new();
    for &target in &seen {
        let order = peeling_order(predictions, target);
        let mut remaining = order.len();

        for id in order {
            let Some(prediction) = predictions.get(id) else {
                continue;
            };
            let p = prediction.probability();
            let multiplier = remaining as f64;

            let mut values = Vec::with_capacity(grid.len());
            let mut band = Vec::with_capacity(grid.len());
            for (c, &w) in grid.iter().zip(&weights) {
                let peeled = match target {
                    Label::Negative if p > c => w * (c / nf) * multiplier,
                    Label::Positive if p <= c => w * ((1.0 - c) / nf) * multiplier,
                    _ => 0.0,
                };
                values.push(peeled);
                band.push(w * (elementary_loss(p, target, c) / nf));
            }

            let group = match grouping {
                Some(input) => input.grouping.resolve(input.features, id)?,
                None => None,
            };

            curves.push(DatapointCurve {
                id,
                target,
                probability: p,
                remaining,
                values,
                band,
                group,
            });
            remaining -= 1;
        }
    }

    Ok(Decomposition {
        thresholds: grid.values().to_vec(),
        n,
        targets: seen,
        curves,
        group_labels: grouping.map(|g| g.grouping.labels()),
    })
}
