//! Aggregate threshold-indexed loss curves.
//!
//! For every threshold `c` the curve value is
//! `w(c) · (Σ_i L(p_i, y_i, c) / n)` where `L` is the elementary loss and `n`
//! the total number of datapoints. Class-restricted curves sum over one class
//! only but keep the same normalisation by the total `n`, so the two class
//! curves add up to the aggregate one.

use dpl_common::{Error, Label, Prediction, Predictions, Result};
use serde::{Deserialize, Serialize};

use super::grid::ThresholdGrid;
use super::kernel::prediction_loss;
use super::weight::WeightFunction;

/// One loss value per grid threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossCurve {
    pub thresholds: Vec<f64>,
    pub values: Vec<f64>,
}

impl LossCurve {
    /// All-zero curve on the given grid.
    pub fn zeros(grid: &ThresholdGrid) -> Self {
        Self {
            thresholds: grid.values().to_vec(),
            values: vec![0.0; grid.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(threshold, value)` pairs in grid order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.thresholds.iter().copied().zip(self.values.iter().copied())
    }

    /// Trapezoidal area under the curve.
    pub fn area(&self) -> f64 {
        self.thresholds
            .windows(2)
            .zip(self.values.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum()
    }

    /// Highest point of the curve, if any.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.points()
            .fold(None, |best: Option<(f64, f64)>, (c, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((c, v)),
            })
    }

    /// Pointwise sum of two curves on the same grid.
    pub fn add(&self, other: &LossCurve) -> Result<LossCurve> {
        if self.thresholds != other.thresholds {
            return Err(Error::InvalidGrid(
                "cannot add curves computed on different grids".to_string(),
            ));
        }
        Ok(LossCurve {
            thresholds: self.thresholds.clone(),
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| a + b)
                .collect(),
        })
    }

    /// Pointwise sum of any number of curves sharing a grid.
    ///
    /// Returns `None` for an empty input.
    pub fn sum_pointwise<'a, I>(curves: I) -> Result<Option<LossCurve>>
    where
        I: IntoIterator<Item = &'a LossCurve>,
    {
        let mut acc: Option<LossCurve> = None;
        for curve in curves {
            acc = Some(match acc {
                None => curve.clone(),
                Some(total) => total.add(curve)?,
            });
        }
        Ok(acc)
    }
}

/// Aggregate loss curve over all datapoints.
pub fn loss_curve<W: WeightFunction + ?Sized>(
    predictions: &Predictions,
    weight: &W,
    grid: &ThresholdGrid,
) -> Result<LossCurve> {
    weighted_mean_curve(predictions, weight, grid, |_| true)
}

/// Contribution of one class to the aggregate curve (still divided by the
/// total `n`).
pub fn class_loss_curve<W: WeightFunction + ?Sized>(
    predictions: &Predictions,
    weight: &W,
    grid: &ThresholdGrid,
    target: Label,
) -> Result<LossCurve> {
    weighted_mean_curve(predictions, weight, grid, |p| p.label() == target)
}

fn weighted_mean_curve<W, F>(
    predictions: &Predictions,
    weight: &W,
    grid: &ThresholdGrid,
    include: F,
) -> Result<LossCurve>
where
    W: WeightFunction + ?Sized,
    F: Fn(&Prediction) -> bool,
{
    let weights = grid.weights(weight)?;
    let n = predictions.len() as f64;

    let values = grid
        .iter()
        .zip(weights)
        .map(|(c, w)| {
            let sum: f64 = predictions
                .iter()
                .filter(|p| include(p))
                .map(|p| prediction_loss(p, c))
                .sum();
            w * (sum / n)
        })
        .collect();

    Ok(LossCurve {
        thresholds: grid.values().to_vec(),
        values,
    })
}
