//! Threshold grids.
//!
//! A grid is a strictly increasing sequence of thresholds inside `[0, 1]`.
//! The default grid has 1001 evenly spaced points including both endpoints;
//! point `i` is computed as `i / (m - 1)` so that values such as `0.5` are
//! exact and tie-breaking at `p = c` is reproducible.

use dpl_common::{Error, Result};
use serde::{Deserialize, Serialize};

use super::weight::{checked_weight, WeightFunction};

/// Number of points in the default grid.
pub const DEFAULT_GRID_POINTS: usize = 1001;

/// Ordered thresholds at which losses are evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ThresholdGrid {
    values: Vec<f64>,
}

impl ThresholdGrid {
    /// `points` evenly spaced thresholds from 0 to 1 inclusive.
    ///
    /// A single point yields `[0.0]`.
    pub fn linspace(points: usize) -> Result<Self> {
        match points {
            0 => Err(Error::InvalidGrid("grid needs at least one point".to_string())),
            1 => Ok(Self { values: vec![0.0] }),
            _ => {
                let last = (points - 1) as f64;
                let values = (0..points).map(|i| i as f64 / last).collect();
                Ok(Self { values })
            }
        }
    }

    /// Validate explicit thresholds.
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidGrid("grid needs at least one point".to_string()));
        }
        if let Some(bad) = values
            .iter()
            .find(|c| !c.is_finite() || !(0.0..=1.0).contains(*c))
        {
            return Err(Error::InvalidGrid(format!(
                "threshold {} is outside [0, 1]",
                bad
            )));
        }
        if let Some(w) = values.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::InvalidGrid(format!(
                "thresholds must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }
        Ok(Self { values })
    }

    /// Copy of this grid without the exact endpoints 0 and 1.
    ///
    /// Needed for weights that are undefined at the endpoints.
    pub fn without_endpoints(&self) -> Result<Self> {
        let values: Vec<f64> = self
            .values
            .iter()
            .copied()
            .filter(|&c| c != 0.0 && c != 1.0)
            .collect();
        if values.is_empty() {
            return Err(Error::InvalidGrid(
                "grid has no interior thresholds".to_string(),
            ));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// True when the grid contains 0 or 1.
    pub fn has_endpoints(&self) -> bool {
        self.values.first() == Some(&0.0) || self.values.last() == Some(&1.0)
    }

    /// Evaluate a weight at every threshold, failing on the first degenerate one.
    pub fn weights<W: WeightFunction + ?Sized>(&self, weight: &W) -> Result<Vec<f64>> {
        self.values
            .iter()
            .map(|&c| checked_weight(weight, c))
            .collect()
    }
}

impl Default for ThresholdGrid {
    fn default() -> Self {
        let last = (DEFAULT_GRID_POINTS - 1) as f64;
        Self {
            values: (0..DEFAULT_GRID_POINTS).map(|i| i as f64 / last).collect(),
        }
    }
}

impl TryFrom<Vec<f64>> for ThresholdGrid {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::from_values(values)
    }
}

impl From<ThresholdGrid> for Vec<f64> {
    fn from(grid: ThresholdGrid) -> Self {
        grid.values
    }
}
