//! Loss-weighted histogram of predicted probabilities.

use dpl_common::{Error, Result};
use serde::{Deserialize, Serialize};

use super::binner::BinnedLossSample;

/// Default number of equal-width bins.
pub const DEFAULT_BINS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// Summed integrated loss of the samples in this bin.
    pub loss: f64,
}

/// Equal-width bins over `[0, 1]`; bin `i` covers `[i/k, (i+1)/k)` and the
/// last bin also holds probability exactly 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossHistogram {
    pub bins: Vec<HistogramBin>,
}

impl LossHistogram {
    pub fn from_samples(samples: &[BinnedLossSample], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidBinCount(bins));
        }
        let k = bins as f64;
        let mut out: Vec<HistogramBin> = (0..bins)
            .map(|i| HistogramBin {
                lower: i as f64 / k,
                upper: (i + 1) as f64 / k,
                count: 0,
                loss: 0.0,
            })
            .collect();

        for s in samples {
            let idx = bin_index(s.probability, bins);
            out[idx].count += 1;
            out[idx].loss += s.loss;
        }

        Ok(Self { bins: out })
    }

    pub fn total_loss(&self) -> f64 {
        self.bins.iter().map(|b| b.loss).sum()
    }

    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// Bins that received at least one sample.
    pub fn occupied(&self) -> impl Iterator<Item = &HistogramBin> {
        self.bins.iter().filter(|b| b.count > 0)
    }
}

fn bin_index(p: f64, bins: usize) -> usize {
    let raw = (p * bins as f64).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(bins - 1)
    }
}
