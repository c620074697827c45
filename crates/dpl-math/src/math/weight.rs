//! Weight functions `w(c)` that turn the elementary cost curve into a
//! specific strictly proper loss.
//!
//! The area under `w(c) · L(c)` is:
//! - `uniform`: half the Brier score (unweighted cost curve)
//! - `quadratic`: the Brier score
//! - `entropy`: the log loss (cross-entropy)
//!
//! `entropy` is undefined at `c = 0` and `c = 1`. Every evaluation inside the
//! engines goes through [`checked_weight`], which turns a non-finite or
//! negative weight into [`Error::DegenerateWeight`] instead of letting it leak
//! into curves.

use dpl_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pluggable weight over the threshold domain `[0, 1]`.
pub trait WeightFunction {
    /// Raw weight at threshold `c`. May be non-finite at degenerate points.
    fn weight(&self, c: f64) -> f64;

    /// Weight at `c = 1 - u`, given `u`.
    ///
    /// Floats just below 1 are spaced far wider than floats just above 0, so
    /// the integrator evaluates the upper half of the domain through this.
    /// Override it when `w` can be written in terms of `1 - c` directly.
    fn weight_reflected(&self, u: f64) -> f64 {
        self.weight(1.0 - u)
    }

    /// Name used in errors and logs.
    fn name(&self) -> &str;
}

/// The built-in weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardWeight {
    /// `w(c) = 1`
    #[default]
    Uniform,
    /// `w(c) = 2`
    #[serde(alias = "brier")]
    Quadratic,
    /// `w(c) = 1 / (c (1 - c))`
    #[serde(alias = "cross_entropy")]
    Entropy,
}

impl StandardWeight {
    pub const ALL: [StandardWeight; 3] = [
        StandardWeight::Uniform,
        StandardWeight::Quadratic,
        StandardWeight::Entropy,
    ];

    /// True when the weight is finite on all of `[0, 1]`.
    pub fn is_bounded(self) -> bool {
        !matches!(self, StandardWeight::Entropy)
    }
}

impl WeightFunction for StandardWeight {
    #[inline]
    fn weight(&self, c: f64) -> f64 {
        match self {
            StandardWeight::Uniform => 1.0,
            StandardWeight::Quadratic => 2.0,
            StandardWeight::Entropy => 1.0 / (c * (1.0 - c)),
        }
    }

    #[inline]
    fn weight_reflected(&self, u: f64) -> f64 {
        match self {
            StandardWeight::Entropy => 1.0 / ((1.0 - u) * u),
            _ => self.weight(1.0 - u),
        }
    }

    fn name(&self) -> &str {
        match self {
            StandardWeight::Uniform => "uniform",
            StandardWeight::Quadratic => "quadratic",
            StandardWeight::Entropy => "entropy",
        }
    }
}

impl fmt::Display for StandardWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StandardWeight {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" | "default" | "none" => Ok(StandardWeight::Uniform),
            "quadratic" | "brier" => Ok(StandardWeight::Quadratic),
            "entropy" | "cross_entropy" | "cross-entropy" | "log" => Ok(StandardWeight::Entropy),
            _ => Err(format!("unknown weight: {}", s)),
        }
    }
}

/// A named closure used as a weight.
///
/// ```
/// use dpl_math::weight::{FnWeight, WeightFunction};
///
/// let tilted = FnWeight::new("tilted", |c: f64| 1.0 + c);
/// assert_eq!(tilted.weight(0.5), 1.5);
/// assert_eq!(tilted.name(), "tilted");
/// ```
pub struct FnWeight<F> {
    name: String,
    f: F,
}

impl<F> FnWeight<F>
where
    F: Fn(f64) -> f64,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> WeightFunction for FnWeight<F>
where
    F: Fn(f64) -> f64,
{
    #[inline]
    fn weight(&self, c: f64) -> f64 {
        (self.f)(c)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnWeight<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnWeight").field("name", &self.name).finish()
    }
}

/// Evaluate `w(c)`, rejecting non-finite and negative values.
pub fn checked_weight<W: WeightFunction + ?Sized>(weight: &W, c: f64) -> Result<f64> {
    let value = weight.weight(c);
    if !value.is_finite() || value < 0.0 {
        return Err(Error::DegenerateWeight {
            weight: weight.name().to_string(),
            threshold: c,
            value,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_weights() {
        assert_eq!(StandardWeight::Uniform.weight(0.3), 1.0);
        assert_eq!(StandardWeight::Quadratic.weight(0.3), 2.0);
        assert!((StandardWeight::Entropy.weight(0.5) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_reflected_weight_agrees_away_from_one() {
        for w in StandardWeight::ALL {
            for u in [0.125, 0.25, 0.5] {
                let direct = w.weight(1.0 - u);
                assert!((w.weight_reflected(u) - direct).abs() <= 1e-12 * direct);
            }
        }
        let custom = FnWeight::new("tilted", |c: f64| 1.0 + c);
        assert_eq!(custom.weight_reflected(0.25), 1.75);
    }

    #[test]
    fn test_reflected_entropy_resolves_thresholds_near_one() {
        // 1 - (1 - 1e-13) comes back as 1.0003e-13
        let u = 1e-13;
        let exact = 1.0 / ((1.0 - u) * u);
        let reflected = StandardWeight::Entropy.weight_reflected(u);
        let direct = StandardWeight::Entropy.weight(1.0 - u);
        assert!((reflected - exact).abs() <= 1e-15 * exact);
        assert!((direct - exact).abs() > 1e-4 * exact);
        assert!(StandardWeight::Entropy.weight_reflected(0.0).is_infinite());
    }

    #[test]
    fn test_entropy_endpoints_are_degenerate() {
        for c in [0.0, 1.0] {
            let err = checked_weight(&StandardWeight::Entropy, c).unwrap_err();
            match err {
                Error::DegenerateWeight {
                    weight, threshold, ..
                } => {
                    assert_eq!(weight, "entropy");
                    assert_eq!(threshold, c);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(checked_weight(&StandardWeight::Entropy, 0.001).is_ok());
    }

    #[test]
    fn test_negative_custom_weight_rejected() {
        let w = FnWeight::new("neg", |_c| -1.0);
        assert!(checked_weight(&w, 0.5).is_err());
    }

    #[test]
    fn test_weight_parse_and_display() {
        assert_eq!("brier".parse::<StandardWeight>().unwrap(), StandardWeight::Quadratic);
        assert_eq!(
            "cross_entropy".parse::<StandardWeight>().unwrap(),
            StandardWeight::Entropy
        );
        assert!("cubic".parse::<StandardWeight>().is_err());
        for w in StandardWeight::ALL {
            assert_eq!(w.to_string().parse::<StandardWeight>().unwrap(), w);
        }
    }

    #[test]
    fn test_weight_serde_aliases() {
        let w: StandardWeight = serde_json::from_str("\"brier\"").unwrap();
        assert_eq!(w, StandardWeight::Quadratic);
        assert_eq!(serde_json::to_string(&StandardWeight::Entropy).unwrap(), "\"entropy\"");
    }

    #[test]
    fn test_dyn_weight_usable() {
        let weights: Vec<Box<dyn WeightFunction>> = vec![
            Box::new(StandardWeight::Uniform),
            Box::new(FnWeight::new("half", |_| 0.5)),
        ];
        let total: f64 = weights
            .iter()
            .map(|w| checked_weight(w.as_ref(), 0.2).unwrap())
            .sum();
        assert_eq!(total, 1.5);
    }
}
