//! Per-datapoint integrated loss.
//!
//! Each datapoint's elementary loss, weighted and divided by `n`, is
//! integrated over the whole threshold domain. The integrand jumps at the
//! datapoint's own probability, so the domain is split there before running
//! the adaptive quadrature. With the quadratic weight the integrated losses
//! sum to the Brier score; with the entropy weight to the mean log loss.
//!
//! The upper half `[1/2, 1]` is integrated in `u = 1 - c`. Floats are dense
//! near `u = 0` but sparse near `c = 1`, and an entropy-weighted negative at
//! `p = 1 - 1e-12` concentrates its loss within `1e-12` of the top.

use dpl_common::{DatapointId, Error, Label, Predictions, Result};
use serde::{Deserialize, Serialize};

use super::decompose::peeling_order;
use super::kernel::{elementary_loss, reflected_loss};
use super::quadrature::{integrate_with_breaks, QuadratureConfig, QuadratureError};
use super::weight::WeightFunction;

/// Integrated loss of one datapoint next to its predicted probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinnedLossSample {
    pub id: DatapointId,
    pub probability: f64,
    pub loss: f64,
}

/// Integrand on `c` in `[0, 1/2]`. Every input is fixed per call.
#[inline]
fn lower_integrand<W: WeightFunction + ?Sized>(weight: &W, p: f64, target: Label, n: f64, c: f64) -> f64 {
    let l = elementary_loss(p, target, c);
    if l == 0.0 {
        // keeps w(c) out of the zero region, where it may be unbounded
        return 0.0;
    }
    weight.weight(c) * (l / n)
}

/// Integrand on `u = 1 - c` in `[0, 1/2]`.
#[inline]
fn upper_integrand<W: WeightFunction + ?Sized>(weight: &W, p: f64, target: Label, n: f64, u: f64) -> f64 {
    let l = reflected_loss(p, target, u);
    if l == 0.0 {
        return 0.0;
    }
    weight.weight_reflected(u) * (l / n)
}

/// Threshold at which the loss integral of `(p, target)` is infinite.
///
/// A negative at `p = 1` keeps a loss of nearly 1 up to `c = 1`, and a
/// positive at `p = 0` from `c = 0`; with a weight that is infinite at that
/// edge the integral has no finite value.
fn divergent_edge<W: WeightFunction + ?Sized>(weight: &W, p: f64, target: Label) -> Option<f64> {
    let edge = match target {
        Label::Negative if p >= 1.0 => 1.0,
        Label::Positive if p <= 0.0 => 0.0,
        _ => return None,
    };
    (!weight.weight(edge).is_finite()).then_some(edge)
}

fn integrated_loss<W: WeightFunction + ?Sized>(
    weight: &W,
    p: f64,
    target: Label,
    n: f64,
    config: &QuadratureConfig,
) -> std::result::Result<f64, QuadratureError> {
    let lower = integrate_with_breaks(
        |c| lower_integrand(weight, p, target, n, c),
        0.0,
        0.5,
        &[p],
        config,
    )?;
    let upper = integrate_with_breaks(
        |u| upper_integrand(weight, p, target, n, u),
        0.0,
        0.5,
        &[1.0 - p],
        config,
    )?;
    Ok(lower.value + upper.value)
}

/// Integrated loss of every datapoint of `target`, in peeling order.
///
/// Fails with [`Error::DivergentIntegral`] when a datapoint's loss is
/// infinite under `weight`, and with [`Error::IntegrationFailed`] when the
/// quadrature cannot resolve it.
pub fn binned_losses<W: WeightFunction + ?Sized>(
    predictions: &Predictions,
    weight: &W,
    target: Label,
    config: &QuadratureConfig,
) -> Result<Vec<BinnedLossSample>> {
    let n = predictions.len() as f64;
    let mut samples = Vec::with_capacity(predictions.class_count(target));

    for id in peeling_order(predictions, target) {
        let Some(prediction) = predictions.get(id) else {
            continue;
        };
        let p = prediction.probability();
        if let Some(threshold) = divergent_edge(weight, p, target) {
            return Err(Error::DivergentIntegral {
                datapoint: id.index(),
                threshold,
            });
        }
        let loss = integrated_loss(weight, p, target, n, config).map_err(|e| {
            Error::IntegrationFailed {
                datapoint: id.index(),
                reason: e.to_string(),
            }
        })?;
        samples.push(BinnedLossSample {
            id,
            probability: p,
            loss,
        });
    }

    Ok(samples)
}

/// Integrated losses for several targets, concatenated in target order.
pub fn binned_losses_for<W: WeightFunction + ?Sized>(
    predictions: &Predictions,
    weight: &W,
    targets: &[Label],
    config: &QuadratureConfig,
) -> Result<Vec<BinnedLossSample>> {
    let mut out = Vec::new();
    let mut done: Vec<Label> = Vec::with_capacity(2);
    for &target in targets {
        if done.contains(&target) {
            continue;
        }
        done.push(target);
        out.extend(binned_losses(predictions, weight, target, config)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::weight::{FnWeight, StandardWeight};

    #[test]
    fn test_single_negative_uniform() {
        let preds = Predictions::from_slices(&[0.5], &[0u8]).unwrap();
        let out = binned_losses(
            &preds,
            &StandardWeight::Uniform,
            Label::Negative,
            &QuadratureConfig::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].probability, 0.5);
        assert!((out[0].loss - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_brier_closed_form() {
        let probs = [0.1, 0.4, 0.35, 0.8, 0.65, 0.0, 1.0];
        let labels = [0u8, 1, 0, 1, 0, 1, 0];
        let preds = Predictions::from_slices(&probs, &labels).unwrap();
        let cfg = QuadratureConfig::default();

        let total: f64 = binned_losses_for(&preds, &StandardWeight::Quadratic, &Label::ALL, &cfg)
            .unwrap()
            .iter()
            .map(|s| s.loss)
            .sum();
        let brier: f64 = probs
            .iter()
            .zip(labels)
            .map(|(p, y)| (p - y as f64).powi(2))
            .sum::<f64>()
            / probs.len() as f64;
        assert!((total - brier).abs() < 1e-10, "{} vs {}", total, brier);
    }

    #[test]
    fn test_log_loss_closed_form() {
        let probs = [0.1, 0.4, 0.35, 0.8, 0.65];
        let labels = [0u8, 1, 0, 1, 0];
        let preds = Predictions::from_slices(&probs, &labels).unwrap();
        let cfg = QuadratureConfig::default();

        let samples =
            binned_losses_for(&preds, &StandardWeight::Entropy, &Label::ALL, &cfg).unwrap();
        let total: f64 = samples.iter().map(|s| s.loss).sum();
        let log_loss: f64 = probs
            .iter()
            .zip(labels)
            .map(|(&p, y)| if y == 1 { -p.ln() } else { -(1.0 - p).ln() })
            .sum::<f64>()
            / probs.len() as f64;
        assert!((total - log_loss).abs() < 1e-8, "{} vs {}", total, log_loss);
    }

    #[test]
    fn test_order_follows_peeling() {
        let preds = Predictions::from_slices(&[0.7, 0.3, 0.9], &[0u8, 0, 1]).unwrap();
        let out = binned_losses(
            &preds,
            &StandardWeight::Uniform,
            Label::Negative,
            &QuadratureConfig::default(),
        )
        .unwrap();
        let ids: Vec<_> = out.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![DatapointId(1), DatapointId(0)]);
    }

    #[test]
    fn test_empty_class_is_empty() {
        let preds = Predictions::from_slices(&[0.7], &[0u8]).unwrap();
        let out = binned_losses(
            &preds,
            &StandardWeight::Uniform,
            Label::Positive,
            &QuadratureConfig::default(),
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_non_finite_weight_is_integration_failure() {
        let preds = Predictions::from_slices(&[0.2, 0.9], &[0u8, 0]).unwrap();
        let spiky = FnWeight::new("spiky", |c: f64| if c > 0.5 { f64::NAN } else { 1.0 });
        let err = binned_losses(&preds, &spiky, Label::Negative, &QuadratureConfig::default())
            .unwrap_err();
        match err {
            Error::IntegrationFailed { datapoint, .. } => assert_eq!(datapoint, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_entropy_near_certain_negative() {
        let cfg = QuadratureConfig::default();
        for p in [0.9999999, 1.0 - 1e-12, 1.0 - 1e-15] {
            let preds = Predictions::from_slices(&[p], &[0u8]).unwrap();
            let out = binned_losses(&preds, &StandardWeight::Entropy, Label::Negative, &cfg)
                .unwrap();
            // 1 - p is exact here
            let expected = -(1.0 - p).ln();
            assert!(
                (out[0].loss - expected).abs() <= 1e-10 * expected,
                "p = {p}: {} vs {expected}",
                out[0].loss
            );
        }
    }

    #[test]
    fn test_entropy_near_certain_positive() {
        let cfg = QuadratureConfig::default();
        for p in [1e-7, 1e-12, 1e-15] {
            let preds = Predictions::from_slices(&[p], &[1u8]).unwrap();
            let out = binned_losses(&preds, &StandardWeight::Entropy, Label::Positive, &cfg)
                .unwrap();
            let expected = -p.ln();
            assert!(
                (out[0].loss - expected).abs() <= 1e-10 * expected,
                "p = {p}: {} vs {expected}",
                out[0].loss
            );
        }
    }

    #[test]
    fn test_confidently_wrong_entropy_diverges() {
        let cfg = QuadratureConfig::default();

        let preds = Predictions::from_slices(&[0.3, 1.0], &[0u8, 0]).unwrap();
        let err = binned_losses(&preds, &StandardWeight::Entropy, Label::Negative, &cfg)
            .unwrap_err();
        match err {
            Error::DivergentIntegral {
                datapoint,
                threshold,
            } => {
                assert_eq!(datapoint, 1);
                assert_eq!(threshold, 1.0);
            }
            other => panic!("unexpected error: {other}"),
        }

        let preds = Predictions::from_slices(&[0.0], &[1u8]).unwrap();
        let err = binned_losses(&preds, &StandardWeight::Entropy, Label::Positive, &cfg)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DivergentIntegral { datapoint: 0, threshold } if threshold == 0.0
        ));
    }

    #[test]
    fn test_confidently_wrong_bounded_weight_is_finite() {
        let cfg = QuadratureConfig::default();
        let preds = Predictions::from_slices(&[1.0, 0.0], &[0u8, 1]).unwrap();
        let out = binned_losses_for(&preds, &StandardWeight::Uniform, &Label::ALL, &cfg).unwrap();
        // each contributes (1/2) / n
        for sample in &out {
            assert!((sample.loss - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_confidently_right_entropy_is_zero() {
        let cfg = QuadratureConfig::default();
        let preds = Predictions::from_slices(&[0.0, 1.0], &[0u8, 1]).unwrap();
        let out = binned_losses_for(&preds, &StandardWeight::Entropy, &Label::ALL, &cfg).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| s.loss == 0.0));
    }

    #[test]
    fn test_repeatable() {
        let preds = Predictions::from_slices(&[0.15, 0.55, 0.95], &[1u8, 1, 1]).unwrap();
        let cfg = QuadratureConfig::default();
        let a = binned_losses(&preds, &StandardWeight::Entropy, Label::Positive, &cfg).unwrap();
        let b = binned_losses(&preds, &StandardWeight::Entropy, Label::Positive, &cfg).unwrap();
        assert_eq!(a, b);
    }
}
