//! The elementary loss shared by every computation in this crate.
//!
//! At threshold `c`, a negative predicted above `c` costs `c` and a positive
//! predicted at or below `c` costs `1 - c`. The comparison is strict on the
//! negative side and non-strict on the positive side, which fixes the
//! tie-breaking at `p = c`.

use dpl_common::{Label, Prediction};

/// Unweighted cost of misclassification at threshold `c`.
#[inline]
pub fn elementary_loss(probability: f64, label: Label, c: f64) -> f64 {
    match label {
        Label::Negative if probability > c => c,
        Label::Positive if probability <= c => 1.0 - c,
        _ => 0.0,
    }
}

/// [`elementary_loss`] at `c = 1 - u`, computed from `u`.
///
/// The comparison uses `1 - p`, which is exact for `p >= 0.5`, so the jump
/// lands where it should even when `u` is far below the float spacing at 1.
#[inline]
pub fn reflected_loss(probability: f64, label: Label, u: f64) -> f64 {
    let q = 1.0 - probability;
    match label {
        Label::Negative if q < u => 1.0 - u,
        Label::Positive if q >= u => u,
        _ => 0.0,
    }
}

/// [`elementary_loss`] for a paired prediction.
#[inline]
pub fn prediction_loss(prediction: &Prediction, c: f64) -> f64 {
    elementary_loss(prediction.probability(), prediction.label(), c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_side_is_strict() {
        assert_eq!(elementary_loss(0.6, Label::Negative, 0.5), 0.5);
        assert_eq!(elementary_loss(0.5, Label::Negative, 0.5), 0.0);
        assert_eq!(elementary_loss(0.4, Label::Negative, 0.5), 0.0);
    }

    #[test]
    fn test_positive_side_is_inclusive() {
        assert_eq!(elementary_loss(0.4, Label::Positive, 0.5), 0.5);
        assert_eq!(elementary_loss(0.5, Label::Positive, 0.5), 0.5);
        assert_eq!(elementary_loss(0.6, Label::Positive, 0.5), 0.0);
    }

    #[test]
    fn test_endpoints() {
        // p = 0 never exceeds c >= 0; p = 1 is never <= c < 1
        assert_eq!(elementary_loss(0.0, Label::Negative, 0.0), 0.0);
        assert_eq!(elementary_loss(1.0, Label::Positive, 0.999), 0.0);
        assert_eq!(elementary_loss(1.0, Label::Positive, 1.0), 0.0);
        assert_eq!(elementary_loss(0.0, Label::Positive, 0.0), 1.0);
    }

    #[test]
    fn test_reflected_loss_matches_kernel() {
        // u and 1 - u both exact, so the two forms must agree bit for bit
        for p in [0.0, 0.2, 0.5, 0.625, 0.75, 0.9, 1.0] {
            for u in [0.0, 0.125, 0.25, 0.375, 0.5] {
                for label in Label::ALL {
                    assert_eq!(
                        reflected_loss(p, label, u),
                        elementary_loss(p, label, 1.0 - u),
                        "p = {p}, u = {u}, label = {label}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_reflected_loss_near_one() {
        let p = 1.0 - 1e-12;
        assert_eq!(reflected_loss(p, Label::Negative, 2e-12), 1.0 - 2e-12);
        assert_eq!(reflected_loss(p, Label::Negative, 5e-13), 0.0);
        assert_eq!(reflected_loss(p, Label::Positive, 5e-13), 5e-13);
    }

    #[test]
    fn test_prediction_loss_matches_kernel() {
        let p = Prediction::new(0.8, Label::Negative);
        assert_eq!(prediction_loss(&p, 0.25), 0.25);
    }
}
