//! Fuzz target for the peeling decomposition.
//!
//! Arbitrary predictions go through validation; every accepted dataset must
//! decompose without panicking and the per-class envelope must reproduce the
//! class curve.

#![no_main]

use arbitrary::Arbitrary;
use dpl_common::{Label, Predictions};
use dpl_math::{class_loss_curve, decompose, StandardWeight, ThresholdGrid};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    points: Vec<(u16, bool)>,
    grid_points: u8,
    quadratic: bool,
}

fuzz_target!(|input: Input| {
    if input.points.len() > 256 {
        return;
    }
    let probabilities: Vec<f64> = input
        .points
        .iter()
        .map(|&(p, _)| p as f64 / u16::MAX as f64)
        .collect();
    let labels: Vec<i64> = input.points.iter().map(|&(_, y)| y as i64).collect();

    let Ok(predictions) = Predictions::from_slices(&probabilities, &labels) else {
        return;
    };
    let Ok(grid) = ThresholdGrid::linspace(input.grid_points.max(2) as usize) else {
        return;
    };
    let weight = if input.quadratic {
        StandardWeight::Quadratic
    } else {
        StandardWeight::Uniform
    };

    let targets = [Label::Negative, Label::Positive];
    let Ok(decomposition) = decompose(&predictions, &weight, &grid, &targets, None) else {
        return;
    };

    for target in targets {
        let Ok(class) = class_loss_curve(&predictions, &weight, &grid, target) else {
            continue;
        };
        let envelope = decomposition.envelope(target);
        for (a, b) in envelope.values.iter().zip(&class.values) {
            assert!((a - b).abs() <= 1e-9 * (1.0 + b.abs()), "{} vs {}", a, b);
        }
    }
});
