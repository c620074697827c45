//! Adaptive Gauss–Kronrod quadrature.
//!
//! Global adaptive scheme: keep a list of subintervals, each integrated with
//! the 15-point Kronrod rule (error estimated against the embedded 7-point
//! Gauss rule), and repeatedly bisect the one with the largest error until
//! the summed error satisfies `max(abs_tol, rel_tol · |result|)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[allow(clippy::excessive_precision)] // Published QK15 abscissae
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.0,
];

#[allow(clippy::excessive_precision)]
const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

/// Gauss weights for XGK[1], XGK[3], XGK[5] and the centre.
#[allow(clippy::excessive_precision)]
const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

/// Tolerances and limits for [`integrate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadratureConfig {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_subintervals: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            abs_tol: 1e-12,
            rel_tol: 1e-10,
            max_subintervals: 500,
        }
    }
}

impl QuadratureConfig {
    /// Sanity check, returning a description of the first problem found.
    pub fn check(&self) -> Result<(), String> {
        if !self.abs_tol.is_finite() || self.abs_tol < 0.0 {
            return Err(format!("abs_tol must be finite and >= 0, got {}", self.abs_tol));
        }
        if !self.rel_tol.is_finite() || self.rel_tol < 0.0 {
            return Err(format!("rel_tol must be finite and >= 0, got {}", self.rel_tol));
        }
        if self.abs_tol == 0.0 && self.rel_tol == 0.0 {
            return Err("abs_tol and rel_tol cannot both be zero".to_string());
        }
        if self.max_subintervals == 0 {
            return Err("max_subintervals must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Converged integral with its error estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrature {
    pub value: f64,
    pub error: f64,
    pub subintervals: usize,
}

/// Why an integration did not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuadratureError {
    /// The integrand returned NaN or infinity.
    #[error("integrand is not finite at x = {x}")]
    NonFinite { x: f64 },
    /// Subinterval budget exhausted before reaching the tolerance.
    #[error("no convergence after {subintervals} subintervals (estimate {value:.6e}, error {error:.3e})")]
    NotConverged {
        value: f64,
        error: f64,
        subintervals: usize,
    },
    /// Bounds or configuration are unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

fn qk15<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> Result<Segment, QuadratureError> {
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let eval = |x: f64| -> Result<f64, QuadratureError> {
        let y = f(x);
        if y.is_finite() {
            Ok(y)
        } else {
            Err(QuadratureError::NonFinite { x })
        }
    };

    let fc = eval(center)?;
    let mut kronrod = fc * WGK[7];
    let mut gauss = fc * WG[3];

    for j in 0..7 {
        let dx = half * XGK[j];
        let sum = eval(center - dx)? + eval(center + dx)?;
        kronrod += WGK[j] * sum;
        if j % 2 == 1 {
            gauss += WG[j / 2] * sum;
        }
    }

    Ok(Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    })
}

/// Integrate `f` over `[a, b]`.
///
/// An empty interval (`a == b`) integrates to zero without evaluating `f`.
pub fn integrate<F: Fn(f64) -> f64>(
    f: F,
    a: f64,
    b: f64,
    config: &QuadratureConfig,
) -> Result<Quadrature, QuadratureError> {
    config.check().map_err(QuadratureError::InvalidInput)?;
    if !a.is_finite() || !b.is_finite() || a > b {
        return Err(QuadratureError::InvalidInput(format!(
            "bounds must be finite with a <= b, got [{}, {}]",
            a, b
        )));
    }
    if a == b {
        return Ok(Quadrature {
            value: 0.0,
            error: 0.0,
            subintervals: 0,
        });
    }

    let mut segments = vec![qk15(&f, a, b)?];
    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = config.abs_tol.max(config.rel_tol * value.abs());
        if error <= tolerance {
            return Ok(Quadrature {
                value,
                error,
                subintervals: segments.len(),
            });
        }
        if segments.len() >= config.max_subintervals {
            return Err(QuadratureError::NotConverged {
                value,
                error,
                subintervals: segments.len(),
            });
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.error.total_cmp(&y.error))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);
        if mid <= seg.a || mid >= seg.b {
            // interval can no longer be split in floating point
            return Err(QuadratureError::NotConverged {
                value,
                error,
                subintervals: segments.len() + 1,
            });
        }
        segments.push(qk15(&f, seg.a, mid)?);
        segments.push(qk15(&f, mid, seg.b)?);
    }
}

/// Integrate over `[a, b]` split at `breakpoints` lying strictly inside.
///
/// Each piece is integrated independently with the same configuration, so
/// discontinuities placed at a breakpoint never land inside a Kronrod panel.
pub fn integrate_with_breaks<F: Fn(f64) -> f64>(
    f: F,
    a: f64,
    b: f64,
    breakpoints: &[f64],
    config: &QuadratureConfig,
) -> Result<Quadrature, QuadratureError> {
    let mut edges = vec![a];
    edges.extend(breakpoints.iter().copied().filter(|&x| x > a && x < b));
    edges.push(b);
    edges.sort_by(|x, y| x.total_cmp(y));
    edges.dedup();

    let mut total = Quadrature {
        value: 0.0,
        error: 0.0,
        subintervals: 0,
    };
    for w in edges.windows(2) {
        let piece = integrate(&f, w[0], w[1], config)?;
        total.value += piece.value;
        total.error += piece.error;
        total.subintervals += piece.subintervals;
    }
    Ok(total)
}
