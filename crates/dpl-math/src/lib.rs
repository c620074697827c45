//! Threshold-indexed loss curves and their per-datapoint decomposition.

pub mod math;

pub use math::weight;
pub use math::grid::*;
pub use math::kernel::*;
pub use math::curve::*;
pub use math::decompose::*;
pub use math::quadrature;
pub use math::binner::*;
pub use math::histogram::*;

pub use math::quadrature::QuadratureConfig;
pub use math::weight::{checked_weight, FnWeight, StandardWeight, WeightFunction};
