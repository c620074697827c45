//! Core math modules.

pub mod weight;
pub mod grid;
pub mod kernel;
pub mod curve;
pub mod decompose;
pub mod quadrature;
pub mod binner;
pub mod histogram;
