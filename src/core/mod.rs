//! Core math, geometry, reflection and sampling support.

pub mod geometry;
pub mod pbrt;
pub mod reflection;
pub mod sampling;
