//! Physically-based compound-lens simulation for camera rays.
//!
//! A lens is described as an ordered prescription of refractive surfaces
//! (front to rear). From it the crate derives the paraxial sensor conjugate
//! and exit pupil, then traces individual sensor rays sequentially through
//! every surface with exact intersection, Snell refraction and Fresnel
//! weights, including importance-sampled double-reflection ghosts.
//!
//! The main entry point is [`camera::LensCamera`]: build one per lens /
//! settings / focus-distance configuration, share it across threads, and
//! call [`camera::LensCamera::generate_ray`] per sample.

#[macro_use]
extern crate log;

pub mod core;

pub mod camera;
pub mod error;
pub mod focus;
pub mod ghost;
pub mod intersect;
pub mod paraxial;
pub mod prescription;
pub mod trace;

pub use camera::{CameraRay, CameraSample, CameraSettings, DebugMode, LensCamera};
pub use error::{LensError, Result};
pub use prescription::{AsphericTerms, LensPrescription, Surface, SurfaceKind, MAX_SURFACES};
pub use trace::TraceOutcome;
