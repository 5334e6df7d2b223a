//! Camera entry point: per-configuration precomputation and per-sample ray
//! generation.
//!
//! A `LensCamera` is built once per prescription / settings / focus-distance
//! combination and afterwards only read. `generate_ray` maps a film sample
//! plus a 2-D lens sample to a weighted lens-space ray, splitting samples
//! between the direct path and importance-sampled ghost paths.

use std::sync::Arc;

use crate::core::geometry::{Point2f, Point3f, Ray, Vector3f};
use crate::core::pbrt::Float;
use crate::core::sampling::{golden_shift, polar_sample_disk};
use crate::error::Result;
use crate::focus::{adjusted_thicknesses, vertex_positions};
use crate::ghost::{ghost_pairs, trace_ghost_path};
use crate::paraxial::{exit_pupil, field_exit_pupil, sensor_distance, ExitPupil};
use crate::prescription::{LensPrescription, MAX_SURFACES};
use crate::trace::{
    trace_lens_system, ApertureShape, TraceCtx, TraceOutcome, DESIGN_WAVELENGTH,
};

/// Sampled wavelength range in nanometres.
const LAMBDA_MIN: Float = 400.0;
const LAMBDA_MAX: Float = 700.0;

/// Rendering / inspection modes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DebugMode {
    /// Full lens simulation.
    #[default]
    Normal,

    /// Bypass the lens: every ray passes through the rear vertex.
    Pinhole,

    /// Encode the trace outcome in the ray weight so blocked regions can
    /// be visualised.
    Diagnostic,

    /// Return the exit direction with unit weight; the host maps it to a
    /// color.
    ExitDirectionOnly,

    /// Every sample takes the ghost branch.
    GhostsOnly,
}

/// User-facing camera settings.
#[derive(Copy, Clone, Debug)]
pub struct CameraSettings {
    /// Working f-number. Values faster than the lens maximum are clamped.
    pub fstop: Float,

    /// Iris blade count; below 3 the aperture is circular.
    pub aperture_blades: u32,

    /// Iris blade rotation in radians.
    pub blade_rotation: Float,

    /// Sample wavelengths and disperse through the glasses.
    pub chromatic: bool,

    /// Spend a fraction of samples on double-reflection ghosts.
    pub ghosts: bool,

    /// Fraction of samples routed to the ghost estimator.
    pub ghost_fraction: Float,

    /// Artistic multiplier on ghost energy.
    pub ghost_intensity: Float,

    /// Rendering / inspection mode.
    pub debug: DebugMode,

    /// Sensor width and height in millimetres; the film sample square maps
    /// onto this, with x additionally scaled by the anamorphic squeeze.
    pub sensor_size: Point2f,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fstop: 5.6,
            aperture_blades: 0,
            blade_rotation: 0.0,
            chromatic: false,
            ghosts: false,
            ghost_fraction: 0.1,
            ghost_intensity: 1.0,
            debug: DebugMode::Normal,
            sensor_size: Point2f::new(36.0, 24.0),
        }
    }
}

/// One camera sample: a film position and a 2-D lens sample, both in
/// `[0, 1)²`, supplied by the host's sampler.
#[derive(Copy, Clone, Debug)]
pub struct CameraSample {
    pub p_film: Point2f,
    pub u_lens: Point2f,
}

/// A generated lens-space ray with its radiometric weight. A zero weight
/// with a non-`Complete` outcome means the sample was absorbed inside the
/// lens; hosts should treat it as black, not as an error.
#[derive(Copy, Clone, Debug)]
pub struct CameraRay {
    pub ray: Ray,
    pub weight: Float,
    pub wavelength: Float,
    pub outcome: TraceOutcome,
}

impl CameraRay {
    fn blocked(ray: Ray, wavelength: Float, outcome: TraceOutcome) -> Self {
        Self {
            ray: Ray::new(ray.o, Vector3f::new(0.0, 0.0, 0.0)),
            weight: 0.0,
            wavelength,
            outcome,
        }
    }
}

/// The camera: an immutable bundle of the prescription and every derived
/// table for one settings / focus-distance configuration. `Send + Sync`;
/// `generate_ray` takes `&self` and never allocates.
pub struct LensCamera {
    rx: Arc<LensPrescription>,
    settings: CameraSettings,
    thicknesses: [Float; MAX_SURFACES],
    vertex_z: [Float; MAX_SURFACES],
    sensor_z: Float,
    pupil: ExitPupil,
    aperture: ApertureShape,
    pairs: Vec<(usize, usize)>,
    t_onaxis: Float,
}

impl LensCamera {
    /// Builds a camera for one focus distance.
    ///
    /// Precomputes the adjusted thicknesses, vertex positions, sensor
    /// conjugate, on-axis exit pupils, ghost candidate pairs and the
    /// on-axis reference transmittance. Fails with `OpticalConfiguration`
    /// when the paraxial solve has no usable solution.
    ///
    /// * `rx`             - The lens prescription.
    /// * `settings`       - Camera settings.
    /// * `focus_distance` - Object distance to focus at (mm).
    pub fn new(
        rx: Arc<LensPrescription>,
        settings: CameraSettings,
        focus_distance: Float,
    ) -> Result<Self> {
        let mut aperture_scale = rx.max_fstop / settings.fstop;
        if aperture_scale > 1.0 {
            warn!(
                "f/{} is faster than the lens maximum f/{}; clamping wide open",
                settings.fstop, rx.max_fstop
            );
            aperture_scale = 1.0;
        }
        let aperture = ApertureShape {
            scale: aperture_scale,
            blades: settings.aperture_blades,
            rotation: settings.blade_rotation,
        };

        let thicknesses = adjusted_thicknesses(&rx, focus_distance);
        let vertex_z = vertex_positions(&rx, &thicknesses);
        let sensor_z = sensor_distance(&rx, &thicknesses, focus_distance)?;
        let pupil = exit_pupil(&rx, &thicknesses, aperture_scale)?;
        let pairs = ghost_pairs(&rx);

        let mut camera = Self {
            rx,
            settings,
            thicknesses,
            vertex_z,
            sensor_z,
            pupil,
            aperture,
            pairs,
            t_onaxis: 1.0,
        };

        let axial = trace_lens_system(
            &camera.ctx(None),
            Ray::new(
                Point3f::new(0.0, 0.0, sensor_z),
                Vector3f::new(0.0, 0.0, -1.0),
            ),
        );
        if axial.outcome == TraceOutcome::Complete && axial.transmittance > 0.0 {
            camera.t_onaxis = axial.transmittance;
        } else {
            warn!(
                "axial reference ray did not cross the lens ({:?}); \
                 transmittance normalization disabled",
                axial.outcome
            );
        }
        debug!(
            "camera ready: sensor at {:.3} mm, pupil radii ({:.3}, {:.3}) mm, \
             {} ghost pairs, T_onaxis {:.4}",
            sensor_z,
            camera.pupil.x.radius,
            camera.pupil.y.radius,
            camera.pairs.len(),
            camera.t_onaxis
        );
        Ok(camera)
    }

    /// Sensor plane position in lens space (mm, behind the rear vertex).
    pub fn sensor_distance(&self) -> Float {
        self.sensor_z
    }

    /// The on-axis exit pupil used for ray aiming.
    pub fn exit_pupil(&self) -> &ExitPupil {
        &self.pupil
    }

    /// On-axis reference transmittance.
    pub fn reference_transmittance(&self) -> Float {
        self.t_onaxis
    }

    fn ctx(&self, wavelength: Option<Float>) -> TraceCtx<'_> {
        TraceCtx {
            rx: &self.rx,
            thicknesses: &self.thicknesses,
            vertex_z: &self.vertex_z,
            wavelength,
            aperture: self.aperture,
        }
    }

    /// Generates the lens-space ray for one sample.
    ///
    /// The returned ray starts on the last crossed surface and heads into
    /// the scene (negative z). Blocked samples come back with zero weight
    /// and their outcome; they are part of the estimator, not failures.
    pub fn generate_ray(&self, sample: &CameraSample) -> CameraRay {
        // Film sample to sensor point; x pre-squeezed so the anamorphic
        // pupil unsqueezes it back to the full horizontal field.
        let p_sensor = Point2f::new(
            (sample.p_film.x - 0.5) * self.settings.sensor_size.x * self.rx.squeeze,
            (sample.p_film.y - 0.5) * self.settings.sensor_size.y,
        );

        let wavelength = if self.settings.chromatic {
            LAMBDA_MIN + (LAMBDA_MAX - LAMBDA_MIN) * golden_shift(sample.u_lens.x)
        } else {
            DESIGN_WAVELENGTH
        };

        if self.settings.debug == DebugMode::Pinhole {
            let o = Point3f::new(p_sensor.x, p_sensor.y, self.sensor_z);
            let d = (Point3f::new(0.0, 0.0, 0.0) - o).normalize();
            return CameraRay {
                ray: Ray::new(o, d),
                weight: 1.0,
                wavelength,
                outcome: TraceOutcome::Complete,
            };
        }

        // Ghost gate: a `ghost_fraction` slice of the lens sample space is
        // routed to the ghost estimator; the consumed coordinate is rescaled
        // back to [0, 1) for reuse as the pupil angle sample.
        let mut u = sample.u_lens;
        let ghosts_active = !self.pairs.is_empty()
            && (self.settings.ghosts || self.settings.debug == DebugMode::GhostsOnly);
        let gf = self.settings.ghost_fraction;
        let (take_ghost, ghost_probability) = if !ghosts_active {
            (false, 1.0)
        } else if self.settings.debug == DebugMode::GhostsOnly {
            (true, 1.0)
        } else if u.y < gf {
            u.y /= gf;
            (true, gf)
        } else {
            u.y = (u.y - gf) / (1.0 - gf);
            (false, 1.0 - gf)
        };

        // The pair index comes from the gate remainder: the integer part of
        // the scaled coordinate picks the pair and the fractional part is
        // rescaled once more for the pupil angle. The aperture-radius sample
        // in u.x is never consulted, so pair choice and pupil radius stay
        // independent.
        let ghost_pair = if take_ghost {
            let scaled = u.y * self.pairs.len() as Float;
            let idx = (scaled as usize).min(self.pairs.len() - 1);
            u.y = scaled - idx as Float;
            Some(self.pairs[idx])
        } else {
            None
        };

        let field = field_exit_pupil(
            &self.rx,
            &self.vertex_z,
            &self.pupil,
            p_sensor,
            self.sensor_z,
        );
        let initial = Ray::new(
            Point3f::new(p_sensor.x, p_sensor.y, self.sensor_z),
            Vector3f::new(0.0, 0.0, -1.0),
        );
        if field.radius_x <= 0.0 || field.radius_y <= 0.0 {
            return self.finish_blocked(initial, wavelength, TraceOutcome::Clipped);
        }

        // Elliptical pupil target; the per-axis planes can differ for
        // anamorphic designs, so the direction is assembled from per-axis
        // slopes in z.
        let disk = polar_sample_disk(&u);
        let target_x = field.center.x + disk.x * field.radius_x;
        let target_y = field.center.y + disk.y * field.radius_y;
        let slope_x = (target_x - p_sensor.x) / (field.z_x - self.sensor_z);
        let slope_y = (target_y - p_sensor.y) / (field.z_y - self.sensor_z);
        let ray = Ray::new(
            initial.o,
            Vector3f::new(-slope_x, -slope_y, -1.0).normalize(),
        );

        let ctx = self.ctx(self.settings.chromatic.then_some(wavelength));
        let traced = if let Some((lo, hi)) = ghost_pair {
            trace_ghost_path(&ctx, ray, lo, hi)
        } else {
            trace_lens_system(&ctx, ray)
        };

        match self.settings.debug {
            DebugMode::Diagnostic => CameraRay {
                ray: traced.ray,
                weight: outcome_code(traced.outcome),
                wavelength,
                outcome: traced.outcome,
            },
            DebugMode::ExitDirectionOnly => {
                if traced.outcome == TraceOutcome::Complete {
                    CameraRay {
                        ray: traced.ray,
                        weight: 1.0,
                        wavelength,
                        outcome: traced.outcome,
                    }
                } else {
                    CameraRay::blocked(traced.ray, wavelength, traced.outcome)
                }
            }
            _ => {
                if traced.outcome != TraceOutcome::Complete {
                    return self.finish_blocked(traced.ray, wavelength, traced.outcome);
                }
                let cos_theta = traced.ray.d.normalize().z.abs();
                let cos4 = (cos_theta * cos_theta) * (cos_theta * cos_theta);
                let mut weight =
                    cos4 * (traced.transmittance / self.t_onaxis) / ghost_probability;
                if take_ghost {
                    weight *= self.pairs.len() as Float * self.settings.ghost_intensity;
                }
                CameraRay {
                    ray: traced.ray,
                    weight,
                    wavelength,
                    outcome: traced.outcome,
                }
            }
        }
    }

    fn finish_blocked(&self, ray: Ray, wavelength: Float, outcome: TraceOutcome) -> CameraRay {
        if self.settings.debug == DebugMode::Diagnostic {
            CameraRay {
                ray,
                weight: outcome_code(outcome),
                wavelength,
                outcome,
            }
        } else {
            CameraRay::blocked(ray, wavelength, outcome)
        }
    }
}

/// Diagnostic weight codes, chosen so a grayscale render separates the
/// failure modes at a glance.
fn outcome_code(outcome: TraceOutcome) -> Float {
    match outcome {
        TraceOutcome::Complete => 1.0,
        TraceOutcome::Clipped => 0.75,
        TraceOutcome::Miss => 0.5,
        TraceOutcome::TotalInternalReflection => 0.25,
    }
}
