//! Sequential surface tracing.
//!
//! Rays walk a contiguous surface range in prescription order or its
//! reverse. Each non-stop surface refracts (or, for ghost paths, reflects)
//! the ray and scales its throughput by the Fresnel coefficient; the stop
//! clips against the shaped working aperture and passes the ray through
//! unmodified. Blocked rays are ordinary outcomes, never errors.

use crate::core::geometry::{Point2f, Point3f, Ray};
use crate::core::pbrt::Float;
use crate::core::reflection::{fr_dielectric, reflect, refract};
use crate::core::sampling::inside_regular_polygon;
use crate::intersect::{intersect_sphere, intersect_surface, SurfaceHit};
use crate::prescription::{LensPrescription, SurfaceKind, MAX_SURFACES};

/// Axial gap below which two adjacent surfaces are treated as numerically
/// overlapping for the clipped-hit retry. A tuning epsilon, not a physical
/// law.
pub const SPHERE_OVERLAP_EPSILON: Float = 0.05;

/// Reference wavelength (helium d line, nm); the line glass catalogs quote
/// base indices at.
pub const DESIGN_WAVELENGTH: Float = 587.56;

/// Fraunhofer F line (nm), used to fit the dispersion model.
const LAMBDA_F: Float = 486.13;

/// Fraunhofer C line (nm), used to fit the dispersion model.
const LAMBDA_C: Float = 656.27;

/// Wavelength-dependent index of refraction from a base index and Abbe
/// number, using a two-term Cauchy model `n(λ) = A + B/λ²` fitted so the
/// F-to-C spread matches the Abbe number. Non-dispersive media
/// (`abbe_v <= 0`) return the base index unchanged.
///
/// * `n_d`       - Index at the design wavelength.
/// * `abbe_v`    - Abbe number.
/// * `lambda_nm` - Wavelength in nanometres.
pub fn dispersive_ior(n_d: Float, abbe_v: Float, lambda_nm: Float) -> Float {
    if abbe_v <= 0.0 || n_d == 1.0 {
        return n_d;
    }
    let b = (n_d - 1.0) / (abbe_v * (1.0 / (LAMBDA_F * LAMBDA_F) - 1.0 / (LAMBDA_C * LAMBDA_C)));
    let a = n_d - b / (DESIGN_WAVELENGTH * DESIGN_WAVELENGTH);
    a + b / (lambda_nm * lambda_nm)
}

/// The working aperture shape applied at the stop: a circle scaled for the
/// working f-stop, or a regular polygon when the iris has discrete blades.
#[derive(Copy, Clone, Debug)]
pub struct ApertureShape {
    /// Stop scaling for the working f-stop, in (0, 1].
    pub scale: Float,

    /// Number of iris blades; below 3 the aperture is circular.
    pub blades: u32,

    /// Blade rotation in radians.
    pub rotation: Float,
}

impl Default for ApertureShape {
    fn default() -> Self {
        Self {
            scale: 1.0,
            blades: 0,
            rotation: 0.0,
        }
    }
}

impl ApertureShape {
    /// Returns true when a stop-plane point is inside the working aperture.
    ///
    /// * `p`                 - The hit point.
    /// * `mechanical_radius` - Stop semi-aperture at the widest f-stop.
    pub fn contains(&self, p: &Point3f, mechanical_radius: Float) -> bool {
        let radius = mechanical_radius * self.scale;
        if self.blades >= 3 {
            inside_regular_polygon(&Point2f::new(p.x, p.y), self.blades, radius, self.rotation)
        } else {
            p.radius_squared() <= radius * radius
        }
    }
}

/// Everything a trace needs, borrowed per call: the immutable prescription
/// plus the per-configuration derived tables. `Copy`-cheap, allocation
/// free.
#[derive(Copy, Clone)]
pub struct TraceCtx<'a> {
    /// The lens prescription.
    pub rx: &'a LensPrescription,

    /// Adjusted per-surface gaps for the working focus distance.
    pub thicknesses: &'a [Float; MAX_SURFACES],

    /// Surface vertex z positions for those gaps.
    pub vertex_z: &'a [Float; MAX_SURFACES],

    /// Sampled wavelength (nm) when dispersion is enabled.
    pub wavelength: Option<Float>,

    /// Working aperture shape at the stop.
    pub aperture: ApertureShape,
}

impl<'a> TraceCtx<'a> {
    /// Index of refraction of the medium behind surface `i` (towards the
    /// sensor), at the working wavelength.
    pub fn ior_after(&self, i: usize) -> Float {
        let s = &self.rx.surfaces()[i];
        match self.wavelength {
            Some(lambda) => dispersive_ior(s.ior_after, s.abbe_v, lambda),
            None => s.ior_after,
        }
    }

    /// Index of refraction of the medium ahead of surface `i` (towards the
    /// scene), at the working wavelength.
    pub fn ior_before(&self, i: usize) -> Float {
        if i == 0 {
            1.0
        } else {
            self.ior_after(i - 1)
        }
    }
}

/// How a range trace ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceOutcome {
    /// The ray crossed every surface in the range.
    Complete,

    /// The ray missed a surface's geometry.
    Miss,

    /// The ray was clipped by a clear aperture or the stop.
    Clipped,

    /// Refraction degenerated at an interface beyond the critical angle.
    TotalInternalReflection,
}

/// Result of tracing a surface range: the ray where it left the range, the
/// accumulated Fresnel weight, and how the walk ended. Throughput is forced
/// to zero for every non-`Complete` outcome.
#[derive(Copy, Clone, Debug)]
pub struct RangeTrace {
    /// The exiting (or last valid) ray.
    pub ray: Ray,

    /// Product of per-surface Fresnel transmittances (and reflectances at
    /// designated bounce surfaces).
    pub transmittance: Float,

    /// Terminal state of the walk.
    pub outcome: TraceOutcome,
}

impl RangeTrace {
    fn blocked(ray: Ray, outcome: TraceOutcome) -> Self {
        Self {
            ray,
            transmittance: 0.0,
            outcome,
        }
    }
}

/// Walks surfaces from `start` to `end` inclusive (the step is inferred),
/// refracting at every non-stop surface except `reflect_at`, which
/// specularly reflects instead. `refine` enables the sphere-overlap retry
/// used by the direct path.
///
/// * `ctx`        - Trace context.
/// * `ray`        - Ray entering the range.
/// * `start`      - First surface index.
/// * `end`        - Last surface index (inclusive).
/// * `reflect_at` - Surface that reflects instead of refracting.
/// * `refine`     - Enable the clipped-hit sphere-overlap retry.
pub fn trace_surface_range(
    ctx: &TraceCtx,
    ray: Ray,
    start: usize,
    end: usize,
    reflect_at: Option<usize>,
    refine: bool,
) -> RangeTrace {
    let step: isize = if end >= start { 1 } else { -1 };
    let mut ray = ray;
    let mut transmittance = 1.0;

    let mut i = start as isize;
    loop {
        let index = i as usize;
        let surface = &ctx.rx.surfaces()[index];

        let mut hit = intersect_surface(surface, ctx.vertex_z[index], &ray);
        let mut merged = false;
        if refine && reflect_at.is_none() && matches!(hit, SurfaceHit::Clipped) {
            if let Some(retried) = sphere_overlap_retry(ctx, &ray, index, step) {
                hit = retried;
                merged = true;
            }
        }

        let (p, n) = match hit {
            SurfaceHit::Hit { p, n } => (p, n),
            SurfaceHit::Miss => return RangeTrace::blocked(ray, TraceOutcome::Miss),
            SurfaceHit::Clipped => return RangeTrace::blocked(ray, TraceOutcome::Clipped),
        };

        if merged {
            // Inside the overlap sliver this surface's boundary and the
            // neighbor's curve coincide: cross both at the sphere point with
            // a single refraction between the outer media, then skip the
            // neighbor in the walk (its geometry was just consumed).
            if surface.kind == SurfaceKind::Stop
                && !ctx.aperture.contains(&p, surface.aperture_radius)
            {
                return RangeTrace::blocked(ray, TraceOutcome::Clipped);
            }
            let neighbor = (i + step) as usize;
            let rear = index.max(neighbor);
            let front = index.min(neighbor);
            let (n_incident, n_transmitted) = if ray.d.z < 0.0 {
                (ctx.ior_after(rear), ctx.ior_before(front))
            } else {
                (ctx.ior_before(front), ctx.ior_after(rear))
            };
            let wi = -ray.d.normalize();
            let cos_theta_i = wi.dot(&n);
            match refract(&wi, &n, n_incident / n_transmitted) {
                Some(wt) => {
                    transmittance *= 1.0 - fr_dielectric(cos_theta_i, n_incident, n_transmitted);
                    ray.d = wt;
                    ray.o = p;
                }
                None => return RangeTrace::blocked(ray, TraceOutcome::TotalInternalReflection),
            }
            if i == end as isize || neighbor == end {
                break;
            }
            i += 2 * step;
            continue;
        }

        if surface.kind == SurfaceKind::Stop {
            // Shaped working-aperture clip; the ray itself is unchanged.
            if !ctx.aperture.contains(&p, surface.aperture_radius) {
                return RangeTrace::blocked(ray, TraceOutcome::Clipped);
            }
            ray.o = p;
        } else {
            // Media on either side of the interface, resolved from the
            // instantaneous travel direction so reflected legs stay
            // consistent.
            let (n_incident, n_transmitted) = if ray.d.z < 0.0 {
                (ctx.ior_after(index), ctx.ior_before(index))
            } else {
                (ctx.ior_before(index), ctx.ior_after(index))
            };

            let wi = -ray.d.normalize();
            let cos_theta_i = wi.dot(&n);

            if reflect_at == Some(index) {
                transmittance *= fr_dielectric(cos_theta_i, n_incident, n_transmitted);
                ray.d = reflect(&ray.d, &n);
                ray.o = p;
            } else {
                match refract(&wi, &n, n_incident / n_transmitted) {
                    Some(wt) => {
                        transmittance *=
                            1.0 - fr_dielectric(cos_theta_i, n_incident, n_transmitted);
                        ray.d = wt;
                        ray.o = p;
                    }
                    None => {
                        return RangeTrace::blocked(ray, TraceOutcome::TotalInternalReflection)
                    }
                }
            }
        }

        if i == end as isize {
            break;
        }
        i += step;
    }

    RangeTrace {
        ray,
        transmittance,
        outcome: TraceOutcome::Complete,
    }
}

/// Retry a clipped hit against the curve of the adjacent surface.
///
/// When a flat-ish surface sits within `SPHERE_OVERLAP_EPSILON` of a curved
/// neighbor, the plane can clip a rim ray that the neighbor's sagging curve
/// would actually catch, losing energy spuriously. The retry intersects the
/// neighbor's sphere instead and accepts the hit when it lies inside this
/// surface's clear aperture; the caller then treats both boundaries as
/// crossed at that point, since the sliver between them is thinner than the
/// epsilon.
fn sphere_overlap_retry(
    ctx: &TraceCtx,
    ray: &Ray,
    index: usize,
    step: isize,
) -> Option<SurfaceHit> {
    let surface = &ctx.rx.surfaces()[index];
    if surface.kind.is_curved() {
        return None;
    }

    let neighbor_index = index as isize + step;
    if neighbor_index < 0 || neighbor_index >= ctx.rx.len() as isize {
        return None;
    }
    let neighbor_index = neighbor_index as usize;
    let neighbor = &ctx.rx.surfaces()[neighbor_index];
    if !neighbor.kind.is_curved() {
        return None;
    }

    // Gap between this surface and the neighbor along the walk.
    let gap = if step < 0 {
        ctx.thicknesses[neighbor_index]
    } else {
        ctx.thicknesses[index]
    };
    if gap.abs() >= SPHERE_OVERLAP_EPSILON {
        return None;
    }

    let retried = intersect_sphere(
        neighbor.radius,
        ctx.vertex_z[neighbor_index],
        surface.aperture_radius,
        ray,
    );
    retried.is_hit().then_some(retried)
}

/// Full direct trace: rear vertex to front vertex across every surface,
/// with the overlap refinement enabled.
///
/// * `ctx` - Trace context.
/// * `ray` - Ray leaving the sensor towards the rear element.
pub fn trace_lens_system(ctx: &TraceCtx, ray: Ray) -> RangeTrace {
    trace_surface_range(ctx, ray, ctx.rx.len() - 1, 0, None, true)
}
