//! Ray/surface intersection for each surface family.
//!
//! Pure geometry: nothing here mutates lens state, and each routine is
//! usable on its own. Hit normals are unit length and face the incoming
//! ray. The tri-state result distinguishes a geometric miss from a hit that
//! falls outside the clear aperture, because the tracer treats the two
//! differently in diagnostics and in the sphere-overlap retry.

use crate::core::geometry::{Point3f, Ray, Vector3f};
use crate::core::pbrt::{Float, Quadratic};
use crate::prescription::{AsphericTerms, Surface, SurfaceKind};

/// Minimum ray parameter accepted as a forward hit. Rays restart exactly on
/// the previous surface, so zero-distance self-hits must be rejected.
const T_EPSILON: Float = 1.0e-6;

/// Newton-Raphson convergence tolerance for aspheric intersection (mm).
const ASPHERIC_TOLERANCE: Float = 1.0e-9;

/// Maximum Newton-Raphson iterations before declaring a miss.
const ASPHERIC_MAX_ITERATIONS: usize = 16;

/// Outcome of intersecting one surface.
#[derive(Copy, Clone, Debug)]
pub enum SurfaceHit {
    /// The ray hits the surface inside the clear aperture.
    Hit {
        /// Hit point in lens space.
        p: Point3f,

        /// Unit surface normal, flipped towards the incoming ray.
        n: Vector3f,
    },

    /// The ray misses the surface geometry entirely.
    Miss,

    /// The ray hits the surface but outside the clear aperture.
    Clipped,
}

impl SurfaceHit {
    /// Returns true for the `Hit` variant.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Intersects a ray with one surface, dispatching on the declared kind.
///
/// * `surface`  - The surface.
/// * `vertex_z` - The surface's vertex position on the optical axis.
/// * `ray`      - The ray, in lens space.
pub fn intersect_surface(surface: &Surface, vertex_z: Float, ray: &Ray) -> SurfaceHit {
    match surface.kind {
        SurfaceKind::Flat | SurfaceKind::Stop => {
            intersect_plane(vertex_z, surface.aperture_radius, ray)
        }
        SurfaceKind::Spherical => {
            intersect_sphere(surface.radius, vertex_z, surface.aperture_radius, ray)
        }
        SurfaceKind::Aspheric(terms) => intersect_aspheric(
            surface.radius,
            &terms,
            vertex_z,
            surface.aperture_radius,
            ray,
        ),
        SurfaceKind::CylindricalX => {
            intersect_cylinder(surface.radius, vertex_z, surface.aperture_radius, ray, true)
        }
        SurfaceKind::CylindricalY => {
            intersect_cylinder(surface.radius, vertex_z, surface.aperture_radius, ray, false)
        }
    }
}

/// Plane at the surface vertex; the normal is the optical axis.
fn intersect_plane(vertex_z: Float, aperture_radius: Float, ray: &Ray) -> SurfaceHit {
    if ray.d.z == 0.0 {
        return SurfaceHit::Miss;
    }
    let t = (vertex_z - ray.o.z) / ray.d.z;
    if t < T_EPSILON {
        return SurfaceHit::Miss;
    }
    let p = ray.at(t);
    if p.radius_squared() > aperture_radius * aperture_radius {
        return SurfaceHit::Clipped;
    }
    let n = Vector3f::new(0.0, 0.0, 1.0).face_forward(&-ray.d);
    SurfaceHit::Hit { p, n }
}

/// Sphere centered on the optical axis at `vertex_z + radius`. Of the two
/// quadratic roots the physically correct lens-surface branch is the one
/// whose hit point lies nearest the vertex plane in z, not the nearer root
/// along the ray; the other root is the far hemisphere of the sphere.
pub fn intersect_sphere(
    radius: Float,
    vertex_z: Float,
    aperture_radius: Float,
    ray: &Ray,
) -> SurfaceHit {
    let center = Point3f::new(0.0, 0.0, vertex_z + radius);
    let o = ray.o - center;
    let a = ray.d.length_squared();
    let b = 2.0 * o.dot(&ray.d);
    let c = o.length_squared() - radius * radius;

    let (t0, t1) = match Quadratic::solve(a, b, c) {
        Some(roots) => roots,
        None => return SurfaceHit::Miss,
    };

    let t = match nearest_vertex_root(ray, vertex_z, t0, t1) {
        Some(t) => t,
        None => return SurfaceHit::Miss,
    };

    let p = ray.at(t);
    if p.radius_squared() > aperture_radius * aperture_radius {
        return SurfaceHit::Clipped;
    }
    let n = (p - center).normalize().face_forward(&-ray.d);
    SurfaceHit::Hit { p, n }
}

/// Picks the forward root whose hit point lies nearest the vertex plane.
fn nearest_vertex_root(ray: &Ray, vertex_z: Float, t0: Float, t1: Float) -> Option<Float> {
    let mut best: Option<(Float, Float)> = None;
    for t in [t0, t1] {
        if t < T_EPSILON {
            continue;
        }
        let dz = (ray.o.z + t * ray.d.z - vertex_z).abs();
        if best.map_or(true, |(_, best_dz)| dz < best_dz) {
            best = Some((t, dz));
        }
    }
    best.map(|(t, _)| t)
}

/// Even-asphere sag at squared transverse radius `r2`.
fn aspheric_sag(radius: Float, terms: &AsphericTerms, r2: Float) -> Option<Float> {
    let arg = 1.0 - (1.0 + terms.conic) * r2 / (radius * radius);
    if arg < 0.0 {
        return None;
    }
    let base = r2 / (radius * (1.0 + arg.sqrt()));
    let r4 = r2 * r2;
    let r6 = r4 * r2;
    let r8 = r6 * r2;
    let r10 = r8 * r2;
    Some(base + terms.a4 * r4 + terms.a6 * r6 + terms.a8 * r8 + terms.a10 * r10)
}

/// Radial derivative d(sag)/dr of the even-asphere profile.
fn aspheric_sag_derivative(radius: Float, terms: &AsphericTerms, r: Float) -> Option<Float> {
    let r2 = r * r;
    let arg = 1.0 - (1.0 + terms.conic) * r2 / (radius * radius);
    if arg <= 0.0 {
        return None;
    }
    let base = r / (radius * arg.sqrt());
    let r3 = r2 * r;
    let r5 = r3 * r2;
    let r7 = r5 * r2;
    let r9 = r7 * r2;
    Some(base + 4.0 * terms.a4 * r3 + 6.0 * terms.a6 * r5 + 8.0 * terms.a8 * r7 + 10.0 * terms.a10 * r9)
}

/// Iterative intersection with an even asphere. There is no closed form
/// because of the polynomial departure, so the implicit equation
/// `z_ray(t) = vertex_z + sag(r(t))` is solved by Newton-Raphson seeded from
/// the base-sphere hit (or the vertex plane when the base sphere misses).
fn intersect_aspheric(
    radius: Float,
    terms: &AsphericTerms,
    vertex_z: Float,
    aperture_radius: Float,
    ray: &Ray,
) -> SurfaceHit {
    let mut t = match intersect_sphere(radius, vertex_z, INFINITE_APERTURE, ray) {
        SurfaceHit::Hit { p, .. } => (p - ray.o).length() / ray.d.length(),
        _ => {
            if ray.d.z == 0.0 {
                return SurfaceHit::Miss;
            }
            (vertex_z - ray.o.z) / ray.d.z
        }
    };
    if t < T_EPSILON {
        return SurfaceHit::Miss;
    }

    let mut converged = false;
    for _ in 0..ASPHERIC_MAX_ITERATIONS {
        let p = ray.at(t);
        let r2 = p.radius_squared();
        let sag = match aspheric_sag(radius, terms, r2) {
            Some(sag) => sag,
            None => return SurfaceHit::Miss,
        };
        let f = p.z - vertex_z - sag;
        if f.abs() < ASPHERIC_TOLERANCE {
            converged = true;
            break;
        }

        let r = r2.sqrt();
        let dsag_dr = if r > 0.0 {
            match aspheric_sag_derivative(radius, terms, r) {
                Some(d) => d,
                None => return SurfaceHit::Miss,
            }
        } else {
            0.0
        };
        let dr_dt = if r > 0.0 {
            (p.x * ray.d.x + p.y * ray.d.y) / r
        } else {
            0.0
        };
        let df_dt = ray.d.z - dsag_dr * dr_dt;
        if df_dt.abs() < 1.0e-15 {
            return SurfaceHit::Miss;
        }
        t -= f / df_dt;
        if t < T_EPSILON {
            return SurfaceHit::Miss;
        }
    }
    if !converged {
        return SurfaceHit::Miss;
    }

    let p = ray.at(t);
    if p.radius_squared() > aperture_radius * aperture_radius {
        return SurfaceHit::Clipped;
    }

    // Normal from the surface gradient of z - sag(r).
    let r = p.radius_squared().sqrt();
    let n = if r > 0.0 {
        let dsag_dr = match aspheric_sag_derivative(radius, terms, r) {
            Some(d) => d,
            None => return SurfaceHit::Miss,
        };
        Vector3f::new(-dsag_dr * p.x / r, -dsag_dr * p.y / r, 1.0).normalize()
    } else {
        Vector3f::new(0.0, 0.0, 1.0)
    };
    SurfaceHit::Hit {
        p,
        n: n.face_forward(&-ray.d),
    }
}

/// Aperture sentinel used when seeding the aspheric iteration: the base
/// sphere hit may legitimately sit outside the clear aperture and still be
/// a fine starting point.
const INFINITE_APERTURE: Float = Float::MAX;

/// Cylinder curved along one transverse axis: the intersection reduces to a
/// 2-D circle in the curved plane and the normal has no component along the
/// flat axis.
fn intersect_cylinder(
    radius: Float,
    vertex_z: Float,
    aperture_radius: Float,
    ray: &Ray,
    curved_in_x: bool,
) -> SurfaceHit {
    let center_z = vertex_z + radius;
    let (ot, dt) = if curved_in_x {
        (ray.o.x, ray.d.x)
    } else {
        (ray.o.y, ray.d.y)
    };
    let oz = ray.o.z - center_z;

    let a = dt * dt + ray.d.z * ray.d.z;
    let b = 2.0 * (ot * dt + oz * ray.d.z);
    let c = ot * ot + oz * oz - radius * radius;

    let (t0, t1) = match Quadratic::solve(a, b, c) {
        Some(roots) => roots,
        None => return SurfaceHit::Miss,
    };
    let t = match nearest_vertex_root(ray, vertex_z, t0, t1) {
        Some(t) => t,
        None => return SurfaceHit::Miss,
    };

    let p = ray.at(t);
    if p.radius_squared() > aperture_radius * aperture_radius {
        return SurfaceHit::Clipped;
    }

    let n = if curved_in_x {
        Vector3f::new(p.x, 0.0, p.z - center_z)
    } else {
        Vector3f::new(0.0, p.y, p.z - center_z)
    };
    SurfaceHit::Hit {
        p,
        n: n.normalize().face_forward(&-ray.d),
    }
}
