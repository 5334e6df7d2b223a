//! Sampling functions for the exit-pupil disk and shaped apertures.

use super::geometry::Point2f;
use super::pbrt::{fract, Float, PI, TWO_PI};

/// Fractional part of the golden ratio. Adding it modulo 1 to a uniform
/// sample yields a decorrelated uniform sample.
pub const GOLDEN_RATIO_FRAC: Float = 0.618_033_988_749_894_8;

/// Sample a point on the unit disk with the polar mapping `r = √u1`,
/// `θ = 2π·u2`. The radial random number stays identifiable so callers can
/// decorrelate other per-sample quantities against it.
///
/// * `u` - The random sample point in [0,1)².
pub fn polar_sample_disk(u: &Point2f) -> Point2f {
    let r = u.x.sqrt();
    let theta = TWO_PI * u.y;
    Point2f::new(r * theta.cos(), r * theta.sin())
}

/// Returns true when `p` lies inside a regular `n`-sided polygon inscribed
/// in a circle of `radius`, rotated by `rotation` radians. Containment is
/// tested against the nearest edge's half-plane.
///
/// * `p`        - The point.
/// * `n`        - Number of polygon sides (>= 3).
/// * `radius`   - Circumradius of the polygon.
/// * `rotation` - Rotation of the polygon in radians.
pub fn inside_regular_polygon(p: &Point2f, n: u32, radius: Float, rotation: Float) -> bool {
    if radius <= 0.0 {
        return false;
    }
    let r = p.length();
    if r == 0.0 {
        return true;
    }

    // Fold the point's angle into one edge sector; the edge midpoint lies at
    // the apothem distance radius*cos(π/n).
    let sector = TWO_PI / n as Float;
    let mut phi = (p.y.atan2(p.x) - rotation) % sector;
    if phi < 0.0 {
        phi += sector;
    }
    let apothem = radius * (PI / n as Float).cos();
    r * (phi - sector * 0.5).cos() <= apothem
}

/// Returns a uniform sample decorrelated from `u` by a golden-ratio shift.
///
/// * `u` - The source sample in [0,1).
pub fn golden_shift(u: Float) -> Float {
    fract(u + GOLDEN_RATIO_FRAC)
}
