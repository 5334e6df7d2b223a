//! Paraxial ray-transfer (ABCD) solver.
//!
//! A 2x2 matrix per axis relates ray height and slope across the lens.
//! X and Y are solved independently so cylindrical (anamorphic) elements,
//! which carry power on only one axis, produce per-axis sensor conjugates
//! and exit pupils. The Y axis is the spherical meridian and is used as the
//! focus reference, matching cinematographic convention for anamorphics.
//!
//! Conventions: light propagates towards +z (scene to sensor), heights and
//! slopes are true (not reduced) values, so a refraction at an interface
//! from index n1 to n2 with radius R is `[[1, 0], [-(n2-n1)/(R*n2), n1/n2]]`
//! and a translation over a gap t is `[[1, t], [0, 1]]`.

use crate::core::geometry::Point2f;
use crate::core::pbrt::Float;
use crate::error::{LensError, Result};
use crate::focus::INFINITY_FOCUS;
use crate::prescription::{LensPrescription, SurfaceKind, MAX_SURFACES};
use float_cmp::approx_eq;

/// Denominators smaller than this are treated as a degenerate solve.
const DEGENERATE_EPSILON: Float = 1.0e-9;

/// The transverse axis a paraxial trace runs on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal axis (curved by `CylindricalX` surfaces).
    X,

    /// Vertical axis (curved by `CylindricalY` surfaces); the focus
    /// reference meridian.
    Y,
}

/// A 2x2 ray-transfer matrix.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mat2 {
    pub a: Float,
    pub b: Float,
    pub c: Float,
    pub d: Float,
}

impl Mat2 {
    /// The identity transfer.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
        }
    }

    /// Translation over an axial gap.
    ///
    /// * `t` - The gap (mm).
    pub fn translation(t: Float) -> Self {
        Self {
            a: 1.0,
            b: t,
            c: 0.0,
            d: 1.0,
        }
    }

    /// Refraction at a single interface.
    ///
    /// * `n1`        - Index on the incident side.
    /// * `n2`        - Index on the transmitted side.
    /// * `curvature` - 1/R of the interface on this axis (0 when flat).
    pub fn refraction(n1: Float, n2: Float, curvature: Float) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: -(n2 - n1) * curvature / n2,
            d: n1 / n2,
        }
    }

    /// Matrix determinant.
    pub fn det(&self) -> Float {
        self.a * self.d - self.b * self.c
    }

    /// Composes `self` after `rhs`: the returned transfer applies `rhs`
    /// first.
    ///
    /// * `rhs` - The earlier transfer.
    pub fn compose(&self, rhs: &Self) -> Self {
        Self {
            a: self.a * rhs.a + self.b * rhs.c,
            b: self.a * rhs.b + self.b * rhs.d,
            c: self.c * rhs.a + self.d * rhs.c,
            d: self.c * rhs.b + self.d * rhs.d,
        }
    }
}

/// Curvature 1/R of a surface as seen on one axis. Flat surfaces, the stop
/// and the uncurved axis of a cylinder contribute no power.
fn axis_curvature(kind: &SurfaceKind, radius: Float, axis: Axis) -> Float {
    let curved = match axis {
        Axis::X => kind.curves_x(),
        Axis::Y => kind.curves_y(),
    };
    if curved {
        1.0 / radius
    } else {
        0.0
    }
}

/// Composes the transfer matrix across an inclusive surface range, front to
/// back: refraction at `first`, then alternating gaps and refractions up to
/// and including `last`. The input plane is the vertex of `first`, the
/// output plane the vertex of `last`.
///
/// * `rx`          - The prescription.
/// * `thicknesses` - Adjusted gap array.
/// * `axis`        - Trace axis.
/// * `first`       - First surface index.
/// * `last`        - Last surface index (inclusive).
pub fn system_matrix(
    rx: &LensPrescription,
    thicknesses: &[Float; MAX_SURFACES],
    axis: Axis,
    first: usize,
    last: usize,
) -> Mat2 {
    let mut m = Mat2::identity();
    for i in first..=last {
        let s = &rx.surfaces()[i];
        let n1 = rx.ior_before(i);
        let n2 = s.ior_after;
        let refraction = Mat2::refraction(n1, n2, axis_curvature(&s.kind, s.radius, axis));
        m = refraction.compose(&m);
        if i < last {
            m = Mat2::translation(thicknesses[i]).compose(&m);
        }
    }
    m
}

/// Solves the sensor-plane distance behind the rear vertex for an object at
/// `d_obj` in front of the front vertex, on the Y (focus reference) axis.
///
/// * `rx`          - The prescription.
/// * `thicknesses` - Adjusted gap array.
/// * `d_obj`       - Object distance (mm; the infinity sentinel focuses at
///                   the back focal plane).
pub fn sensor_distance(
    rx: &LensPrescription,
    thicknesses: &[Float; MAX_SURFACES],
    d_obj: Float,
) -> Result<Float> {
    let m = system_matrix(rx, thicknesses, Axis::Y, 0, rx.len() - 1);

    let at_infinity = !d_obj.is_finite() || d_obj >= INFINITY_FOCUS;
    let (numer, denom) = if at_infinity {
        (-m.a, m.c)
    } else {
        (-(m.a * d_obj + m.b), m.c * d_obj + m.d)
    };

    if approx_eq!(Float, denom, 0.0, epsilon = DEGENERATE_EPSILON) {
        return Err(LensError::optical(
            "afocal system: no finite sensor conjugate",
        ));
    }

    let d_img = numer / denom;
    if !d_img.is_finite() || d_img <= 0.0 {
        return Err(LensError::optical(format!(
            "no real focus solution for object distance {} mm",
            d_obj
        )));
    }
    Ok(d_img)
}

/// Exit pupil of one axis: the paraxial image of the aperture stop through
/// the rear subsystem, as seen from the sensor side.
#[derive(Copy, Clone, Debug)]
pub struct AxisPupil {
    /// Pupil plane position in lens space (z; usually negative, i.e. on the
    /// scene side of the rear vertex).
    pub z: Float,

    /// Pupil semi-diameter on this axis (mm).
    pub radius: Float,

    /// Transverse magnification of the stop image.
    pub magnification: Float,
}

/// Per-axis exit pupils. Spherical lenses have identical X and Y pupils;
/// anamorphic designs do not, which is what makes their bokeh elliptical.
#[derive(Copy, Clone, Debug)]
pub struct ExitPupil {
    pub x: AxisPupil,
    pub y: AxisPupil,
}

/// Computes the on-axis exit pupil per axis.
///
/// * `rx`             - The prescription.
/// * `thicknesses`    - Adjusted gap array.
/// * `aperture_scale` - Stop scaling for the working f-stop, in (0, 1].
pub fn exit_pupil(
    rx: &LensPrescription,
    thicknesses: &[Float; MAX_SURFACES],
    aperture_scale: Float,
) -> Result<ExitPupil> {
    Ok(ExitPupil {
        x: axis_exit_pupil(rx, thicknesses, Axis::X, aperture_scale)?,
        y: axis_exit_pupil(rx, thicknesses, Axis::Y, aperture_scale)?,
    })
}

fn axis_exit_pupil(
    rx: &LensPrescription,
    thicknesses: &[Float; MAX_SURFACES],
    axis: Axis,
    aperture_scale: Float,
) -> Result<AxisPupil> {
    let stop = rx.stop_index();
    let last = rx.len() - 1;
    let stop_radius = rx.surfaces()[stop].aperture_radius * aperture_scale;

    // Stop at the rear vertex: the pupil is the stop itself.
    if stop == last {
        return Ok(AxisPupil {
            z: 0.0,
            radius: stop_radius,
            magnification: 1.0,
        });
    }

    // Rear subsystem: gap behind the stop, then surfaces stop+1..=last.
    let mut m = Mat2::translation(thicknesses[stop]);
    m = system_matrix(rx, thicknesses, axis, stop + 1, last).compose(&m);

    if approx_eq!(Float, m.d, 0.0, epsilon = DEGENERATE_EPSILON)
        || approx_eq!(Float, m.det(), 0.0, epsilon = DEGENERATE_EPSILON)
    {
        return Err(LensError::optical(
            "degenerate rear subsystem: stop has no paraxial image",
        ));
    }

    // Image of an object in the stop plane: distance past the rear vertex
    // where the B element of the composed transfer vanishes.
    let z = -m.b / m.d;
    let magnification = m.a + m.c * z;
    Ok(AxisPupil {
        z,
        radius: (magnification * stop_radius).abs(),
        magnification,
    })
}

/// Field-dependent exit pupil for one sensor point: the on-axis pupil
/// tightened by the projected clear apertures of the rear elements.
#[derive(Copy, Clone, Debug)]
pub struct FieldPupil {
    /// Pupil plane z per axis (from the on-axis solve).
    pub z_x: Float,
    pub z_y: Float,

    /// Pupil center per axis, in the respective pupil plane.
    pub center: Point2f,

    /// Pupil semi-diameter per axis; zero means the field point is fully
    /// vignetted.
    pub radius_x: Float,
    pub radius_y: Float,
}

/// Tightens the on-axis pupil for an off-axis sensor point.
///
/// Each rear element's clear aperture is centrally projected from the sensor
/// point onto the pupil plane and the per-axis intervals are intersected.
/// This is an interval approximation of the true silhouette intersection:
/// it never widens the pupil beyond the on-axis disk, at the cost of
/// slightly over-tightening diagonal field points.
///
/// * `rx`          - The prescription.
/// * `vertex_z`    - Surface vertex positions.
/// * `pupil`       - On-axis exit pupil.
/// * `p_sensor`    - Sensor point (transverse, mm).
/// * `sensor_z`    - Sensor plane z (mm, positive).
pub fn field_exit_pupil(
    rx: &LensPrescription,
    vertex_z: &[Float; MAX_SURFACES],
    pupil: &ExitPupil,
    p_sensor: Point2f,
    sensor_z: Float,
) -> FieldPupil {
    let (cx, rx_radius) = axis_field_interval(rx, vertex_z, pupil.x, p_sensor.x, sensor_z);
    let (cy, ry_radius) = axis_field_interval(rx, vertex_z, pupil.y, p_sensor.y, sensor_z);

    FieldPupil {
        z_x: pupil.x.z,
        z_y: pupil.y.z,
        center: Point2f::new(cx, cy),
        radius_x: rx_radius,
        radius_y: ry_radius,
    }
}

fn axis_field_interval(
    rx: &LensPrescription,
    vertex_z: &[Float; MAX_SURFACES],
    pupil: AxisPupil,
    s: Float,
    sensor_z: Float,
) -> (Float, Float) {
    let mut lo = -pupil.radius;
    let mut hi = pupil.radius;

    for i in rx.stop_index() + 1..rx.len() {
        let surface = &rx.surfaces()[i];
        let z_i = vertex_z[i];
        // Central projection of the element aperture from the sensor point
        // onto the pupil plane.
        let scale = (pupil.z - sensor_z) / (z_i - sensor_z);
        let center = s * (1.0 - scale);
        let radius = surface.aperture_radius * scale.abs();

        lo = lo.max(center - radius);
        hi = hi.min(center + radius);
        if lo >= hi {
            return ((lo + hi) * 0.5, 0.0);
        }
    }

    ((lo + hi) * 0.5, (hi - lo) * 0.5)
}
