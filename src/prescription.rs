//! Lens prescription model.
//!
//! A prescription is an immutable, fixed-capacity description of a compound
//! lens: one record per element interface, ordered front (scene side) to
//! back (sensor side). It is built once at load time, validated there, and
//! treated as correct for the lifetime of a render.

use crate::core::pbrt::Float;
use crate::error::{LensError, Result};

/// Maximum number of surfaces a prescription may carry. Per-surface working
/// arrays are sized by this bound so the per-sample hot path never
/// allocates.
pub const MAX_SURFACES: usize = 24;

/// Conic constant and even-polynomial departure coefficients of an aspheric
/// surface.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AsphericTerms {
    /// Conic constant k (0 = sphere, -1 = paraboloid).
    pub conic: Float,

    /// Coefficient of r^4.
    pub a4: Float,

    /// Coefficient of r^6.
    pub a6: Float,

    /// Coefficient of r^8.
    pub a8: Float,

    /// Coefficient of r^10.
    pub a10: Float,
}

/// The geometric family of a surface. Dispatch happens only on the declared
/// kind, never inferred from the radius.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum SurfaceKind {
    /// Rotationally symmetric spherical cap.
    Spherical,

    /// Plane interface (e.g. the flat side of a plano-convex element).
    #[default]
    Flat,

    /// The aperture stop. Exactly one per prescription; the shaped clip is
    /// applied here by the tracer.
    Stop,

    /// Even asphere: base sphere sag plus polynomial departure.
    Aspheric(AsphericTerms),

    /// Cylinder curved in the X-Z plane, flat along Y.
    CylindricalX,

    /// Cylinder curved in the Y-Z plane, flat along X.
    CylindricalY,
}

impl SurfaceKind {
    /// Returns true for kinds that require a nonzero curvature radius.
    pub fn is_curved(&self) -> bool {
        !matches!(self, Self::Flat | Self::Stop)
    }

    /// Returns true if the surface has optical power along the X axis.
    pub fn curves_x(&self) -> bool {
        matches!(self, Self::Spherical | Self::Aspheric(_) | Self::CylindricalX)
    }

    /// Returns true if the surface has optical power along the Y axis.
    pub fn curves_y(&self) -> bool {
        matches!(self, Self::Spherical | Self::Aspheric(_) | Self::CylindricalY)
    }
}

/// A single lens element interface.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Surface {
    /// Geometric family of the surface.
    pub kind: SurfaceKind,

    /// Radius of curvature in millimetres, signed: positive when the center
    /// of curvature lies towards the sensor. Zero for Flat and Stop.
    pub radius: Float,

    /// Axial gap to the next surface at infinity focus, in millimetres.
    pub thickness_infinity: Float,

    /// Axial gap to the next surface at the calibration object distance, in
    /// millimetres. Equal to `thickness_infinity` unless this surface is a
    /// focus-variable air gap.
    pub thickness_close: Float,

    /// Index of refraction of the medium following this surface towards the
    /// sensor. 1.0 for the stop and for air gaps.
    pub ior_after: Float,

    /// Abbe number controlling dispersion of the following medium; zero or
    /// negative for non-dispersive media and air.
    pub abbe_v: Float,

    /// Clear semi-aperture in millimetres.
    pub aperture_radius: Float,
}

impl Surface {
    /// Creates a spherical interface.
    ///
    /// * `radius`          - Curvature radius (mm, signed).
    /// * `thickness`       - Axial gap to the next surface (mm).
    /// * `ior_after`       - Index of the following medium.
    /// * `abbe_v`          - Abbe number of the following medium.
    /// * `aperture_radius` - Clear semi-aperture (mm).
    pub fn spherical(
        radius: Float,
        thickness: Float,
        ior_after: Float,
        abbe_v: Float,
        aperture_radius: Float,
    ) -> Self {
        Self {
            kind: SurfaceKind::Spherical,
            radius,
            thickness_infinity: thickness,
            thickness_close: thickness,
            ior_after,
            abbe_v,
            aperture_radius,
        }
    }

    /// Creates a flat interface.
    ///
    /// * `thickness`       - Axial gap to the next surface (mm).
    /// * `ior_after`       - Index of the following medium.
    /// * `abbe_v`          - Abbe number of the following medium.
    /// * `aperture_radius` - Clear semi-aperture (mm).
    pub fn flat(thickness: Float, ior_after: Float, abbe_v: Float, aperture_radius: Float) -> Self {
        Self {
            kind: SurfaceKind::Flat,
            radius: 0.0,
            thickness_infinity: thickness,
            thickness_close: thickness,
            ior_after,
            abbe_v,
            aperture_radius,
        }
    }

    /// Creates the aperture stop.
    ///
    /// * `thickness`       - Axial gap to the next surface (mm).
    /// * `aperture_radius` - Mechanical semi-aperture at the widest f-stop (mm).
    pub fn stop(thickness: Float, aperture_radius: Float) -> Self {
        Self {
            kind: SurfaceKind::Stop,
            radius: 0.0,
            thickness_infinity: thickness,
            thickness_close: thickness,
            ior_after: 1.0,
            abbe_v: 0.0,
            aperture_radius,
        }
    }

    /// Creates an even-asphere interface.
    ///
    /// * `radius`          - Base curvature radius (mm, signed, nonzero).
    /// * `terms`           - Conic constant and polynomial coefficients.
    /// * `thickness`       - Axial gap to the next surface (mm).
    /// * `ior_after`       - Index of the following medium.
    /// * `abbe_v`          - Abbe number of the following medium.
    /// * `aperture_radius` - Clear semi-aperture (mm).
    pub fn aspheric(
        radius: Float,
        terms: AsphericTerms,
        thickness: Float,
        ior_after: Float,
        abbe_v: Float,
        aperture_radius: Float,
    ) -> Self {
        Self {
            kind: SurfaceKind::Aspheric(terms),
            radius,
            thickness_infinity: thickness,
            thickness_close: thickness,
            ior_after,
            abbe_v,
            aperture_radius,
        }
    }

    /// Creates a cylindrical interface curved in the X-Z plane.
    ///
    /// * `radius`          - Curvature radius (mm, signed, nonzero).
    /// * `thickness`       - Axial gap to the next surface (mm).
    /// * `ior_after`       - Index of the following medium.
    /// * `abbe_v`          - Abbe number of the following medium.
    /// * `aperture_radius` - Clear semi-aperture (mm).
    pub fn cylindrical_x(
        radius: Float,
        thickness: Float,
        ior_after: Float,
        abbe_v: Float,
        aperture_radius: Float,
    ) -> Self {
        Self {
            kind: SurfaceKind::CylindricalX,
            radius,
            thickness_infinity: thickness,
            thickness_close: thickness,
            ior_after,
            abbe_v,
            aperture_radius,
        }
    }

    /// Creates a cylindrical interface curved in the Y-Z plane.
    ///
    /// * `radius`          - Curvature radius (mm, signed, nonzero).
    /// * `thickness`       - Axial gap to the next surface (mm).
    /// * `ior_after`       - Index of the following medium.
    /// * `abbe_v`          - Abbe number of the following medium.
    /// * `aperture_radius` - Clear semi-aperture (mm).
    pub fn cylindrical_y(
        radius: Float,
        thickness: Float,
        ior_after: Float,
        abbe_v: Float,
        aperture_radius: Float,
    ) -> Self {
        Self {
            kind: SurfaceKind::CylindricalY,
            radius,
            thickness_infinity: thickness,
            thickness_close: thickness,
            ior_after,
            abbe_v,
            aperture_radius,
        }
    }

    /// Marks this surface as a focus-variable air gap by giving it a
    /// distinct thickness at the close-focus calibration distance.
    ///
    /// * `thickness_close` - Axial gap at the calibration distance (mm).
    pub fn with_close_thickness(mut self, thickness_close: Float) -> Self {
        self.thickness_close = thickness_close;
        self
    }

    /// Returns true if this surface's gap changes with focus distance.
    pub fn is_focus_variable(&self) -> bool {
        self.thickness_infinity != self.thickness_close
    }
}

/// An immutable compound-lens prescription.
#[derive(Clone, Debug)]
pub struct LensPrescription {
    /// Surface records, front to back; only the first `num_surfaces` entries
    /// are meaningful.
    surfaces: [Surface; MAX_SURFACES],

    /// Number of surfaces in use.
    num_surfaces: usize,

    /// Index of the aperture stop.
    stop_index: usize,

    /// Nominal focal length in millimetres.
    pub focal_length: Float,

    /// Widest (smallest-number) f-stop the lens supports.
    pub max_fstop: Float,

    /// Anamorphic desqueeze factor; 1.0 for spherical lenses.
    pub squeeze: Float,

    /// Object distance (mm, from the front vertex) at which the close-focus
    /// thicknesses were calibrated; zero or negative selects unit focusing
    /// where only the sensor plane moves.
    pub focus_calibration_distance: Float,
}

impl LensPrescription {
    /// Builds and validates a prescription. Violations of the data-model
    /// invariants are rejected here, once, so the tracer never re-checks
    /// them per ray.
    ///
    /// * `surfaces`     - Surface records ordered front to back.
    /// * `focal_length` - Nominal focal length (mm).
    /// * `max_fstop`    - Widest supported f-stop.
    pub fn new(surfaces: &[Surface], focal_length: Float, max_fstop: Float) -> Result<Self> {
        if surfaces.is_empty() {
            return Err(LensError::configuration("prescription has no surfaces"));
        }
        if surfaces.len() > MAX_SURFACES {
            return Err(LensError::configuration(format!(
                "{} surfaces exceeds MAX_SURFACES ({})",
                surfaces.len(),
                MAX_SURFACES
            )));
        }
        if focal_length <= 0.0 || max_fstop <= 0.0 {
            return Err(LensError::configuration(
                "focal length and max f-stop must be positive",
            ));
        }

        let mut stop_index = None;
        for (i, s) in surfaces.iter().enumerate() {
            match s.kind {
                SurfaceKind::Stop => {
                    if stop_index.is_some() {
                        return Err(LensError::configuration(format!(
                            "duplicate aperture stop at surface {}",
                            i
                        )));
                    }
                    if s.ior_after != 1.0 {
                        return Err(LensError::configuration(format!(
                            "surface {}: the stop must sit in air",
                            i
                        )));
                    }
                    stop_index = Some(i);
                }
                _ => {}
            }

            if s.kind.is_curved() && s.radius == 0.0 {
                return Err(LensError::configuration(format!(
                    "surface {}: {:?} surface requires a nonzero radius",
                    i, s.kind
                )));
            }
            if !s.kind.is_curved() && s.radius != 0.0 {
                return Err(LensError::configuration(format!(
                    "surface {}: {:?} surface must have zero radius",
                    i, s.kind
                )));
            }
            if s.aperture_radius <= 0.0 {
                return Err(LensError::configuration(format!(
                    "surface {}: aperture radius must be positive",
                    i
                )));
            }
            if s.ior_after < 1.0 {
                return Err(LensError::configuration(format!(
                    "surface {}: index of refraction below 1",
                    i
                )));
            }
            if s.is_focus_variable() && s.ior_after != 1.0 {
                return Err(LensError::configuration(format!(
                    "surface {}: focus-variable gap must be an air gap",
                    i
                )));
            }
        }

        let stop_index = stop_index
            .ok_or_else(|| LensError::configuration("prescription has no aperture stop"))?;

        let mut storage = [Surface::default(); MAX_SURFACES];
        storage[..surfaces.len()].copy_from_slice(surfaces);

        Ok(Self {
            surfaces: storage,
            num_surfaces: surfaces.len(),
            stop_index,
            focal_length,
            max_fstop,
            squeeze: 1.0,
            focus_calibration_distance: 0.0,
        })
    }

    /// Sets the anamorphic desqueeze factor.
    ///
    /// * `squeeze` - Horizontal squeeze (e.g. 2.0 for a 2x anamorphic).
    pub fn with_squeeze(mut self, squeeze: Float) -> Result<Self> {
        if squeeze <= 0.0 {
            return Err(LensError::configuration("squeeze factor must be positive"));
        }
        self.squeeze = squeeze;
        Ok(self)
    }

    /// Sets the close-focus calibration distance, enabling focus-variable
    /// gap interpolation.
    ///
    /// * `distance` - Object distance from the front vertex (mm).
    pub fn with_focus_calibration(mut self, distance: Float) -> Self {
        self.focus_calibration_distance = distance;
        self
    }

    /// The surfaces in use, front to back.
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces[..self.num_surfaces]
    }

    /// Number of surfaces in use.
    pub fn len(&self) -> usize {
        self.num_surfaces
    }

    /// Always false; a valid prescription has at least one surface.
    pub fn is_empty(&self) -> bool {
        self.num_surfaces == 0
    }

    /// Index of the aperture stop.
    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    /// Index of refraction of the medium on the scene side of surface `i`.
    ///
    /// * `i` - Surface index.
    pub fn ior_before(&self, i: usize) -> Float {
        if i == 0 {
            1.0
        } else {
            self.surfaces[i - 1].ior_after
        }
    }

    /// Returns true if the refractive index changes across surface `i`.
    ///
    /// * `i` - Surface index.
    pub fn ior_changes_at(&self, i: usize) -> bool {
        self.ior_before(i) != self.surfaces[i].ior_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biconvex() -> Vec<Surface> {
        vec![
            Surface::spherical(30.0, 5.0, 1.517, 64.2, 12.0),
            Surface::spherical(-30.0, 2.0, 1.0, 0.0, 12.0),
            Surface::stop(3.0, 8.0),
        ]
    }

    #[test]
    fn builds_valid_prescription() {
        let rx = LensPrescription::new(&biconvex(), 29.0, 2.8).unwrap();
        assert_eq!(rx.len(), 3);
        assert_eq!(rx.stop_index(), 2);
        assert_eq!(rx.squeeze, 1.0);
    }

    #[test]
    fn rejects_missing_stop() {
        let surfaces = vec![
            Surface::spherical(30.0, 5.0, 1.517, 64.2, 12.0),
            Surface::spherical(-30.0, 2.0, 1.0, 0.0, 12.0),
        ];
        let err = LensPrescription::new(&surfaces, 29.0, 2.8).unwrap_err();
        assert!(matches!(err, LensError::Configuration { .. }));
    }

    #[test]
    fn rejects_duplicate_stop() {
        let mut surfaces = biconvex();
        surfaces.push(Surface::stop(1.0, 8.0));
        assert!(LensPrescription::new(&surfaces, 29.0, 2.8).is_err());
    }

    #[test]
    fn rejects_zero_radius_on_curved_kind() {
        let mut surfaces = biconvex();
        surfaces[0].radius = 0.0;
        assert!(LensPrescription::new(&surfaces, 29.0, 2.8).is_err());
    }

    #[test]
    fn rejects_radius_on_flat() {
        let mut surfaces = biconvex();
        surfaces.push(Surface::flat(1.0, 1.0, 0.0, 10.0));
        surfaces.last_mut().unwrap().radius = 5.0;
        assert!(LensPrescription::new(&surfaces, 29.0, 2.8).is_err());
    }

    #[test]
    fn rejects_glass_focus_gap() {
        let mut surfaces = biconvex();
        // A focus-variable gap inside glass is not buildable hardware.
        surfaces[0] = surfaces[0].with_close_thickness(5.5);
        let err = LensPrescription::new(&surfaces, 29.0, 2.8).unwrap_err();
        assert!(matches!(err, LensError::Configuration { .. }));
    }

    #[test]
    fn accepts_air_focus_gap() {
        let mut surfaces = biconvex();
        surfaces[1] = surfaces[1].with_close_thickness(2.6);
        let rx = LensPrescription::new(&surfaces, 29.0, 2.8)
            .unwrap()
            .with_focus_calibration(1000.0);
        assert!(rx.surfaces()[1].is_focus_variable());
        assert_eq!(rx.focus_calibration_distance, 1000.0);
    }

    #[test]
    fn rejects_over_capacity() {
        let mut surfaces = vec![Surface::stop(1.0, 8.0)];
        for _ in 0..MAX_SURFACES {
            surfaces.push(Surface::flat(1.0, 1.0, 0.0, 10.0));
        }
        assert!(LensPrescription::new(&surfaces, 29.0, 2.8).is_err());
    }

    #[test]
    fn ior_changes_tracks_interfaces() {
        let rx = LensPrescription::new(&biconvex(), 29.0, 2.8).unwrap();
        assert!(rx.ior_changes_at(0)); // air -> glass
        assert!(rx.ior_changes_at(1)); // glass -> air
        assert!(!rx.ior_changes_at(2)); // air -> air at the stop
    }
}
