//! Focus interpolation over the prescription's variable air gaps.
//!
//! A lens focuses either by unit focusing (the whole lens group moves, which
//! downstream shows up purely as a sensor-distance change) or by adjusting
//! one or more internal air gaps between a calibrated close-focus state and
//! the infinity state. Gap interpolation is linear in reciprocal object
//! distance, which is the space in which thin-lens conjugates move linearly.

use crate::core::pbrt::{clamp, lerp, Float};
use crate::prescription::{LensPrescription, MAX_SURFACES};

/// Object distances at or beyond this are treated as the infinity focus
/// sentinel (1 km in millimetres).
pub const INFINITY_FOCUS: Float = 1.0e9;

/// Computes the per-surface axial gaps for a target object distance.
///
/// With no calibration distance every gap passes through unchanged (unit
/// focusing; the paraxial solver moves the sensor plane instead). Otherwise
/// each focus-variable gap is interpolated with
/// `alpha = clamp(calibration / d_obj, 0, 1)`; at or inside the calibration
/// distance the close-focus gap is used as-is, with no extrapolation.
///
/// The air-gap invariant for focus-variable surfaces is enforced when the
/// prescription is built, so this never fails.
///
/// * `rx`    - The prescription.
/// * `d_obj` - Object distance from the front vertex (mm, > 0; may be the
///             infinity sentinel).
pub fn adjusted_thicknesses(rx: &LensPrescription, d_obj: Float) -> [Float; MAX_SURFACES] {
    let mut thicknesses = [0.0; MAX_SURFACES];

    let calibration = rx.focus_calibration_distance;
    let unit_focusing = calibration <= 0.0;
    let alpha = if unit_focusing || !d_obj.is_finite() || d_obj >= INFINITY_FOCUS {
        0.0
    } else {
        clamp(calibration / d_obj, 0.0, 1.0)
    };

    for (i, s) in rx.surfaces().iter().enumerate() {
        thicknesses[i] = if !unit_focusing && s.is_focus_variable() {
            lerp(alpha, s.thickness_infinity, s.thickness_close)
        } else {
            s.thickness_infinity
        };
    }
    thicknesses
}

/// Total axial length of the lens for a given gap state: the distance from
/// the front vertex to the rear vertex. The last surface's gap faces the
/// sensor and does not contribute.
///
/// * `rx`          - The prescription.
/// * `thicknesses` - Adjusted gap array.
pub fn total_length(rx: &LensPrescription, thicknesses: &[Float; MAX_SURFACES]) -> Float {
    thicknesses[..rx.len().saturating_sub(1)].iter().sum()
}

/// Vertex z position of every surface in lens space (rear vertex at z = 0,
/// front vertex at -total_length).
///
/// * `rx`          - The prescription.
/// * `thicknesses` - Adjusted gap array.
pub fn vertex_positions(
    rx: &LensPrescription,
    thicknesses: &[Float; MAX_SURFACES],
) -> [Float; MAX_SURFACES] {
    let n = rx.len();
    let mut z = [0.0; MAX_SURFACES];
    let mut acc = 0.0;
    for i in (0..n.saturating_sub(1)).rev() {
        acc -= thicknesses[i];
        z[i] = acc;
    }
    if n > 0 {
        z[n - 1] = 0.0;
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prescription::Surface;
    use proptest::prelude::*;

    fn focusing_lens() -> LensPrescription {
        let surfaces = vec![
            Surface::spherical(30.0, 5.0, 1.517, 64.2, 12.0),
            Surface::spherical(-30.0, 4.0, 1.0, 0.0, 12.0).with_close_thickness(6.0),
            Surface::stop(3.0, 8.0),
        ];
        LensPrescription::new(&surfaces, 29.0, 2.8)
            .unwrap()
            .with_focus_calibration(1000.0)
    }

    #[test]
    fn infinity_uses_infinity_thickness() {
        let rx = focusing_lens();
        let t = adjusted_thicknesses(&rx, INFINITY_FOCUS);
        assert_eq!(t[1], 4.0);
        let t = adjusted_thicknesses(&rx, Float::INFINITY);
        assert_eq!(t[1], 4.0);
    }

    #[test]
    fn calibration_distance_is_exact_close_thickness() {
        let rx = focusing_lens();
        let t = adjusted_thicknesses(&rx, 1000.0);
        assert_eq!(t[1], 6.0);
    }

    #[test]
    fn closer_than_calibration_does_not_extrapolate() {
        let rx = focusing_lens();
        let t = adjusted_thicknesses(&rx, 200.0);
        assert_eq!(t[1], 6.0);
    }

    #[test]
    fn fixed_gaps_pass_through() {
        let rx = focusing_lens();
        let t = adjusted_thicknesses(&rx, 1500.0);
        assert_eq!(t[0], 5.0);
        assert_eq!(t[2], 3.0);
    }

    #[test]
    fn unit_focusing_ignores_close_thickness() {
        let surfaces = vec![
            Surface::spherical(30.0, 5.0, 1.517, 64.2, 12.0),
            Surface::spherical(-30.0, 4.0, 1.0, 0.0, 12.0).with_close_thickness(6.0),
            Surface::stop(3.0, 8.0),
        ];
        let rx = LensPrescription::new(&surfaces, 29.0, 2.8).unwrap();
        let t = adjusted_thicknesses(&rx, 500.0);
        assert_eq!(t[1], 4.0);
    }

    #[test]
    fn vertex_positions_accumulate_rearwards() {
        let rx = focusing_lens();
        let t = adjusted_thicknesses(&rx, INFINITY_FOCUS);
        let z = vertex_positions(&rx, &t);
        assert_eq!(z[2], 0.0);
        // A surface's thickness is the gap to the *next* surface, so the
        // rear-to-front accumulation subtracts t[1] first, then t[0].
        assert_eq!(z[1], -4.0);
        assert_eq!(z[0], -9.0);
        assert_eq!(total_length(&rx, &t), 9.0);
    }

    proptest! {
        #[test]
        fn interpolation_stays_between_endpoints(d_obj in 1.0f64..1.0e7) {
            let rx = focusing_lens();
            let t = adjusted_thicknesses(&rx, d_obj);
            prop_assert!(t[1] >= 4.0 && t[1] <= 6.0);
        }

        #[test]
        fn monotone_in_reciprocal_distance(d0 in 1000.0f64..1.0e7, d1 in 1000.0f64..1.0e7) {
            let rx = focusing_lens();
            let (near, far) = if d0 < d1 { (d0, d1) } else { (d1, d0) };
            let tn = adjusted_thicknesses(&rx, near);
            let tf = adjusted_thicknesses(&rx, far);
            // The close-focus gap is the larger one in this design.
            prop_assert!(tn[1] >= tf[1] - 1e-12);
        }
    }
}
