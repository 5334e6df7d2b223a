//! End-to-end scenarios on complete lens designs.

use std::sync::Arc;

use proptest::prelude::*;

use lenstrace::core::geometry::Point2f;
use lenstrace::core::pbrt::Float;
use lenstrace::focus::INFINITY_FOCUS;
use lenstrace::ghost::ghost_pairs;
use lenstrace::{
    CameraSample, CameraSettings, LensCamera, LensPrescription, Surface, TraceOutcome,
};

/// A 50 mm double-Gauss prime: five groups around a central stop.
fn double_gauss() -> Arc<LensPrescription> {
    let surfaces = vec![
        Surface::spherical(29.475, 3.76, 1.67, 47.1, 12.6),
        Surface::spherical(84.83, 0.12, 1.0, 0.0, 12.6),
        Surface::spherical(19.275, 4.025, 1.67, 47.1, 11.5),
        Surface::spherical(40.77, 3.275, 1.699, 30.1, 11.5),
        Surface::spherical(12.75, 5.705, 1.0, 0.0, 9.0),
        Surface::stop(4.5, 8.55),
        Surface::spherical(-14.495, 1.18, 1.603, 38.0, 8.5),
        Surface::spherical(40.77, 6.065, 1.658, 57.3, 10.0),
        Surface::spherical(-20.385, 0.105, 1.0, 0.0, 10.0),
        Surface::spherical(437.065, 3.22, 1.717, 29.5, 10.0),
        Surface::spherical(-39.73, 0.0, 1.0, 0.0, 10.0),
    ];
    Arc::new(LensPrescription::new(&surfaces, 50.0, 2.8).unwrap())
}

fn biconvex() -> Arc<LensPrescription> {
    Arc::new(
        LensPrescription::new(
            &[
                Surface::spherical(30.0, 2.0, 1.5, 0.0, 12.0),
                Surface::spherical(-30.0, 2.0, 1.0, 0.0, 12.0),
                Surface::stop(0.0, 8.0),
            ],
            30.0,
            2.8,
        )
        .unwrap(),
    )
}

/// 2x anamorphic: a spherical prime with a weak cylindrical-Y corrector in
/// front of the stop and a cylindrical-X Galilean pair (f = +40 / -20 mm)
/// behind it. The rear pair is afocal in X with angular magnification ~2,
/// so it halves the X pupil while leaving the Y pupil untouched.
fn anamorphic() -> Arc<LensPrescription> {
    let surfaces = vec![
        Surface::spherical(40.0, 2.0, 1.5, 0.0, 14.0),
        Surface::spherical(-40.0, 1.5, 1.0, 0.0, 14.0),
        Surface::cylindrical_y(200.0, 1.0, 1.5, 0.0, 14.0),
        Surface::flat(1.0, 1.0, 0.0, 14.0),
        Surface::stop(2.0, 8.0),
        Surface::cylindrical_x(20.0, 2.0, 1.5, 0.0, 14.0),
        Surface::flat(20.0, 1.0, 0.0, 14.0),
        Surface::cylindrical_x(-10.0, 0.5, 1.5, 0.0, 8.0),
        Surface::flat(0.0, 1.0, 0.0, 8.0),
    ];
    Arc::new(
        LensPrescription::new(&surfaces, 40.0, 2.8)
            .unwrap()
            .with_squeeze(2.0)
            .unwrap(),
    )
}

fn wide_open() -> CameraSettings {
    CameraSettings {
        fstop: 2.8,
        ..CameraSettings::default()
    }
}

#[test]
fn double_gauss_focuses_behind_the_rear_vertex() {
    let camera = LensCamera::new(double_gauss(), wide_open(), INFINITY_FOCUS).unwrap();
    let d = camera.sensor_distance();
    assert!(d > 30.0 && d < 45.0, "sensor distance {}", d);
}

#[test]
fn double_gauss_axial_infinity_ray_exits_on_axis() {
    let camera = LensCamera::new(double_gauss(), wide_open(), INFINITY_FOCUS).unwrap();
    let r = camera.generate_ray(&CameraSample {
        p_film: Point2f::new(0.5, 0.5),
        u_lens: Point2f::new(0.0, 0.0),
    });
    assert_eq!(r.outcome, TraceOutcome::Complete);
    assert_eq!(r.ray.d.x, 0.0);
    assert_eq!(r.ray.d.y, 0.0);
    assert!(r.ray.d.z < 0.0);
    assert!((r.weight - 1.0).abs() < 1e-9, "weight {}", r.weight);
}

#[test]
fn double_gauss_pupil_samples_cross_the_lens() {
    let camera = LensCamera::new(double_gauss(), wide_open(), INFINITY_FOCUS).unwrap();
    let mut completed = 0;
    for i in 0..8 {
        for j in 0..8 {
            let r = camera.generate_ray(&CameraSample {
                p_film: Point2f::new(0.55, 0.45),
                u_lens: Point2f::new(0.7 * (i as Float + 0.5) / 8.0, (j as Float + 0.5) / 8.0),
            });
            // Weight and outcome must always agree.
            assert_eq!(r.weight > 0.0, r.outcome == TraceOutcome::Complete);
            if r.outcome == TraceOutcome::Complete {
                completed += 1;
                assert!(r.ray.d.z < 0.0);
            }
        }
    }
    // The paraxial pupil slightly overestimates the true one near the rim,
    // but the bulk of the samples must get through.
    assert!(completed > 48, "only {} of 64 samples completed", completed);
}

#[test]
fn double_gauss_has_the_full_ghost_pair_set() {
    // Ten index-changing non-stop interfaces give C(10, 2) candidate pairs.
    assert_eq!(ghost_pairs(&double_gauss()).len(), 45);
}

#[test]
fn closer_focus_moves_the_sensor_out() {
    let rx = double_gauss();
    let far = LensCamera::new(rx.clone(), wide_open(), INFINITY_FOCUS).unwrap();
    let near = LensCamera::new(rx, wide_open(), 500.0).unwrap();
    assert!(near.sensor_distance() > far.sensor_distance());
}

#[test]
fn chromatic_double_gauss_traces_across_the_spectrum() {
    let settings = CameraSettings {
        chromatic: true,
        ..wide_open()
    };
    let camera = LensCamera::new(double_gauss(), settings, INFINITY_FOCUS).unwrap();
    let mut completed = 0;
    let mut lo = Float::INFINITY;
    let mut hi = 0.0f64;
    for i in 0..12 {
        // The first lens coordinate doubles as the wavelength sample and
        // the pupil radius, so the largest values aim near the pupil rim.
        let r = camera.generate_ray(&CameraSample {
            p_film: Point2f::new(0.5, 0.5),
            u_lens: Point2f::new(i as Float / 12.0, 0.4),
        });
        assert!(r.wavelength >= 400.0 && r.wavelength <= 700.0);
        lo = lo.min(r.wavelength);
        hi = hi.max(r.wavelength);
        if r.outcome == TraceOutcome::Complete {
            completed += 1;
            assert!(r.weight > 0.0);
        }
    }
    assert!(completed >= 9, "only {} of 12 wavelengths traced", completed);
    assert!(hi - lo > 200.0, "spectrum coverage {} .. {}", lo, hi);
}

#[test]
fn anamorphic_pupil_ratio_matches_the_squeeze() {
    // The rear cylindrical-X pair images the stop at roughly half size on
    // X only, so the Y/X pupil-radius ratio tracks the squeeze factor
    // (within the thick-element departure from the thin-lens design).
    let rx = anamorphic();
    let squeeze = rx.squeeze;
    let camera = LensCamera::new(rx, wide_open(), INFINITY_FOCUS).unwrap();
    let pupil = camera.exit_pupil();
    let ratio = pupil.y.radius / pupil.x.radius;
    assert!(
        (ratio / squeeze - 1.0).abs() < 0.05,
        "pupil ratio {} vs squeeze {}: x {} y {}",
        ratio,
        squeeze,
        pupil.x.radius,
        pupil.y.radius
    );
}

#[test]
fn anamorphic_center_ray_completes() {
    let camera = LensCamera::new(anamorphic(), wide_open(), INFINITY_FOCUS).unwrap();
    for u in [
        Point2f::new(0.0, 0.0),
        Point2f::new(0.5, 0.0),
        Point2f::new(0.5, 0.25),
    ] {
        let r = camera.generate_ray(&CameraSample {
            p_film: Point2f::new(0.5, 0.5),
            u_lens: u,
        });
        assert_eq!(r.outcome, TraceOutcome::Complete);
        assert!(r.weight > 0.0);
    }
}

#[test]
fn anamorphic_footprint_is_elliptical() {
    // The same disk radius sampled along x and along y aims at different
    // transverse offsets, so the exit directions tilt by different amounts.
    let camera = LensCamera::new(anamorphic(), wide_open(), INFINITY_FOCUS).unwrap();
    let along_x = camera.generate_ray(&CameraSample {
        p_film: Point2f::new(0.5, 0.5),
        u_lens: Point2f::new(0.5, 0.0),
    });
    let along_y = camera.generate_ray(&CameraSample {
        p_film: Point2f::new(0.5, 0.5),
        u_lens: Point2f::new(0.5, 0.25),
    });
    assert_eq!(along_x.outcome, TraceOutcome::Complete);
    assert_eq!(along_y.outcome, TraceOutcome::Complete);
    let tilt_x = (along_x.ray.d.x / along_x.ray.d.z).abs();
    let tilt_y = (along_y.ray.d.y / along_y.ray.d.z).abs();
    assert!(
        (tilt_x - tilt_y).abs() > 1e-4,
        "tilt x {} vs tilt y {}",
        tilt_x,
        tilt_y
    );
}

#[test]
fn ghost_gate_preserves_the_direct_estimate() {
    // Stratified means over the lens-sample square with and without the
    // ghost gate. The biconvex singlet's single ghost pair carries well
    // under a percent of the direct energy, so the two estimates agree.
    let plain = LensCamera::new(biconvex(), wide_open(), INFINITY_FOCUS).unwrap();
    let gated = LensCamera::new(
        biconvex(),
        CameraSettings {
            ghosts: true,
            ..wide_open()
        },
        INFINITY_FOCUS,
    )
    .unwrap();

    let n = 20;
    let mut sum_plain = 0.0;
    let mut sum_gated = 0.0;
    for i in 0..n {
        for j in 0..n {
            let sample = CameraSample {
                p_film: Point2f::new(0.5, 0.5),
                u_lens: Point2f::new(
                    (i as Float + 0.5) / n as Float,
                    (j as Float + 0.5) / n as Float,
                ),
            };
            sum_plain += plain.generate_ray(&sample).weight;
            sum_gated += gated.generate_ray(&sample).weight;
        }
    }
    let mean_plain = sum_plain / (n * n) as Float;
    let mean_gated = sum_gated / (n * n) as Float;
    assert!(mean_plain > 0.0);
    assert!(
        (mean_gated - mean_plain).abs() / mean_plain < 0.02,
        "plain {} gated {}",
        mean_plain,
        mean_gated
    );
}

proptest! {
    #[test]
    fn meridional_rays_stay_meridional(
        film_y in 0.35f64..0.65,
        u_r in 0.0f64..0.9,
    ) {
        // Film points on the vertical centerline with a vertical pupil
        // offset never pick up a horizontal component in a lens with no
        // cylindrical surfaces.
        let camera = LensCamera::new(biconvex(), wide_open(), INFINITY_FOCUS).unwrap();
        let r = camera.generate_ray(&CameraSample {
            p_film: Point2f::new(0.5, film_y),
            u_lens: Point2f::new(u_r, 0.25),
        });
        if r.outcome == TraceOutcome::Complete {
            prop_assert!((r.ray.d.x / r.ray.d.z).abs() < 1e-9);
        }
    }

    #[test]
    fn weights_are_finite_and_nonnegative(
        film_x in 0.0f64..1.0,
        film_y in 0.0f64..1.0,
        u_x in 0.0f64..1.0,
        u_y in 0.0f64..1.0,
    ) {
        let camera = LensCamera::new(double_gauss(), wide_open(), INFINITY_FOCUS).unwrap();
        let r = camera.generate_ray(&CameraSample {
            p_film: Point2f::new(film_x, film_y),
            u_lens: Point2f::new(u_x, u_y),
        });
        prop_assert!(r.weight.is_finite());
        prop_assert!(r.weight >= 0.0);
        prop_assert!(r.wavelength > 0.0);
    }
}
