//! Ghost (double-reflection flare) path enumeration and tracing.
//!
//! A ghost is a ray that crosses the lens normally except for two specular
//! bounces off glass interfaces, picking up the product of their Fresnel
//! reflectances. Every unordered pair of distinct non-stop surfaces whose
//! interface actually changes the index of refraction spawns one ghost
//! path; interfaces with equal media on both sides reflect nothing and are
//! excluded.

use itertools::Itertools;

use crate::core::geometry::Ray;
use crate::prescription::{LensPrescription, SurfaceKind};
use crate::trace::{trace_surface_range, RangeTrace, TraceCtx, TraceOutcome};

/// Enumerates every candidate bounce pair `(lo, hi)` with `lo < hi`, both
/// non-stop and index-changing. Computed once per prescription, not per
/// ray.
pub fn ghost_pairs(rx: &LensPrescription) -> Vec<(usize, usize)> {
    (0..rx.len())
        .filter(|&i| rx.surfaces()[i].kind != SurfaceKind::Stop && rx.ior_changes_at(i))
        .tuple_combinations()
        .collect()
}

/// Traces a double-bounce path through the whole lens.
///
/// The walk runs in three legs: rear vertex forward to `lo` where the ray
/// reflects back, `lo + 1` rearward to `hi` where it reflects forward
/// again, then `hi - 1` out through the front vertex. Surfaces between the
/// bounce pair are crossed twice and the stop clips whichever leg contains
/// it. The overlap refinement stays off; ghosts are a stochastic estimate
/// and the retry's bias is not worth its cost here.
///
/// * `ctx` - Trace context.
/// * `ray` - Ray leaving the sensor towards the rear element.
/// * `lo`  - Front-most bounce surface (reflects the ray rearward).
/// * `hi`  - Rear-most bounce surface (reflects it forward again).
pub fn trace_ghost_path(ctx: &TraceCtx, ray: Ray, lo: usize, hi: usize) -> RangeTrace {
    debug_assert!(lo < hi && hi < ctx.rx.len());

    let first = trace_surface_range(ctx, ray, ctx.rx.len() - 1, lo, Some(lo), false);
    if first.outcome != TraceOutcome::Complete {
        return first;
    }

    let second = trace_surface_range(ctx, first.ray, lo + 1, hi, Some(hi), false);
    if second.outcome != TraceOutcome::Complete {
        return RangeTrace {
            transmittance: 0.0,
            ..second
        };
    }

    let third = trace_surface_range(ctx, second.ray, hi - 1, 0, None, false);
    RangeTrace {
        ray: third.ray,
        transmittance: if third.outcome == TraceOutcome::Complete {
            first.transmittance * second.transmittance * third.transmittance
        } else {
            0.0
        },
        outcome: third.outcome,
    }
}
