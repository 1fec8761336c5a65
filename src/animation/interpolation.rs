//! Easing and per-point interpolation.

use std::f32::consts::PI;

use crate::threads::{pivot_proximity, Point};

/// Symmetric quadratic ease-in-out on `[0, 1]`.
pub fn ease_in_out(p: f32) -> f32 {
    let p = p.clamp(0.0, 1.0);
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

/// Decelerating curve; larger `damping` arrives sooner and settles longer.
pub fn decelerate(p: f32, damping: f32) -> f32 {
    let p = p.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powf(1.0 + 2.0 * damping.max(0.0))
}

/// Eased progress for a point whose pivot closeness is `proximity`.
///
/// Far from the pivot this is plain ease-in-out; at the pivot it leans toward
/// [`decelerate`] by `damping`. Endpoints stay at 0 and 1.
pub fn eased_progress(p: f32, proximity: f32, damping: f32) -> f32 {
    let k = (proximity * damping).clamp(0.0, 1.0);
    let a = ease_in_out(p);
    a + (decelerate(p, damping) - a) * k
}

/// Weight that is 0 at both thread ends and 1 in the middle.
pub fn end_envelope(index: usize, count: usize) -> f32 {
    if count < 2 {
        return 0.0;
    }
    (PI * index as f32 / (count - 1) as f32).sin()
}

/// Secondary motion applied on top of the pose blend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Oscillation {
    pub sway: f32,
    pub drift: f32,
}

impl Oscillation {
    pub fn at(now_ms: f64, phase: f32, freq: f32, amp: f32) -> f32 {
        amp * ((now_ms * freq as f64) as f32 + phase).sin()
    }
}

/// Blend `from` toward `to` at progress `p`, add oscillation, return normalized points.
pub fn interpolate_points(
    neutral: &[Point],
    from: &[Point],
    to: &[Point],
    p: f32,
    pivot_x: f32,
    damping: f32,
    osc: Oscillation,
) -> Vec<Point> {
    let n = from.len().min(to.len()).min(neutral.len());
    (0..n)
        .map(|i| {
            let e = eased_progress(p, pivot_proximity(neutral[i][0], pivot_x), damping);
            let env = end_envelope(i, n);
            [
                from[i][0] + (to[i][0] - from[i][0]) * e + osc.sway * env,
                from[i][1] + (to[i][1] - from[i][1]) * e + osc.drift * env,
            ]
        })
        .collect()
}
