//! Curve smoothing shared by both renderers.
//!
//! A thread is a sparse sequence of points. Each span between two points is
//! drawn as a cubic bezier whose control points are derived from the local
//! three-point neighbourhood, so curves pass through every point smoothly
//! without a spline solver.

use crate::threads::Point;

/// Fraction of the neighbour-to-neighbour distance used as tangent length.
pub const BEZIER_CONTROL_FACTOR: f32 = 0.2;

/// One cubic bezier span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub from: Point,
    pub c1: Point,
    pub c2: Point,
    pub to: Point,
}

impl CubicSegment {
    /// Evaluate the curve at `t` in `[0, 1]`.
    pub fn point_at(&self, t: f32) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        [
            a * self.from[0] + b * self.c1[0] + c * self.c2[0] + d * self.to[0],
            a * self.from[1] + b * self.c1[1] + c * self.c2[1] + d * self.to[1],
        ]
    }
}

/// Control point for `current`, tangent parallel to `previous -> next`.
fn control_point(
    current: Point,
    previous: Option<Point>,
    next: Option<Point>,
    reverse: bool,
    factor: f32,
) -> Point {
    let p = previous.unwrap_or(current);
    let n = next.unwrap_or(current);
    let dx = n[0] - p[0];
    let dy = n[1] - p[1];
    let length = (dx * dx + dy * dy).sqrt() * factor;
    let angle = dy.atan2(dx) + if reverse { std::f32::consts::PI } else { 0.0 };
    [current[0] + angle.cos() * length, current[1] + angle.sin() * length]
}

/// Bezier spans through `points`. Fewer than two points yields no spans.
pub fn smooth_segments(points: &[Point], factor: f32) -> Vec<CubicSegment> {
    if points.len() < 2 {
        return Vec::new();
    }

    (1..points.len())
        .map(|i| {
            let prev = points[i - 1];
            let cur = points[i];
            let prev_prev = if i >= 2 { Some(points[i - 2]) } else { None };
            let next = points.get(i + 1).copied();
            CubicSegment {
                from: prev,
                c1: control_point(prev, prev_prev, Some(cur), false, factor),
                c2: control_point(cur, Some(prev), next, true, factor),
                to: cur,
            }
        })
        .collect()
}

/// Tessellate spans into a polyline with `subdivisions` steps per span.
pub fn flatten_segments(segments: &[CubicSegment], subdivisions: u32) -> Vec<Point> {
    let steps = subdivisions.max(1);
    let mut out = Vec::with_capacity(segments.len() * steps as usize + 1);
    if let Some(first) = segments.first() {
        out.push(first.from);
    }
    for seg in segments {
        for s in 1..=steps {
            out.push(seg.point_at(s as f32 / steps as f32));
        }
    }
    out
}

/// Smooth and tessellate in one step.
pub fn smooth_polyline(points: &[Point], subdivisions: u32) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }
    flatten_segments(&smooth_segments(points, BEZIER_CONTROL_FACTOR), subdivisions)
}
