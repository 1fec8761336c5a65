//! Path profiles: the three reference shapes a thread moves between.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::params::{GeneratorParams, PIVOT_WIDTH};
use super::rng::SeededRng;

/// Normalized `(x, y)` coordinate.
pub type Point = [f32; 2];

/// Amplitude of the resting wave along a thread.
const REST_WAVE: f32 = 0.04;
/// Random horizontal wobble of interior control points.
const X_JITTER: f32 = 0.015;

/// Rest, fully-up and fully-down shapes of a thread.
///
/// The three sequences always have the same length and point `i` of each
/// describes the same segment of the thread, so they can be blended freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathProfile {
    pub neutral: Vec<Point>,
    pub up: Vec<Point>,
    pub down: Vec<Point>,
}

impl PathProfile {
    pub fn len(&self) -> usize {
        self.neutral.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neutral.is_empty()
    }

    /// True when all three poses have the same point count.
    pub fn is_consistent(&self) -> bool {
        self.neutral.len() == self.up.len() && self.up.len() == self.down.len()
    }

    /// Smallest and largest y over all poses.
    pub fn vertical_extent(&self) -> (f32, f32) {
        self.neutral
            .iter()
            .chain(self.up.iter())
            .chain(self.down.iter())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p[1]), hi.max(p[1]))
            })
    }
}

/// Closeness of `x` to the pivot column, 1 at the pivot falling to 0.
pub fn pivot_proximity(x: f32, pivot_x: f32) -> f32 {
    let d = (x - pivot_x) / PIVOT_WIDTH;
    (-d * d).exp()
}

/// Build the profile for thread `id` of `total`.
///
/// Threads are spread vertically by their index and their control points are
/// staggered horizontally so neighbouring threads do not share columns.
/// Draw order is fixed: baseline jitter, amplitude scale, then two draws per point.
pub fn create_path_profile(
    id: u32,
    rng: &mut SeededRng,
    total: u32,
    params: &GeneratorParams,
) -> PathProfile {
    let total = total.max(1);
    let n = params.point_count();
    let slot = (id as f32 + 0.5) / total as f32;
    let band = params.path_bottom - params.path_top;

    let baseline_y = params.path_top + band * slot + rng.range(-0.35, 0.35) * band / total as f32;
    let amp_scale = rng.range(0.7, 1.3);

    let width = params.path_right - params.path_left;
    let step = width / (n - 1) as f32;
    let stagger = (slot - 0.5) * step * 0.5;

    let mut neutral = Vec::with_capacity(n);
    let mut up = Vec::with_capacity(n);
    let mut down = Vec::with_capacity(n);

    for i in 0..n {
        let u = i as f32 / (n - 1) as f32;
        let jitter = rng.range(-X_JITTER, X_JITTER);
        let wave = rng.range(-1.0, 1.0) * REST_WAVE;

        let interior = (PI * u).sin();
        let x = params.path_left + width * u + (stagger + jitter) * interior;

        let k = pivot_proximity(x, params.pivot_x);
        let rest_y = baseline_y + wave * interior;
        let y = rest_y + (params.pivot_y - rest_y) * k * params.pivot_pull;

        let amp = params.amplitude * amp_scale * (1.0 - params.pivot_damping * k);

        neutral.push([x, y]);
        up.push([x, y - amp]);
        down.push([x, y + amp]);
    }

    PathProfile { neutral, up, down }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_lengths_match() {
        let params = GeneratorParams::default();
        for id in 0..10 {
            let mut rng = SeededRng::for_thread(id);
            let p = create_path_profile(id, &mut rng, 10, &params);
            assert!(p.is_consistent());
            assert_eq!(p.len(), params.point_count());
        }
    }

    #[test]
    fn test_up_above_down() {
        let params = GeneratorParams::default();
        let mut rng = SeededRng::for_thread(3);
        let p = create_path_profile(3, &mut rng, 12, &params);
        for i in 0..p.len() {
            assert!(p.up[i][1] < p.neutral[i][1]);
            assert!(p.down[i][1] > p.neutral[i][1]);
            assert_eq!(p.up[i][0], p.neutral[i][0]);
        }
    }

    #[test]
    fn test_endpoints_span_path_bounds() {
        let params = GeneratorParams::default();
        let mut rng = SeededRng::for_thread(0);
        let p = create_path_profile(0, &mut rng, 5, &params);
        assert!((p.neutral[0][0] - params.path_left).abs() < 1e-5);
        assert!((p.neutral[p.len() - 1][0] - params.path_right).abs() < 1e-5);
    }

    #[test]
    fn test_motion_damped_at_pivot() {
        let params = GeneratorParams::default();
        let mut rng = SeededRng::for_thread(2);
        let p = create_path_profile(2, &mut rng, 8, &params);
        let spans: Vec<(f32, f32)> = (0..p.len())
            .map(|i| (pivot_proximity(p.neutral[i][0], params.pivot_x), p.down[i][1] - p.up[i][1]))
            .collect();
        let nearest = spans.iter().cloned().fold((0.0, 0.0), |a, b| if b.0 > a.0 { b } else { a });
        let farthest = spans.iter().cloned().fold((1.0, 0.0), |a, b| if b.0 < a.0 { b } else { a });
        assert!(nearest.1 < farthest.1);
    }

    #[test]
    fn test_pivot_proximity_peak() {
        assert!((pivot_proximity(0.5, 0.5) - 1.0).abs() < 1e-6);
        assert!(pivot_proximity(0.0, 0.5) < 0.01);
    }

    #[test]
    fn test_vertical_extent_covers_poses() {
        let params = GeneratorParams::default();
        let mut rng = SeededRng::for_thread(1);
        let p = create_path_profile(1, &mut rng, 4, &params);
        let (lo, hi) = p.vertical_extent();
        assert!(p.up.iter().all(|pt| pt[1] >= lo));
        assert!(p.down.iter().all(|pt| pt[1] <= hi));
    }
}
