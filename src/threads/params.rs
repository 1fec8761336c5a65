//! Generator tuning parameters.

use serde::{Deserialize, Serialize};

/// Points per thread path. Equal for all three profile poses.
pub const POINTS_PER_THREAD: usize = 7;

/// Share of threads that start moving up.
pub const UP_FRACTION: f32 = 0.6;

/// Width (normalized x) of the region around the pivot that pinches threads together.
pub const PIVOT_WIDTH: f32 = 0.18;

pub const OPACITY_RANGE: (f32, f32) = (0.28, 0.85);
pub const WEIGHT_RANGE: (f32, f32) = (0.8, 2.2);
pub const DURATION_RANGE_MS: (f32, f32) = (5200.0, 9800.0);

/// Sway oscillator ranges: frequency in radians per millisecond, amplitude in normalized x.
pub const SWAY_FREQ_RANGE: (f32, f32) = (0.000_35, 0.000_9);
pub const SWAY_AMP_RANGE: (f32, f32) = (0.004, 0.014);

/// Drift oscillator ranges: frequency in radians per millisecond, amplitude in normalized y.
pub const DRIFT_FREQ_RANGE: (f32, f32) = (0.000_08, 0.000_22);
pub const DRIFT_AMP_RANGE: (f32, f32) = (0.006, 0.02);

/// Parameters shaping generated threads.
///
/// All coordinates are normalized to the surface: `(0, 0)` top-left, `(1, 1)` bottom-right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorParams {
    pub points_per_thread: usize,
    pub path_left: f32,
    pub path_right: f32,
    pub path_top: f32,
    pub path_bottom: f32,
    pub pivot_x: f32,
    pub pivot_y: f32,
    /// How strongly threads converge on `pivot_y` near `pivot_x` (0 = not at all).
    pub pivot_pull: f32,
    /// Fraction of the up/down amplitude removed at the pivot.
    pub pivot_damping: f32,
    /// Vertical displacement of the up/down poses.
    pub amplitude: f32,
    pub up_fraction: f32,
    pub duration_min_ms: f32,
    pub duration_max_ms: f32,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            points_per_thread: POINTS_PER_THREAD,
            path_left: -0.06,
            path_right: 1.06,
            path_top: 0.18,
            path_bottom: 0.82,
            pivot_x: 0.62,
            pivot_y: 0.5,
            pivot_pull: 0.55,
            pivot_damping: 0.65,
            amplitude: 0.16,
            up_fraction: UP_FRACTION,
            duration_min_ms: DURATION_RANGE_MS.0,
            duration_max_ms: DURATION_RANGE_MS.1,
        }
    }
}

impl GeneratorParams {
    /// Point count actually used (a curve needs at least three points).
    pub fn point_count(&self) -> usize {
        self.points_per_thread.max(3)
    }
}
