//! Animation timing parameters.

use serde::{Deserialize, Serialize};

use crate::threads::GOLDEN_RATIO_SEED;

/// Baseline frame interval (30 fps).
pub const FRAME_INTERVAL_MS: f64 = 1000.0 / 30.0;
/// How often flip candidates are picked.
pub const FLIP_INTERVAL_MS: f64 = 2600.0;
/// Quiet time after a traversal ends before a thread may flip again.
pub const SETTLE_BUFFER_MS: f64 = 900.0;
/// Share of eligible threads reversed per flip check.
pub const FLIP_FRACTION: f32 = 0.22;
/// Blend toward the decelerating curve at the pivot.
pub const PIVOT_DAMPING: f32 = 0.65;

/// Knobs for [`Animator`](super::Animator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationParams {
    pub flip_interval_ms: f64,
    pub settle_buffer_ms: f64,
    pub flip_fraction: f32,
    pub pivot_damping: f32,
    /// Normalized x of the pivot column, for damping proximity.
    pub pivot_x: f32,
    /// Seed of the flip scheduler's RNG.
    pub flip_seed: u32,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            flip_interval_ms: FLIP_INTERVAL_MS,
            settle_buffer_ms: SETTLE_BUFFER_MS,
            flip_fraction: FLIP_FRACTION,
            pivot_damping: PIVOT_DAMPING,
            pivot_x: 0.62,
            flip_seed: GOLDEN_RATIO_SEED,
        }
    }
}
