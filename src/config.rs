//! User-facing control parameters.
//!
//! [`ThreadControlParams`] carries optional overrides, typically from a debug
//! panel or a JSON file. [`ThreadControlParams::resolve`] layers them over the
//! device's [`PerformanceProfile`] and the built-in defaults, clamping anything
//! out of range.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::{AnimationParams, FRAME_INTERVAL_MS};
use crate::orchestrator::PerformanceProfile;
use crate::render::MAX_GPU_THREADS;
use crate::threads::GeneratorParams;

/// Errors loading control parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Optional overrides. Unset fields fall back to computed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadControlParams {
    pub thread_count: Option<u32>,
    pub pivot_x: Option<f32>,
    pub pivot_y: Option<f32>,
    pub pivot_pull: Option<f32>,
    pub path_left: Option<f32>,
    pub path_right: Option<f32>,
    pub path_top: Option<f32>,
    pub path_bottom: Option<f32>,
    pub up_fraction: Option<f32>,
    pub duration_min_ms: Option<f32>,
    pub duration_max_ms: Option<f32>,
    pub flip_interval_ms: Option<f64>,
    pub settle_buffer_ms: Option<f64>,
    pub flip_fraction: Option<f32>,
    pub pivot_damping: Option<f32>,
    pub enable_blur: Option<bool>,
    pub blur_std_deviation: Option<f32>,
    pub frame_interval_ms: Option<f64>,
}

/// Fully resolved parameters for one mount.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    pub thread_count: u32,
    pub generator: GeneratorParams,
    pub animation: AnimationParams,
    pub enable_blur: bool,
    pub blur_std_deviation: f32,
    pub frame_interval_ms: f64,
}

fn clamped<T: PartialOrd + Copy + std::fmt::Display>(name: &str, value: T, min: T, max: T) -> T {
    if value < min {
        log::warn!("{} = {} is below {}, clamping", name, value, min);
        min
    } else if value > max {
        log::warn!("{} = {} is above {}, clamping", name, value, max);
        max
    } else {
        value
    }
}

impl ThreadControlParams {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge overrides over `profile` and the defaults.
    pub fn resolve(&self, profile: &PerformanceProfile) -> ResolvedParams {
        let mut generator = GeneratorParams::default();
        let mut animation = AnimationParams::default();

        let thread_count = match self.thread_count {
            Some(n) => clamped("threadCount", n, 1, MAX_GPU_THREADS as u32),
            None => profile.thread_count,
        };

        if let Some(v) = self.pivot_x {
            generator.pivot_x = clamped("pivotX", v, 0.0, 1.0);
        }
        if let Some(v) = self.pivot_y {
            generator.pivot_y = clamped("pivotY", v, 0.0, 1.0);
        }
        if let Some(v) = self.pivot_pull {
            generator.pivot_pull = clamped("pivotPull", v, 0.0, 1.0);
        }
        if let Some(v) = self.pivot_damping {
            generator.pivot_damping = clamped("pivotDamping", v, 0.0, 1.0);
        }
        if let Some(v) = self.path_left {
            generator.path_left = clamped("pathLeft", v, -0.5, 1.5);
        }
        if let Some(v) = self.path_right {
            generator.path_right = clamped("pathRight", v, -0.5, 1.5);
        }
        if let Some(v) = self.path_top {
            generator.path_top = clamped("pathTop", v, 0.0, 1.0);
        }
        if let Some(v) = self.path_bottom {
            generator.path_bottom = clamped("pathBottom", v, 0.0, 1.0);
        }
        if generator.path_left > generator.path_right {
            log::warn!("pathLeft is right of pathRight, swapping");
            std::mem::swap(&mut generator.path_left, &mut generator.path_right);
        }
        if generator.path_top > generator.path_bottom {
            log::warn!("pathTop is below pathBottom, swapping");
            std::mem::swap(&mut generator.path_top, &mut generator.path_bottom);
        }
        if let Some(v) = self.up_fraction {
            generator.up_fraction = clamped("upFraction", v, 0.0, 1.0);
        }
        if let Some(v) = self.duration_min_ms {
            generator.duration_min_ms = clamped("durationMinMs", v, 100.0, 120_000.0);
        }
        if let Some(v) = self.duration_max_ms {
            generator.duration_max_ms = clamped("durationMaxMs", v, 100.0, 120_000.0);
        }

        animation.pivot_x = generator.pivot_x;
        animation.pivot_damping = generator.pivot_damping;
        if let Some(v) = self.flip_interval_ms {
            animation.flip_interval_ms = clamped("flipIntervalMs", v, 100.0, 600_000.0);
        }
        if let Some(v) = self.settle_buffer_ms {
            animation.settle_buffer_ms = clamped("settleBufferMs", v, 0.0, 600_000.0);
        }
        if let Some(v) = self.flip_fraction {
            animation.flip_fraction = clamped("flipFraction", v, 0.0, 1.0);
        }

        let blur_std_deviation = match self.blur_std_deviation {
            Some(v) => clamped("blurStdDeviation", v, 0.0, 32.0),
            None => profile.blur_std_deviation,
        };
        let enable_blur = self.enable_blur.unwrap_or(profile.enable_blur()) && blur_std_deviation > 0.0;

        let frame_interval_ms = match self.frame_interval_ms {
            Some(v) => clamped("frameIntervalMs", v, FRAME_INTERVAL_MS, 1000.0),
            None => profile.frame_interval_ms,
        };

        ResolvedParams {
            thread_count,
            generator,
            animation,
            enable_blur,
            blur_std_deviation,
            frame_interval_ms,
        }
    }
}
