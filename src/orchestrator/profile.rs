//! Device-derived performance profile.

use serde::{Deserialize, Serialize};

use crate::animation::FRAME_INTERVAL_MS;

/// Thread count on a capable desktop.
pub const BASE_THREAD_COUNT: u32 = 50;
/// Lowest thread count any device gets.
pub const MIN_THREAD_COUNT: u32 = {
    let scaled = (BASE_THREAD_COUNT * 4 + 5) / 10;
    if scaled > 12 {
        scaled
    } else {
        12
    }
};
pub const DEFAULT_BLUR_STD_DEVIATION: f32 = 8.0;
/// Blur on dense (DPR > 2) screens.
pub const REDUCED_BLUR_STD_DEVIATION: f32 = 6.0;

const NARROW_VIEWPORT: f32 = 640.0;
const MEDIUM_VIEWPORT: f32 = 1024.0;
const LOW_POWER_FRAME_INTERVAL_MS: f64 = 1000.0 / 24.0;
const DATA_SAVER_FRAME_INTERVAL_MS: f64 = 1000.0 / 20.0;

/// Network quality class, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectiveConnectionType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    Cellular2g,
    #[serde(rename = "3g")]
    Cellular3g,
    #[serde(rename = "4g")]
    Cellular4g,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown connection type: {0}")]
pub struct ParseConnectionTypeError(String);

impl std::str::FromStr for EffectiveConnectionType {
    type Err = ParseConnectionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slow-2g" => Ok(Self::Slow2g),
            "2g" => Ok(Self::Cellular2g),
            "3g" => Ok(Self::Cellular3g),
            "4g" => Ok(Self::Cellular4g),
            _ => Err(ParseConnectionTypeError(s.to_string())),
        }
    }
}

/// What the host knows about the device and viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSignals {
    /// Viewport size in CSS pixels.
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub device_pixel_ratio: f32,
    pub hardware_concurrency: Option<u32>,
    pub save_data: bool,
    pub effective_type: Option<EffectiveConnectionType>,
}

impl Default for DeviceSignals {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            viewport_height: 720.0,
            device_pixel_ratio: 1.0,
            hardware_concurrency: None,
            save_data: false,
            effective_type: None,
        }
    }
}

impl DeviceSignals {
    pub fn viewport(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            viewport_width: width,
            viewport_height: height,
            device_pixel_ratio,
            ..Self::default()
        }
    }

    /// Surface size in device pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        let dpr = self.pixel_ratio();
        (
            (self.viewport_width.max(0.0) * dpr).round().max(1.0) as u32,
            (self.viewport_height.max(0.0) * dpr).round().max(1.0) as u32,
        )
    }

    pub fn pixel_ratio(&self) -> f32 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }
}

/// Rendering cost knobs derived from [`DeviceSignals`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceProfile {
    pub thread_count: u32,
    /// Zero disables the glow.
    pub blur_std_deviation: f32,
    pub frame_interval_ms: f64,
}

impl PerformanceProfile {
    pub fn enable_blur(&self) -> bool {
        self.blur_std_deviation > 0.0
    }
}

impl Default for PerformanceProfile {
    fn default() -> Self {
        compute_performance_profile(&DeviceSignals::default())
    }
}

/// Scale thread count, blur and frame rate to the device.
///
/// The thread count always lands in `[MIN_THREAD_COUNT, BASE_THREAD_COUNT]` and
/// the frame interval is never shorter than [`FRAME_INTERVAL_MS`].
pub fn compute_performance_profile(signals: &DeviceSignals) -> PerformanceProfile {
    let width = signals.viewport_width;
    let dpr = signals.pixel_ratio();
    let mut scale = 1.0f32;
    let mut frame_interval_ms = FRAME_INTERVAL_MS;

    if width < NARROW_VIEWPORT {
        scale *= 0.55;
    } else if width < MEDIUM_VIEWPORT {
        scale *= 0.75;
    }

    match signals.hardware_concurrency {
        Some(cores) if cores <= 2 => {
            scale *= 0.6;
            frame_interval_ms = frame_interval_ms.max(LOW_POWER_FRAME_INTERVAL_MS);
        }
        Some(cores) if cores <= 4 => scale *= 0.8,
        _ => {}
    }

    if signals.save_data {
        scale *= 0.6;
        frame_interval_ms = frame_interval_ms.max(DATA_SAVER_FRAME_INTERVAL_MS);
    }

    match signals.effective_type {
        Some(EffectiveConnectionType::Slow2g | EffectiveConnectionType::Cellular2g) => {
            scale *= 0.6;
            frame_interval_ms = frame_interval_ms.max(DATA_SAVER_FRAME_INTERVAL_MS);
        }
        Some(EffectiveConnectionType::Cellular3g) => scale *= 0.8,
        _ => {}
    }

    let thread_count = ((BASE_THREAD_COUNT as f32 * scale).round() as u32).clamp(MIN_THREAD_COUNT, BASE_THREAD_COUNT);

    let blur_std_deviation = if width < NARROW_VIEWPORT || dpr > 2.5 {
        0.0
    } else if dpr > 2.0 {
        REDUCED_BLUR_STD_DEVIATION
    } else {
        DEFAULT_BLUR_STD_DEVIATION
    };

    PerformanceProfile {
        thread_count,
        blur_std_deviation,
        frame_interval_ms,
    }
}
