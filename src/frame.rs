//! Per-tick frame data handed from the animation worker to a renderer.
//!
//! A [`FramePacket`] is built once per animation tick, drawn, and dropped.
//! All coordinates are in surface pixels.

use serde::{Deserialize, Serialize};

use crate::threads::{Hsl, Point};

/// Maximum gradient stops per thread understood by every renderer.
pub const MAX_COLOR_STOPS: usize = 4;

/// A gradient stop. `color` is straight (non-premultiplied) RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f32,
    pub color: [f32; 4],
}

impl ColorStop {
    pub fn new(offset: f32, color: [f32; 4]) -> Self {
        Self { offset, color }
    }
}

/// Sample a stop list at `t`. Stops must be sorted by offset.
///
/// Values outside the first/last stop clamp to the end colors; an empty list
/// is transparent.
pub fn sample_gradient(stops: &[ColorStop], t: f32) -> [f32; 4] {
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return [0.0; 4],
    };
    if t <= first.offset {
        return first.color;
    }
    if t >= last.offset {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.offset && t <= b.offset {
            let span = (b.offset - a.offset).max(f32::EPSILON);
            let k = (t - a.offset) / span;
            return [
                a.color[0] + (b.color[0] - a.color[0]) * k,
                a.color[1] + (b.color[1] - a.color[1]) * k,
                a.color[2] + (b.color[2] - a.color[2]) * k,
                a.color[3] + (b.color[3] - a.color[3]) * k,
            ];
        }
    }
    last.color
}

/// Vertical gradient stops for a thread of the given base color.
///
/// Lighter and cooler at the top of its travel, base color mid-way, shifted
/// warmer and darker at the bottom.
pub fn thread_color_stops(color: Hsl) -> Vec<ColorStop> {
    let rgba = |c: Hsl| {
        let [r, g, b] = c.to_rgb();
        [r, g, b, 1.0]
    };
    vec![
        ColorStop::new(0.0, rgba(color.rotate(-10.0).lighten(0.12))),
        ColorStop::new(0.5, rgba(color)),
        ColorStop::new(1.0, rgba(color.rotate(18.0).lighten(-0.08))),
    ]
}

/// Full-surface vertical overlay gradient drawn over the threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayGradient {
    pub stops: Vec<ColorStop>,
}

impl Default for OverlayGradient {
    fn default() -> Self {
        Self {
            stops: vec![
                ColorStop::new(0.0, [0.02, 0.03, 0.08, 0.55]),
                ColorStop::new(0.45, [0.02, 0.03, 0.08, 0.0]),
                ColorStop::new(1.0, [0.02, 0.03, 0.08, 0.75]),
            ],
        }
    }
}

impl OverlayGradient {
    /// Overlay that draws nothing.
    pub fn none() -> Self {
        Self { stops: Vec::new() }
    }

    pub fn is_visible(&self) -> bool {
        self.stops.iter().any(|s| s.color[3] > 0.0)
    }
}

/// Resolved geometry and styling of one thread for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadFrame {
    pub id: u32,
    /// Control points in pixels; renderers smooth them into curves.
    pub points: Vec<Point>,
    pub stroke_width: f32,
    pub opacity: f32,
    pub color_stops: Vec<ColorStop>,
    /// Vertical pixel range the gradient is stretched over.
    pub gradient_min_y: f32,
    pub gradient_max_y: f32,
}

impl ThreadFrame {
    /// Gradient parameter for pixel row `y`.
    pub fn gradient_t(&self, y: f32) -> f32 {
        let span = self.gradient_max_y - self.gradient_min_y;
        if span.abs() < f32::EPSILON {
            return 0.5;
        }
        ((y - self.gradient_min_y) / span).clamp(0.0, 1.0)
    }
}

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePacket {
    pub width: u32,
    pub height: u32,
    pub time_ms: f64,
    pub threads: Vec<ThreadFrame>,
    pub overlay: OverlayGradient,
}

impl FramePacket {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            time_ms: 0.0,
            threads: Vec::new(),
            overlay: OverlayGradient::none(),
        }
    }
}
