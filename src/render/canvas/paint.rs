//! Frame data to tiny-skia paths and shaders.

use tiny_skia::{Color, GradientStop, LinearGradient, Path, PathBuilder, Shader, SpreadMode, Transform};

use crate::frame::{sample_gradient, ColorStop};
use crate::geometry::{smooth_segments, BEZIER_CONTROL_FACTOR};
use crate::threads::Point;

/// Straight RGBA to a skia color, with `opacity` folded into alpha.
pub fn to_skia_color(rgba: [f32; 4], opacity: f32) -> Color {
    Color::from_rgba(
        rgba[0].clamp(0.0, 1.0),
        rgba[1].clamp(0.0, 1.0),
        rgba[2].clamp(0.0, 1.0),
        (rgba[3] * opacity).clamp(0.0, 1.0),
    )
    .unwrap_or(Color::TRANSPARENT)
}

/// Smooth bezier path through `points`, scaled by `scale`.
///
/// `None` for fewer than two points.
pub fn thread_path(points: &[Point], scale: f32) -> Option<Path> {
    let segments = smooth_segments(points, BEZIER_CONTROL_FACTOR);
    let first = segments.first()?;

    let mut pb = PathBuilder::new();
    pb.move_to(first.from[0] * scale, first.from[1] * scale);
    for seg in &segments {
        pb.cubic_to(
            seg.c1[0] * scale,
            seg.c1[1] * scale,
            seg.c2[0] * scale,
            seg.c2[1] * scale,
            seg.to[0] * scale,
            seg.to[1] * scale,
        );
    }
    pb.finish()
}

/// Vertical gradient from `min_y` to `max_y`, like `createLinearGradient(0, min_y, 0, max_y)`.
///
/// A degenerate span paints the mid-point color.
pub fn vertical_gradient(stops: &[ColorStop], min_y: f32, max_y: f32, opacity: f32) -> Option<Shader<'static>> {
    if stops.is_empty() {
        return None;
    }
    if (max_y - min_y).abs() < f32::EPSILON {
        return Some(Shader::SolidColor(to_skia_color(sample_gradient(stops, 0.5), opacity)));
    }
    LinearGradient::new(
        tiny_skia::Point::from_xy(0.0, min_y),
        tiny_skia::Point::from_xy(0.0, max_y),
        stops
            .iter()
            .map(|s| GradientStop::new(s.offset, to_skia_color(s.color, opacity)))
            .collect(),
        SpreadMode::Pad,
        Transform::identity(),
    )
}
