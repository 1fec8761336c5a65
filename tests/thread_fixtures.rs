//! Shared test fixtures for thread, renderer and orchestrator tests.

#![allow(dead_code)]

use timeline_threads::frame::{thread_color_stops, ColorStop, FramePacket, OverlayGradient, ThreadFrame};
use timeline_threads::render::{Capabilities, FactoryOptions, RendererConfig, RendererKind, SurfaceSnapshot};
use timeline_threads::threads::Hsl;

/// Renderer config for a small test surface.
pub fn test_config(width: u32, height: u32, enable_blur: bool) -> RendererConfig {
    RendererConfig {
        width,
        height,
        pixel_ratio: 1.0,
        enable_blur,
        blur_std_deviation: 4.0,
        ..RendererConfig::default()
    }
}

/// A single bright diagonal-ish thread.
pub fn synthetic_thread(id: u32, width: u32, height: u32) -> ThreadFrame {
    let (w, h) = (width as f32, height as f32);
    ThreadFrame {
        id,
        points: vec![
            [0.0, h * 0.3],
            [w * 0.25, h * 0.45],
            [w * 0.5, h * 0.5],
            [w * 0.75, h * 0.55],
            [w, h * 0.7],
        ],
        stroke_width: 3.0,
        opacity: 0.9,
        color_stops: thread_color_stops(Hsl::new(190.0, 0.8, 0.6)),
        gradient_min_y: 0.0,
        gradient_max_y: h,
    }
}

/// Packet with `count` stacked synthetic threads and no overlay.
pub fn synthetic_packet(width: u32, height: u32, count: u32) -> FramePacket {
    let threads = (0..count)
        .map(|i| {
            let mut t = synthetic_thread(i, width, height);
            let dy = (i as f32 - count as f32 / 2.0) * 3.0;
            for p in &mut t.points {
                p[1] += dy;
            }
            t
        })
        .collect();
    FramePacket {
        width,
        height,
        time_ms: 0.0,
        threads,
        overlay: OverlayGradient::none(),
    }
}

/// Overlay darkening the bottom of the frame.
pub fn bottom_fade() -> OverlayGradient {
    OverlayGradient {
        stops: vec![
            ColorStop::new(0.0, [0.0, 0.0, 0.0, 0.0]),
            ColorStop::new(1.0, [0.0, 0.0, 0.0, 1.0]),
        ],
    }
}

/// Factory options that pin the CPU renderer.
pub fn canvas_factory() -> FactoryOptions {
    FactoryOptions {
        force: Some(RendererKind::Canvas2d),
        allow_canvas_fallback: true,
        ..FactoryOptions::default()
    }
}

pub fn cpu_caps() -> Capabilities {
    Capabilities::cpu_only()
}

/// Sum of RGB over the whole snapshot.
pub fn total_brightness(snapshot: &SurfaceSnapshot) -> u64 {
    snapshot
        .pixels
        .chunks_exact(4)
        .map(|p| p[0] as u64 + p[1] as u64 + p[2] as u64)
        .sum()
}

/// Pixels brighter than the background by more than `threshold` on any channel.
pub fn lit_pixels(snapshot: &SurfaceSnapshot, background: [f32; 4], threshold: u8) -> usize {
    let bg: Vec<u8> = background[..3].iter().map(|c| (c * 255.0).round() as u8).collect();
    snapshot
        .pixels
        .chunks_exact(4)
        .filter(|p| (0..3).any(|i| p[i].saturating_sub(bg[i]) > threshold))
        .count()
}
