//! Renderer contract tests run against every renderer kind.
//!
//! GPU kinds skip when no adapter is available.

mod thread_fixtures;

use thread_fixtures::{bottom_fade, canvas_factory, cpu_caps, lit_pixels, synthetic_packet, test_config, total_brightness};
use timeline_threads::frame::FramePacket;
use timeline_threads::render::{
    create_renderer_with, renderer_for_kind, Capabilities, FactoryOptions, OffscreenSurface, RenderError, Renderer,
    RendererConfigPatch, RendererKind,
};

/// Initialised renderer of `kind`, or `None` when the machine cannot run it.
fn init_renderer(kind: RendererKind, width: u32, height: u32, blur: bool) -> Option<Box<dyn Renderer>> {
    let mut renderer = renderer_for_kind(kind);
    match renderer.init(OffscreenSurface::new(width, height, 1.0), test_config(width, height, blur)) {
        Ok(()) => Some(renderer),
        Err(e) => {
            eprintln!("Skipping {} - {}", kind, e);
            None
        }
    }
}

// ==================== Contract ====================

#[tokio::test]
async fn test_draw_synthetic_packet_all_kinds() {
    for &kind in RendererKind::all() {
        for blur in [false, true] {
            let Some(mut r) = init_renderer(kind, 96, 48, blur) else {
                continue;
            };
            r.draw(&synthetic_packet(96, 48, 4)).unwrap();
            let snap = r.surface().unwrap().snapshot();
            assert!(
                lit_pixels(&snap, r.config().unwrap().background, 10) > 0,
                "{} (blur={}) drew nothing",
                kind,
                blur
            );
            assert_eq!(snap.pixel(0, 0).unwrap()[3], 255);
        }
    }
}

#[tokio::test]
async fn test_empty_packet_is_background() {
    for &kind in RendererKind::all() {
        let Some(mut r) = init_renderer(kind, 32, 32, true) else {
            continue;
        };
        r.draw(&FramePacket::empty(32, 32)).unwrap();
        let snap = r.surface().unwrap().snapshot();
        assert_eq!(lit_pixels(&snap, r.config().unwrap().background, 2), 0, "{}", kind);
    }
}

#[tokio::test]
async fn test_partial_update_keeps_unrelated_state() {
    for &kind in RendererKind::all() {
        let Some(mut r) = init_renderer(kind, 64, 32, true) else {
            continue;
        };
        let before = r.config().unwrap().clone();
        r.update_config(&RendererConfigPatch {
            glow_alpha: Some(0.25),
            ..RendererConfigPatch::default()
        })
        .unwrap();
        let after = r.config().unwrap();
        assert_eq!(after.glow_alpha, 0.25);
        assert_eq!(after.width, before.width);
        assert_eq!(after.background, before.background);
        assert_eq!(after.blur_std_deviation, before.blur_std_deviation);
        assert!(after.enable_blur);
        r.draw(&synthetic_packet(64, 32, 2)).unwrap();
    }
}

#[tokio::test]
async fn test_resize_then_draw() {
    for &kind in RendererKind::all() {
        let Some(mut r) = init_renderer(kind, 40, 20, true) else {
            continue;
        };
        r.update_config(&RendererConfigPatch {
            width: Some(80),
            height: Some(30),
            ..RendererConfigPatch::default()
        })
        .unwrap();
        r.draw(&synthetic_packet(80, 30, 3)).unwrap();
        let snap = r.surface().unwrap().snapshot();
        assert_eq!((snap.width, snap.height), (80, 30), "{}", kind);
        assert_eq!(snap.pixels.len(), 80 * 30 * 4);
    }
}

#[tokio::test]
async fn test_overlay_darkens_bottom() {
    for &kind in RendererKind::all() {
        let Some(mut r) = init_renderer(kind, 32, 32, false) else {
            continue;
        };
        let mut packet = synthetic_packet(32, 32, 0);
        r.update_config(&RendererConfigPatch {
            background: Some([0.5, 0.5, 0.5, 1.0]),
            ..RendererConfigPatch::default()
        })
        .unwrap();
        packet.overlay = bottom_fade();
        r.draw(&packet).unwrap();
        let snap = r.surface().unwrap().snapshot();
        let top = snap.pixel(16, 0).unwrap();
        let bottom = snap.pixel(16, 31).unwrap();
        assert!(bottom[0] + 40 < top[0], "{}: top {:?} bottom {:?}", kind, top, bottom);
    }
}

#[tokio::test]
async fn test_glow_adds_light() {
    for &kind in RendererKind::all() {
        let (Some(mut sharp), Some(mut glow)) = (init_renderer(kind, 96, 48, false), init_renderer(kind, 96, 48, true))
        else {
            continue;
        };
        let packet = synthetic_packet(96, 48, 3);
        sharp.draw(&packet).unwrap();
        glow.draw(&packet).unwrap();
        let a = total_brightness(&sharp.surface().unwrap().snapshot());
        let b = total_brightness(&glow.surface().unwrap().snapshot());
        assert!(b > a, "{}: glow {} <= sharp {}", kind, b, a);
    }
}

#[test]
fn test_draw_before_init_is_error_for_all_kinds() {
    for &kind in RendererKind::all() {
        let mut r = renderer_for_kind(kind);
        assert!(matches!(
            r.draw(&FramePacket::empty(8, 8)),
            Err(RenderError::NotInitialized)
        ));
        assert!(r.dispose().is_none());
    }
}

// ==================== Factory ====================

#[test]
fn test_factory_forced_canvas() {
    let r = create_renderer_with(
        &cpu_caps(),
        OffscreenSurface::new(20, 10, 1.0),
        test_config(20, 10, false),
        &canvas_factory(),
    )
    .unwrap();
    assert_eq!(r.kind(), RendererKind::Canvas2d);
}

#[test]
fn test_factory_rejects_without_capable_renderer() {
    let caps = Capabilities {
        offscreen: false,
        ..Capabilities::cpu_only()
    };
    let err = create_renderer_with(
        &caps,
        OffscreenSurface::new(20, 10, 1.0),
        test_config(20, 10, false),
        &canvas_factory(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, RenderError::NoCapableRenderer { .. }));
    assert!(err.to_string().contains("none"));
}

#[test]
fn test_factory_forced_gpu_downgrades_on_cpu_machine() {
    let opts = FactoryOptions {
        force: Some(RendererKind::WebGl2),
        allow_canvas_fallback: true,
        ..FactoryOptions::default()
    };
    let r = create_renderer_with(
        &cpu_caps(),
        OffscreenSurface::new(20, 10, 1.0),
        test_config(20, 10, false),
        &opts,
    )
    .unwrap();
    assert_eq!(r.kind(), RendererKind::Canvas2d);
}

#[test]
fn test_snapshot_png_export() {
    let mut r = init_renderer(RendererKind::Canvas2d, 24, 12, false).unwrap();
    r.draw(&synthetic_packet(24, 12, 1)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    r.surface().unwrap().snapshot().save_png(&path).unwrap();
    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (24, 12));
}
