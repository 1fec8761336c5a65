//! CPU fallback renderer with 2D-canvas semantics, drawn with tiny-skia.
//!
//! Threads are stroked as smoothed bezier paths with a vertical gradient and
//! screen compositing. With blur enabled the threads go to a half-resolution
//! layer which is composited twice: once blurred as the glow, once sharp.

mod blur;
mod paint;

pub use blur::{blur_rgba8_premul, gaussian_kernel};
pub use paint::{thread_path, to_skia_color, vertical_gradient};

use tiny_skia::{BlendMode, FilterQuality, LineCap, LineJoin, Paint, Pixmap, PixmapPaint, Rect, Stroke, Transform};

use super::{OffscreenSurface, RenderError, Renderer, RendererConfig, RendererConfigPatch, RendererKind};
use crate::frame::{FramePacket, OverlayGradient, ThreadFrame};

/// Scale of the offscreen thread layer when blur is on.
const GLOW_LAYER_SCALE: f32 = 0.5;

/// Largest blur radius, matching the GPU kernel table.
const MAX_BLUR_RADIUS: usize = 63;

struct Layers {
    main: Pixmap,
    /// Sharp half-resolution threads and their blurred copy.
    glow: Option<(Pixmap, Pixmap)>,
}

impl Layers {
    fn new(config: &RendererConfig) -> Result<Self, RenderError> {
        let alloc = |width: u32, height: u32| {
            Pixmap::new(width, height).ok_or(RenderError::CanvasAllocation { width, height })
        };
        let main = alloc(config.width, config.height)?;
        let glow = if config.blur_active() {
            let w = ((config.width as f32 * GLOW_LAYER_SCALE).ceil() as u32).max(1);
            let h = ((config.height as f32 * GLOW_LAYER_SCALE).ceil() as u32).max(1);
            Some((alloc(w, h)?, alloc(w, h)?))
        } else {
            None
        };
        Ok(Self { main, glow })
    }
}

pub struct CanvasRenderer {
    config: Option<RendererConfig>,
    surface: Option<OffscreenSurface>,
    layers: Option<Layers>,
    scratch: Vec<u8>,
}

impl Default for CanvasRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasRenderer {
    pub fn new() -> Self {
        Self {
            config: None,
            surface: None,
            layers: None,
            scratch: Vec::new(),
        }
    }

    fn stroke_thread(target: &mut Pixmap, thread: &ThreadFrame, scale: f32) {
        if thread.opacity <= 0.0 || thread.stroke_width <= 0.0 {
            return;
        }
        let Some(path) = thread_path(&thread.points, scale) else {
            return;
        };
        let Some(shader) = vertical_gradient(
            &thread.color_stops,
            thread.gradient_min_y * scale,
            thread.gradient_max_y * scale,
            thread.opacity,
        ) else {
            return;
        };
        let paint = Paint {
            shader,
            blend_mode: BlendMode::Screen,
            anti_alias: true,
            ..Paint::default()
        };
        let stroke = Stroke {
            width: thread.stroke_width * scale,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        target.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn fill_overlay(target: &mut Pixmap, overlay: &OverlayGradient) {
        let (w, h) = (target.width() as f32, target.height() as f32);
        let (Some(shader), Some(rect)) = (vertical_gradient(&overlay.stops, 0.0, h, 1.0), Rect::from_xywh(0.0, 0.0, w, h))
        else {
            return;
        };
        let paint = Paint {
            shader,
            blend_mode: BlendMode::SourceOver,
            ..Paint::default()
        };
        target.fill_rect(rect, &paint, Transform::identity(), None);
    }
}

/// Straight RGBA8 bytes of a premultiplied pixmap.
fn demultiplied(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

impl Renderer for CanvasRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Canvas2d
    }

    fn init(&mut self, surface: OffscreenSurface, mut config: RendererConfig) -> Result<(), RenderError> {
        if surface.is_empty() {
            self.surface = Some(surface);
            return Err(RenderError::EmptySurface);
        }
        config.width = surface.width();
        config.height = surface.height();
        config.pixel_ratio = surface.pixel_ratio();
        let layers = match Layers::new(&config) {
            Ok(layers) => layers,
            Err(e) => {
                self.surface = Some(surface);
                return Err(e);
            }
        };
        log::debug!(
            "Canvas2D renderer ready: {}x{} blur={}",
            config.width,
            config.height,
            config.blur_active()
        );
        self.layers = Some(layers);
        self.config = Some(config);
        self.surface = Some(surface);
        Ok(())
    }

    fn draw(&mut self, frame: &FramePacket) -> Result<(), RenderError> {
        let (Some(config), Some(surface), Some(layers)) =
            (self.config.as_ref(), self.surface.as_mut(), self.layers.as_mut())
        else {
            return Err(RenderError::NotInitialized);
        };
        let Layers { main, glow } = layers;

        main.fill(to_skia_color(config.background, 1.0));

        match glow.as_mut() {
            Some((sharp, blurred)) => {
                sharp.fill(tiny_skia::Color::TRANSPARENT);
                for thread in &frame.threads {
                    Self::stroke_thread(sharp, thread, GLOW_LAYER_SCALE);
                }
                blurred.data_mut().copy_from_slice(sharp.data());
                let kernel = gaussian_kernel(config.blur_sigma_px() * GLOW_LAYER_SCALE, MAX_BLUR_RADIUS);
                let (bw, bh) = (blurred.width(), blurred.height());
                blur_rgba8_premul(blurred.data_mut(), &mut self.scratch, bw, bh, &kernel);

                let upscale = Transform::from_scale(
                    main.width() as f32 / sharp.width() as f32,
                    main.height() as f32 / sharp.height() as f32,
                );
                let mut paint = PixmapPaint {
                    opacity: config.glow_alpha,
                    blend_mode: BlendMode::Screen,
                    quality: FilterQuality::Bilinear,
                };
                main.draw_pixmap(0, 0, blurred.as_ref(), &paint, upscale, None);
                paint.opacity = 1.0;
                main.draw_pixmap(0, 0, sharp.as_ref(), &paint, upscale, None);
            }
            None => {
                for thread in &frame.threads {
                    Self::stroke_thread(main, thread, 1.0);
                }
            }
        }

        if frame.overlay.is_visible() {
            Self::fill_overlay(main, &frame.overlay);
        }

        surface.write_pixels(&demultiplied(main))
    }

    fn update_config(&mut self, patch: &RendererConfigPatch) -> Result<(), RenderError> {
        let Some(current) = self.config.as_ref() else {
            return Ok(());
        };
        let mut next = current.clone();
        let delta = patch.apply(&mut next);
        if next.width == 0 || next.height == 0 {
            return Err(RenderError::EmptySurface);
        }
        if delta.resized || delta.blur_changed {
            self.layers = Some(Layers::new(&next)?);
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.set_pixel_ratio(next.pixel_ratio);
            if delta.resized {
                surface.resize(next.width, next.height);
            }
        }
        self.config = Some(next);
        Ok(())
    }

    fn config(&self) -> Option<&RendererConfig> {
        self.config.as_ref()
    }

    fn surface(&self) -> Option<&OffscreenSurface> {
        self.surface.as_ref()
    }

    fn dispose(&mut self) -> Option<OffscreenSurface> {
        self.config = None;
        self.layers = None;
        self.scratch = Vec::new();
        self.surface.take()
    }
}
