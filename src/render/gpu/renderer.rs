//! Headless GPU thread renderer.

use super::{
    blur::SeparableBlur,
    composite::{CompositePipeline, CompositeUniforms},
    context::{GpuContext, GpuError},
    strokes::{build_batch, StrokePipeline},
    textures::{ReadbackBuffer, RenderTarget},
};
use crate::frame::FramePacket;
use crate::render::{OffscreenSurface, RenderError, Renderer, RendererConfig, RendererConfigPatch, RendererKind};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Size-dependent GPU resources.
struct FrameTargets {
    scene: RenderTarget,
    blur: Option<SeparableBlur>,
    output: RenderTarget,
    readback: ReadbackBuffer,
}

impl FrameTargets {
    fn new(device: &wgpu::Device, config: &RendererConfig) -> Self {
        let (w, h) = (config.width, config.height);
        Self {
            scene: RenderTarget::for_layer(device, "thread_layer", w, h, FORMAT),
            blur: config
                .blur_active()
                .then(|| SeparableBlur::new(device, FORMAT, w, h)),
            output: RenderTarget::for_output(device, "frame_output", w, h, FORMAT),
            readback: ReadbackBuffer::new(device, w, h),
        }
    }
}

/// Reject target sizes the device cannot allocate.
fn check_texture_size(width: u32, height: u32, max: u32) -> Result<(), GpuError> {
    if width > max || height > max {
        return Err(GpuError::TextureTooLarge { width, height, max });
    }
    Ok(())
}

struct GpuState {
    ctx: GpuContext,
    strokes: StrokePipeline,
    composite: CompositePipeline,
    targets: FrameTargets,
}

/// wgpu renderer for [`RendererKind::WebGl2`] and [`RendererKind::WebGl`].
///
/// Threads are stroked into a transparent layer, blurred in two passes when
/// glow is enabled, composited over the background with the overlay, and read
/// back into the owned [`OffscreenSurface`].
pub struct GpuRenderer {
    kind: RendererKind,
    config: Option<RendererConfig>,
    surface: Option<OffscreenSurface>,
    gpu: Option<GpuState>,
}

impl GpuRenderer {
    pub fn new(kind: RendererKind) -> Self {
        Self {
            kind,
            config: None,
            surface: None,
            gpu: None,
        }
    }

    /// Largest texture side the device accepts, once initialised.
    pub fn max_texture_dimension(&self) -> Option<u32> {
        self.gpu.as_ref().map(|g| g.ctx.device.limits().max_texture_dimension_2d)
    }

    /// Adapter backing this renderer, once initialised.
    pub fn adapter_info(&self) -> Option<wgpu::AdapterInfo> {
        self.gpu.as_ref().map(|g| g.ctx.adapter_info())
    }

    fn create_state(&self, config: &RendererConfig) -> Result<GpuState, GpuError> {
        let ctx = pollster::block_on(GpuContext::new(self.kind))?;
        check_texture_size(config.width, config.height, ctx.device.limits().max_texture_dimension_2d)?;
        let strokes = StrokePipeline::new(&ctx.device, FORMAT);
        let composite = CompositePipeline::new(&ctx.device, FORMAT);
        let targets = FrameTargets::new(&ctx.device, config);
        Ok(GpuState {
            ctx,
            strokes,
            composite,
            targets,
        })
    }
}

impl Renderer for GpuRenderer {
    fn kind(&self) -> RendererKind {
        self.kind
    }

    fn init(&mut self, surface: OffscreenSurface, mut config: RendererConfig) -> Result<(), RenderError> {
        if !self.kind.is_gpu() {
            self.surface = Some(surface);
            return Err(RenderError::Unsupported(self.kind));
        }
        if surface.is_empty() {
            self.surface = Some(surface);
            return Err(RenderError::EmptySurface);
        }
        config.width = surface.width();
        config.height = surface.height();
        config.pixel_ratio = surface.pixel_ratio();

        let state = match self.create_state(&config) {
            Ok(state) => state,
            Err(e) => {
                self.surface = Some(surface);
                return Err(e.into());
            }
        };
        log::info!(
            "{} renderer on {} ({}x{}, blur={})",
            self.kind,
            state.ctx.adapter_info().name,
            config.width,
            config.height,
            config.blur_active()
        );
        self.gpu = Some(state);
        self.config = Some(config);
        self.surface = Some(surface);
        Ok(())
    }

    fn draw(&mut self, frame: &FramePacket) -> Result<(), RenderError> {
        let (Some(config), Some(surface), Some(gpu)) = (self.config.as_ref(), self.surface.as_mut(), self.gpu.as_mut())
        else {
            return Err(RenderError::NotInitialized);
        };
        let GpuState {
            ctx,
            strokes,
            composite,
            targets,
        } = gpu;

        let batch = build_batch(&frame.threads, config.curve_subdivisions, config.width, config.height);
        strokes.upload(&ctx.device, &ctx.queue, &batch);
        if let Some(blur) = targets.blur.as_mut() {
            blur.set_sigma(&ctx.queue, config.blur_sigma_px());
        }

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

        strokes.draw(&mut encoder, targets.scene.view());

        let glow_view = match targets.blur.as_ref() {
            Some(blur) => {
                blur.apply(&ctx.device, &mut encoder, targets.scene.view());
                blur.output_view()
            }
            None => targets.scene.view(),
        };

        composite.apply(
            &ctx.device,
            &ctx.queue,
            &mut encoder,
            &CompositeUniforms::new(config, &frame.overlay),
            targets.scene.view(),
            glow_view,
            targets.output.view(),
        );

        targets.readback.copy_from(&mut encoder, targets.output.texture());
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let pixels = targets.readback.read_pixels(&ctx.device)?;
        surface.write_pixels(&pixels)
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
        if let Some(gpu) = self.gpu.as_mut() {
            check_texture_size(next.width, next.height, gpu.ctx.device.limits().max_texture_dimension_2d)?;
            if delta.resized || delta.blur_changed {
                log::debug!("Rebuilding GPU targets at {}x{}", next.width, next.height);
                gpu.targets = FrameTargets::new(&gpu.ctx.device, &next);
            }
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
        self.gpu = None;
        self.config = None;
        self.surface.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_before_init() {
        let mut r = GpuRenderer::new(RendererKind::WebGl2);
        assert!(matches!(
            r.draw(&FramePacket::empty(4, 4)),
            Err(RenderError::NotInitialized)
        ));
    }

    #[test]
    fn test_non_gpu_kind_keeps_surface() {
        let mut r = GpuRenderer::new(RendererKind::Canvas2d);
        let err = r.init(OffscreenSurface::new(8, 8, 1.0), RendererConfig::default());
        assert!(matches!(err, Err(RenderError::Unsupported(RendererKind::Canvas2d))));
        let surface = r.dispose().unwrap();
        assert_eq!(surface.width(), 8);
    }

    #[test]
    fn test_texture_size_check() {
        assert!(check_texture_size(2048, 2048, 2048).is_ok());
        assert!(matches!(
            check_texture_size(2560, 1440, 2048),
            Err(GpuError::TextureTooLarge { width: 2560, max: 2048, .. })
        ));
    }

    #[tokio::test]
    async fn test_resize_past_device_limit_is_rejected() {
        for kind in [RendererKind::WebGl2, RendererKind::WebGl] {
            let mut r = GpuRenderer::new(kind);
            if r.init(OffscreenSurface::new(64, 32, 1.0), RendererConfig::default()).is_err() {
                eprintln!("Skipping test - GPU not available for {}", kind);
                continue;
            }
            let max = r.max_texture_dimension().unwrap();
            let result = r.update_config(&RendererConfigPatch {
                width: Some(max + 1),
                ..Default::default()
            });
            assert!(matches!(result, Err(RenderError::Gpu(GpuError::TextureTooLarge { .. }))));
            assert_eq!(r.config().unwrap().width, 64);
            assert_eq!(r.surface().unwrap().width(), 64);
            r.draw(&FramePacket::empty(64, 32)).unwrap();
        }
    }

    #[tokio::test]
    async fn test_gpu_draw_writes_surface() {
        let mut r = GpuRenderer::new(RendererKind::WebGl2);
        if r.init(OffscreenSurface::new(64, 32, 1.0), RendererConfig::default()).is_err() {
            eprintln!("Skipping test - GPU not available");
            return;
        }
        r.draw(&FramePacket::empty(64, 32)).unwrap();
        let snap = r.surface().unwrap().snapshot();
        let px = snap.pixel(10, 10).unwrap();
        assert_eq!(px[3], 255);
    }
}
