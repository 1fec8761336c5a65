//! Two-pass separable Gaussian blur for the glow layer.
//!
//! Horizontal pass: source -> scratch. Vertical pass: scratch -> output.
//! Each direction owns its uniform buffer; both passes are recorded into one
//! encoder, so a shared buffer would only carry the last write.

use wgpu::{BindGroupLayout, Buffer, Device, Queue, RenderPipeline, Sampler, TextureFormat, TextureView};

use super::layouts::create_blur_layout;
use super::pipelines::{create_fullscreen_pipeline, create_linear_sampler, create_pipeline_layout, create_shader};
use super::textures::RenderTarget;
use crate::render::canvas::gaussian_kernel;

/// Largest kernel radius the shader's weight table holds.
pub const MAX_BLUR_RADIUS: usize = 63;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurUniforms {
    direction: [f32; 2],
    texel_size: [f32; 2],
    params: [f32; 4],
    weights: [[f32; 4]; 16],
}

impl BlurUniforms {
    fn new(direction: [f32; 2], width: u32, height: u32, kernel: &[f32]) -> Self {
        let mut weights = [[0.0f32; 4]; 16];
        for (i, w) in kernel.iter().take(MAX_BLUR_RADIUS + 1).enumerate() {
            weights[i / 4][i % 4] = *w;
        }
        Self {
            direction,
            texel_size: [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32],
            params: [(kernel.len().saturating_sub(1)) as f32, 0.0, 0.0, 0.0],
            weights,
        }
    }
}

pub struct SeparableBlur {
    pipeline: RenderPipeline,
    layout: BindGroupLayout,
    horizontal_uniforms: Buffer,
    vertical_uniforms: Buffer,
    sampler: Sampler,
    scratch: RenderTarget,
    output: RenderTarget,
    width: u32,
    height: u32,
    sigma: f32,
}

impl SeparableBlur {
    pub fn new(device: &Device, format: TextureFormat, width: u32, height: u32) -> Self {
        let shader = create_shader(device, "blur_shader", include_str!("shaders/blur.wgsl"));
        let layout = create_blur_layout(device);
        let pipeline_layout = create_pipeline_layout(device, "blur_pipeline_layout", &[&layout]);
        let pipeline = create_fullscreen_pipeline(device, "blur_pipeline", &pipeline_layout, &shader, format);

        let uniform_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<BlurUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        Self {
            pipeline,
            layout,
            horizontal_uniforms: uniform_buffer("blur_uniforms_h"),
            vertical_uniforms: uniform_buffer("blur_uniforms_v"),
            sampler: create_linear_sampler(device, "blur_sampler"),
            scratch: RenderTarget::for_layer(device, "blur_scratch", width, height, format),
            output: RenderTarget::for_layer(device, "blur_output", width, height, format),
            width,
            height,
            sigma: -1.0,
        }
    }

    /// Blurred result of the last [`apply`](Self::apply).
    pub fn output_view(&self) -> &TextureView {
        self.output.view()
    }

    /// Upload kernel weights when `sigma` (device pixels) changed.
    pub fn set_sigma(&mut self, queue: &Queue, sigma: f32) {
        if (sigma - self.sigma).abs() < f32::EPSILON {
            return;
        }
        self.sigma = sigma;
        let kernel = gaussian_kernel(sigma, MAX_BLUR_RADIUS);
        let h = BlurUniforms::new([1.0, 0.0], self.width, self.height, &kernel);
        let v = BlurUniforms::new([0.0, 1.0], self.width, self.height, &kernel);
        queue.write_buffer(&self.horizontal_uniforms, 0, bytemuck::bytes_of(&h));
        queue.write_buffer(&self.vertical_uniforms, 0, bytemuck::bytes_of(&v));
        log::debug!("Blur kernel: sigma={:.2}px radius={}", sigma, kernel.len() - 1);
    }

    /// Record both blur passes reading from `source`.
    pub fn apply(&self, device: &Device, encoder: &mut wgpu::CommandEncoder, source: &TextureView) {
        self.run_pass(device, encoder, &self.horizontal_uniforms, source, self.scratch.view(), "blur_h");
        self.run_pass(device, encoder, &self.vertical_uniforms, self.scratch.view(), self.output.view(), "blur_v");
    }

    fn run_pass(
        &self,
        device: &Device,
        encoder: &mut wgpu::CommandEncoder,
        uniforms: &Buffer,
        input_view: &TextureView,
        output_view: &TextureView,
        label: &'static str,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_packing() {
        let kernel = gaussian_kernel(3.0, MAX_BLUR_RADIUS);
        let u = BlurUniforms::new([1.0, 0.0], 200, 100, &kernel);
        assert_eq!(u.params[0], (kernel.len() - 1) as f32);
        assert_eq!(u.weights[0][0], kernel[0]);
        assert_eq!(u.weights[1][1], kernel[5]);
        assert_eq!(u.texel_size, [0.005, 0.01]);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 288);
    }

    #[test]
    fn test_large_sigma_fits_table() {
        let kernel = gaussian_kernel(40.0, MAX_BLUR_RADIUS);
        let u = BlurUniforms::new([0.0, 1.0], 10, 10, &kernel);
        assert_eq!(u.params[0], MAX_BLUR_RADIUS as f32);
        assert!(u.weights[15][3] > 0.0);
    }
}
