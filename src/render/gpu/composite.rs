//! Final composite: background, glow, sharp threads and overlay in one pass.

use wgpu::{BindGroupLayout, Buffer, Device, Queue, RenderPipeline, Sampler, TextureFormat, TextureView};

use super::layouts::create_composite_layout;
use super::pipelines::{create_fullscreen_pipeline, create_linear_sampler, create_pipeline_layout, create_shader};
use crate::frame::{OverlayGradient, MAX_COLOR_STOPS};
use crate::render::RendererConfig;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniforms {
    pub background: [f32; 4],
    pub overlay_colors: [[f32; 4]; MAX_COLOR_STOPS],
    pub overlay_offsets: [f32; 4],
    /// glow alpha, glow enabled, overlay stop count, unused.
    pub params: [f32; 4],
}

impl CompositeUniforms {
    pub fn new(config: &RendererConfig, overlay: &OverlayGradient) -> Self {
        let mut u = Self {
            background: config.background,
            ..Default::default()
        };
        let stops = &overlay.stops[..overlay.stops.len().min(MAX_COLOR_STOPS)];
        if overlay.stops.len() > MAX_COLOR_STOPS {
            log::warn!("Overlay has {} stops, using the first {}", overlay.stops.len(), MAX_COLOR_STOPS);
        }
        for (i, stop) in stops.iter().enumerate() {
            u.overlay_colors[i] = stop.color;
            u.overlay_offsets[i] = stop.offset;
        }
        u.params = [
            config.glow_alpha,
            if config.blur_active() { 1.0 } else { 0.0 },
            stops.len() as f32,
            0.0,
        ];
        u
    }
}

pub struct CompositePipeline {
    pipeline: RenderPipeline,
    layout: BindGroupLayout,
    uniform_buffer: Buffer,
    sampler: Sampler,
}

impl CompositePipeline {
    pub fn new(device: &Device, format: TextureFormat) -> Self {
        let shader = create_shader(device, "composite_shader", include_str!("shaders/composite.wgsl"));
        let layout = create_composite_layout(device);
        let pipeline_layout = create_pipeline_layout(device, "composite_pipeline_layout", &[&layout]);
        let pipeline = create_fullscreen_pipeline(device, "composite_pipeline", &pipeline_layout, &shader, format);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("composite_uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            layout,
            uniform_buffer,
            sampler: create_linear_sampler(device, "composite_sampler"),
        }
    }

    /// Record the composite into `output`. With blur off pass the sharp view as `glow`.
    pub fn apply(
        &self,
        device: &Device,
        queue: &Queue,
        encoder: &mut wgpu::CommandEncoder,
        uniforms: &CompositeUniforms,
        sharp: &TextureView,
        glow: &TextureView,
        output: &TextureView,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(sharp),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(glow),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
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
