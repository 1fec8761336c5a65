//! Render pipeline builders.

use wgpu::{
    BindGroupLayout, ColorTargetState, Device, PipelineLayout, RenderPipeline, ShaderModule,
    TextureFormat, VertexBufferLayout,
};

/// Premultiplied screen blend: `src + dst * (1 - src)` per channel.
pub const SCREEN_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrc,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Builder for creating render pipelines with common patterns.
pub struct RenderPipelineBuilder<'a> {
    label: Option<&'static str>,
    layout: Option<&'a PipelineLayout>,
    shader: &'a ShaderModule,
    vertex_entry: &'static str,
    fragment_entry: &'static str,
    vertex_buffers: Vec<VertexBufferLayout<'static>>,
    format: TextureFormat,
    blend: Option<wgpu::BlendState>,
}

impl<'a> RenderPipelineBuilder<'a> {
    pub fn new(label: &'static str, shader: &'a ShaderModule) -> Self {
        Self {
            label: Some(label),
            layout: None,
            shader,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            vertex_buffers: Vec::new(),
            format: TextureFormat::Rgba8Unorm,
            blend: Some(wgpu::BlendState::REPLACE),
        }
    }

    pub fn layout(mut self, layout: &'a PipelineLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Set the fragment shader entry point only.
    pub fn fragment_entry(mut self, entry: &'static str) -> Self {
        self.fragment_entry = entry;
        self
    }

    pub fn vertex_buffers(mut self, buffers: Vec<VertexBufferLayout<'static>>) -> Self {
        self.vertex_buffers = buffers;
        self
    }

    pub fn format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn blend(mut self, blend: wgpu::BlendState) -> Self {
        self.blend = Some(blend);
        self
    }

    pub fn build(self, device: &Device) -> RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: self.label,
            layout: self.layout,
            vertex: wgpu::VertexState {
                module: self.shader,
                entry_point: Some(self.vertex_entry),
                buffers: &self.vertex_buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: self.shader,
                entry_point: Some(self.fragment_entry),
                targets: &[Some(ColorTargetState {
                    format: self.format,
                    blend: self.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

/// Create a pipeline layout from bind group layouts.
pub fn create_pipeline_layout(
    device: &Device,
    label: &'static str,
    layouts: &[&BindGroupLayout],
) -> PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        immediate_size: 0,
    })
}

/// Fullscreen-triangle pipeline (no vertex buffers, draws 3 vertices).
pub fn create_fullscreen_pipeline(
    device: &Device,
    label: &'static str,
    layout: &PipelineLayout,
    shader: &ShaderModule,
    format: TextureFormat,
) -> RenderPipeline {
    RenderPipelineBuilder::new(label, shader)
        .layout(layout)
        .format(format)
        .build(device)
}

/// Shared linear clamp-to-edge sampler.
pub fn create_linear_sampler(device: &Device, label: &'static str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

/// Create a shader module from WGSL source.
pub fn create_shader(device: &Device, label: &'static str, source: &'static str) -> ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::GpuContext;
    use crate::render::RendererKind;

    #[tokio::test]
    async fn test_pipeline_layout_creation() {
        let ctx = match GpuContext::new(RendererKind::WebGl2).await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let bind_group_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("test"),
                entries: &[],
            });

        let _layout = create_pipeline_layout(&ctx.device, "test_layout", &[&bind_group_layout]);
    }

    #[test]
    fn test_screen_blend_factors() {
        assert_eq!(SCREEN_BLEND.color.dst_factor, wgpu::BlendFactor::OneMinusSrc);
        assert_eq!(SCREEN_BLEND.color.src_factor, wgpu::BlendFactor::One);
    }
}
