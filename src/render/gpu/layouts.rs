//! Bind group layouts for the stroke, blur and composite passes.

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, BindingType, Device, ShaderStages};

/// One binding slot; the slot index is its binding number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Uniform,
    Texture,
    Sampler,
}

impl Slot {
    fn binding_type(self) -> BindingType {
        match self {
            Slot::Uniform => BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            Slot::Texture => BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            Slot::Sampler => BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        }
    }
}

fn entries(slots: &[Slot], visibility: ShaderStages) -> Vec<BindGroupLayoutEntry> {
    slots
        .iter()
        .enumerate()
        .map(|(binding, slot)| BindGroupLayoutEntry {
            binding: binding as u32,
            visibility,
            ty: slot.binding_type(),
            count: None,
        })
        .collect()
}

fn layout(device: &Device, label: &'static str, slots: &[Slot], visibility: ShaderStages) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries(slots, visibility),
    })
}

const BLUR_SLOTS: [Slot; 3] = [Slot::Uniform, Slot::Texture, Slot::Sampler];
const COMPOSITE_SLOTS: [Slot; 4] = [Slot::Uniform, Slot::Texture, Slot::Texture, Slot::Sampler];

/// Thread style table, read by both stages.
pub fn create_styles_layout(device: &Device) -> BindGroupLayout {
    layout(
        device,
        "thread_styles_layout",
        &[Slot::Uniform],
        ShaderStages::VERTEX | ShaderStages::FRAGMENT,
    )
}

/// Blur pass: uniforms, input texture, sampler.
pub fn create_blur_layout(device: &Device) -> BindGroupLayout {
    layout(device, "blur_bind_group_layout", &BLUR_SLOTS, ShaderStages::FRAGMENT)
}

/// Composite pass: uniforms, sharp layer, glow layer, sampler.
pub fn create_composite_layout(device: &Device) -> BindGroupLayout {
    layout(device, "composite_bind_group_layout", &COMPOSITE_SLOTS, ShaderStages::FRAGMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::GpuContext;
    use crate::render::RendererKind;

    #[test]
    fn test_composite_bindings_match_shader() {
        let e = entries(&COMPOSITE_SLOTS, ShaderStages::FRAGMENT);
        let bindings: Vec<u32> = e.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2, 3]);
        assert!(matches!(e[2].ty, BindingType::Texture { .. }));
        assert!(matches!(e[3].ty, BindingType::Sampler(_)));
    }

    #[tokio::test]
    async fn test_named_layouts() {
        let ctx = match GpuContext::new(RendererKind::WebGl2).await {
            Ok(ctx) => ctx,
            Err(_) => return, // Skip if no GPU
        };

        let _styles = create_styles_layout(&ctx.device);
        let _blur = create_blur_layout(&ctx.device);
        let _composite = create_composite_layout(&ctx.device);
    }
}
