//! GPU context initialization and management.

use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

use crate::render::RendererKind;

/// Errors that can occur during GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("{0} is not a GPU renderer")]
    NotGpu(RendererKind),
    #[error("Surface {width}x{height} exceeds the device texture limit of {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },
    #[error("Readback failed: {0}")]
    Readback(String),
}

/// GPU context holding device and queue for rendering.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    kind: RendererKind,
}

/// Backends tried for a renderer kind.
fn backends_for(kind: RendererKind) -> Result<wgpu::Backends, GpuError> {
    match kind {
        RendererKind::WebGl2 => Ok(wgpu::Backends::PRIMARY),
        RendererKind::WebGl => Ok(wgpu::Backends::GL),
        RendererKind::Canvas2d => Err(GpuError::NotGpu(kind)),
    }
}

/// Device limits requested for a renderer kind.
fn limits_for(kind: RendererKind) -> wgpu::Limits {
    match kind {
        RendererKind::WebGl => wgpu::Limits::downlevel_webgl2_defaults(),
        _ => wgpu::Limits::default(),
    }
}

impl GpuContext {
    /// Create a headless GPU context for the given renderer class.
    ///
    /// `WebGl2` uses the primary native backends (Vulkan, Metal, DX12),
    /// `WebGl` is restricted to GL with WebGL2-class limits.
    pub async fn new(kind: RendererKind) -> Result<Self, GpuError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: backends_for(kind)?,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("timeline-threads"),
                required_features: wgpu::Features::empty(),
                required_limits: limits_for(kind),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        log::debug!(
            "GPU context for {}: {} ({:?})",
            kind,
            adapter.get_info().name,
            adapter.get_info().backend
        );

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
            kind,
        })
    }

    /// Whether an adapter exists for `kind`, without creating a device.
    pub fn probe(kind: RendererKind) -> bool {
        let Ok(backends) = backends_for(kind) else {
            return false;
        };
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .is_ok()
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn kind(&self) -> RendererKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gpu_context_creation() {
        let ctx = GpuContext::new(RendererKind::WebGl2).await;
        // May fail on CI without GPU, so just check it doesn't panic
        if let Ok(ctx) = ctx {
            let info = ctx.adapter_info();
            assert!(!info.name.is_empty());
            assert_eq!(ctx.kind(), RendererKind::WebGl2);
        }
    }

    #[tokio::test]
    async fn test_canvas_kind_is_rejected() {
        let result = GpuContext::new(RendererKind::Canvas2d).await;
        assert!(matches!(result, Err(GpuError::NotGpu(RendererKind::Canvas2d))));
        assert!(!GpuContext::probe(RendererKind::Canvas2d));
    }
}
