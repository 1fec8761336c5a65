//! GPU rendering using wgpu.
//!
//! Headless: every frame is rendered offscreen and read back into the
//! renderer's [`OffscreenSurface`](crate::render::OffscreenSurface).

mod blur;
mod composite;
pub mod context;
mod layouts;
mod pipelines;
mod renderer;
pub mod strokes;
mod textures;

pub use blur::{SeparableBlur, MAX_BLUR_RADIUS};
pub use composite::{CompositePipeline, CompositeUniforms};
pub use context::{GpuContext, GpuError};
pub use renderer::GpuRenderer;
pub use strokes::{build_batch, expand_polyline, GpuThreadStyle, StrokeBatch, StrokeVertex, MAX_GPU_THREADS};
pub use textures::{ReadbackBuffer, RenderTarget};
