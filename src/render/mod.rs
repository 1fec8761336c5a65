//! Renderer abstraction.
//!
//! Every backend implements [`Renderer`]: `init` takes ownership of an
//! [`OffscreenSurface`], `draw` consumes a [`FramePacket`], `update_config`
//! patches settings in place and `dispose` releases GPU/CPU resources.
//! [`create_renderer`] picks the best backend the machine supports.
//!
//! Backends:
//! - [`RendererKind::WebGl2`]: wgpu on the primary native backends
//! - [`RendererKind::WebGl`]: wgpu restricted to GL with WebGL2-class limits
//! - [`RendererKind::Canvas2d`]: tiny-skia CPU rasterizer

pub mod canvas;
mod factory;
pub mod gpu;
mod surface;

pub use canvas::CanvasRenderer;
pub use factory::{create_renderer, create_renderer_with, selection_order, Capabilities, FactoryOptions};
pub use gpu::{GpuError, GpuRenderer, MAX_GPU_THREADS};
pub use surface::{OffscreenSurface, SurfaceSnapshot};

use serde::{Deserialize, Serialize};

use crate::frame::FramePacket;

/// Available renderer implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    WebGl2,
    WebGl,
    Canvas2d,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown renderer kind: {0}")]
pub struct ParseRendererKindError(String);

impl std::str::FromStr for RendererKind {
    type Err = ParseRendererKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "webgl2" | "gpu" => Ok(Self::WebGl2),
            "webgl" | "gl" => Ok(Self::WebGl),
            "canvas2d" | "canvas" | "cpu" => Ok(Self::Canvas2d),
            _ => Err(ParseRendererKindError(s.to_string())),
        }
    }
}

impl RendererKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WebGl2 => "webgl2",
            Self::WebGl => "webgl",
            Self::Canvas2d => "canvas2d",
        }
    }

    /// Preference order, best first.
    pub fn all() -> &'static [Self] {
        &[Self::WebGl2, Self::WebGl, Self::Canvas2d]
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self, Self::WebGl2 | Self::WebGl)
    }
}

impl std::fmt::Display for RendererKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by renderers and the renderer factory.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Renderer used before init")]
    NotInitialized,
    #[error("Renderer {0} is not supported on this device")]
    Unsupported(RendererKind),
    #[error("No capable renderer available (tried: {tried})")]
    NoCapableRenderer { tried: String },
    #[error("Surface has zero size")]
    EmptySurface,
    #[error("Surface size mismatch: expected {expected} bytes, got {actual}")]
    SurfaceSize { expected: usize, actual: usize },
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Could not allocate a {width}x{height} canvas")]
    CanvasAllocation { width: u32, height: u32 },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererConfig {
    /// Surface size in device pixels.
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    /// Opaque background, straight RGBA.
    pub background: [f32; 4],
    pub enable_blur: bool,
    /// Glow blur standard deviation in CSS pixels.
    pub blur_std_deviation: f32,
    /// Opacity of the blurred glow layer.
    pub glow_alpha: f32,
    /// Tessellation steps per bezier span.
    pub curve_subdivisions: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            pixel_ratio: 1.0,
            background: [0.02, 0.03, 0.08, 1.0],
            enable_blur: true,
            blur_std_deviation: 8.0,
            glow_alpha: 0.5,
            curve_subdivisions: 10,
        }
    }
}

impl RendererConfig {
    /// Blur is active only when enabled with a positive deviation.
    pub fn blur_active(&self) -> bool {
        self.enable_blur && self.blur_std_deviation > 0.0
    }

    /// Blur deviation in device pixels.
    pub fn blur_sigma_px(&self) -> f32 {
        self.blur_std_deviation * self.pixel_ratio
    }
}

/// Partial update for a [`RendererConfig`]. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererConfigPatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub pixel_ratio: Option<f32>,
    pub background: Option<[f32; 4]>,
    pub enable_blur: Option<bool>,
    pub blur_std_deviation: Option<f32>,
    pub glow_alpha: Option<f32>,
    pub curve_subdivisions: Option<u32>,
}

/// What a patch changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigDelta {
    pub resized: bool,
    pub blur_changed: bool,
}

impl RendererConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply onto `config`, reporting size and blur changes.
    pub fn apply(&self, config: &mut RendererConfig) -> ConfigDelta {
        let before = config.clone();

        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.pixel_ratio {
            config.pixel_ratio = v.max(0.1);
        }
        if let Some(v) = self.background {
            config.background = v;
        }
        if let Some(v) = self.enable_blur {
            config.enable_blur = v;
        }
        if let Some(v) = self.blur_std_deviation {
            config.blur_std_deviation = v.max(0.0);
        }
        if let Some(v) = self.glow_alpha {
            config.glow_alpha = v.clamp(0.0, 1.0);
        }
        if let Some(v) = self.curve_subdivisions {
            config.curve_subdivisions = v.max(1);
        }

        ConfigDelta {
            resized: before.width != config.width || before.height != config.height,
            blur_changed: before.blur_active() != config.blur_active()
                || before.blur_sigma_px() != config.blur_sigma_px(),
        }
    }
}

/// Common renderer contract.
///
/// `init` takes the surface by value. If `init` fails the renderer still holds
/// the surface and hands it back from `dispose`, so a caller can retry with a
/// different backend.
pub trait Renderer: Send {
    fn kind(&self) -> RendererKind;

    fn init(&mut self, surface: OffscreenSurface, config: RendererConfig) -> Result<(), RenderError>;

    /// Draw one frame into the owned surface.
    fn draw(&mut self, frame: &FramePacket) -> Result<(), RenderError>;

    /// Apply a partial config. Fields not set in `patch` keep their values.
    ///
    /// A patch the backend cannot honour (zero size, beyond device limits) is
    /// rejected and the previous config stays in effect.
    fn update_config(&mut self, patch: &RendererConfigPatch) -> Result<(), RenderError>;

    fn config(&self) -> Option<&RendererConfig>;

    fn surface(&self) -> Option<&OffscreenSurface>;

    /// Release resources and return the surface, if any.
    fn dispose(&mut self) -> Option<OffscreenSurface>;
}

/// Construct an uninitialised renderer of `kind`.
pub fn renderer_for_kind(kind: RendererKind) -> Box<dyn Renderer> {
    match kind {
        RendererKind::WebGl2 | RendererKind::WebGl => Box::new(GpuRenderer::new(kind)),
        RendererKind::Canvas2d => Box::new(CanvasRenderer::new()),
    }
}
