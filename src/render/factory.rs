//! Capability detection and renderer selection.

use std::sync::OnceLock;

use super::gpu::GpuContext;
use super::{renderer_for_kind, OffscreenSurface, RenderError, Renderer, RendererConfig, RendererKind};

/// What the current machine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Owned offscreen surfaces can be handed to a worker thread.
    pub offscreen: bool,
    pub webgl2: bool,
    pub webgl: bool,
    pub canvas2d: bool,
}

impl Capabilities {
    /// Probe wgpu adapters once per process.
    pub fn detect() -> Self {
        static DETECTED: OnceLock<Capabilities> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            let caps = Capabilities {
                offscreen: true,
                webgl2: GpuContext::probe(RendererKind::WebGl2),
                webgl: GpuContext::probe(RendererKind::WebGl),
                canvas2d: true,
            };
            log::info!("Renderer capabilities: {:?}", caps);
            caps
        })
    }

    /// Software only, no GPU adapters.
    pub fn cpu_only() -> Self {
        Self {
            offscreen: true,
            webgl2: false,
            webgl: false,
            canvas2d: true,
        }
    }

    pub fn supports(&self, kind: RendererKind) -> bool {
        self.offscreen
            && match kind {
                RendererKind::WebGl2 => self.webgl2,
                RendererKind::WebGl => self.webgl,
                RendererKind::Canvas2d => self.canvas2d,
            }
    }
}

/// Caller preferences for [`create_renderer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactoryOptions {
    /// Requested kind. Downgraded with a warning when unsupported or when it fails.
    pub force: Option<RendererKind>,
    /// Kind tried first when supported.
    pub prefer: Option<RendererKind>,
    /// Let automatic selection end at the CPU renderer.
    pub allow_canvas_fallback: bool,
}

impl FactoryOptions {
    fn canvas_allowed(&self) -> bool {
        self.allow_canvas_fallback
            || self.force == Some(RendererKind::Canvas2d)
            || self.prefer == Some(RendererKind::Canvas2d)
    }
}

/// Kinds to try, in order.
pub fn selection_order(caps: &Capabilities, options: &FactoryOptions) -> Vec<RendererKind> {
    let mut order = Vec::new();

    if let Some(kind) = options.force {
        if caps.supports(kind) {
            order.push(kind);
        } else {
            log::warn!("Forced renderer {} is not supported, downgrading", kind);
        }
    } else if let Some(kind) = options.prefer {
        if caps.supports(kind) {
            order.push(kind);
        } else {
            log::debug!("Preferred renderer {} is not supported", kind);
        }
    }

    for &kind in RendererKind::all() {
        if order.contains(&kind) || !caps.supports(kind) {
            continue;
        }
        if kind == RendererKind::Canvas2d && !options.canvas_allowed() {
            continue;
        }
        order.push(kind);
    }
    order
}

/// Create and initialise the best renderer for this machine.
pub fn create_renderer(
    surface: OffscreenSurface,
    config: RendererConfig,
    options: &FactoryOptions,
) -> Result<Box<dyn Renderer>, RenderError> {
    create_renderer_with(&Capabilities::detect(), surface, config, options)
}

/// [`create_renderer`] against explicit capabilities.
pub fn create_renderer_with(
    caps: &Capabilities,
    surface: OffscreenSurface,
    config: RendererConfig,
    options: &FactoryOptions,
) -> Result<Box<dyn Renderer>, RenderError> {
    let order = selection_order(caps, options);
    let mut tried: Vec<&'static str> = Vec::new();
    let mut surface = surface;

    for (i, kind) in order.iter().enumerate() {
        let mut renderer = renderer_for_kind(*kind);
        match renderer.init(surface, config.clone()) {
            Ok(()) => {
                if i > 0 {
                    log::warn!("Using {} renderer after {} failed", kind, tried.join(", "));
                } else {
                    log::info!("Using {} renderer", kind);
                }
                return Ok(renderer);
            }
            Err(e) => {
                log::warn!("{} renderer failed to initialise: {}", kind, e);
                tried.push(kind.name());
                surface = match renderer.dispose() {
                    Some(s) => s,
                    None => break,
                };
            }
        }
    }

    Err(RenderError::NoCapableRenderer {
        tried: if tried.is_empty() {
            "none".to_string()
        } else {
            tried.join(", ")
        },
    })
}
