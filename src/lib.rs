//! Timeline Threads
//!
//! Procedurally generated, animated "thread" background with GPU rendering.
//!
//! # Features
//!
//! - Deterministic thread generation from `(id, total)` via a seeded PRNG
//! - Off-thread generation with a synchronous fallback
//! - Animation worker owning the renderer and an offscreen surface
//! - GPU rendering via wgpu with a separable Gaussian glow
//! - CPU Canvas2D-style renderer for machines without a usable adapter
//! - Device-derived performance profile and lifecycle orchestration

pub mod animation;
pub mod config;
pub mod frame;
pub mod geometry;
pub mod orchestrator;
pub mod render;
pub mod threads;
pub mod workers;

// Re-export commonly used types
pub use animation::{AnimationCommand, AnimationEvent, AnimationParams, AnimationWorker, Animator, Viewport};
pub use config::{ConfigError, ResolvedParams, ThreadControlParams};
pub use frame::{ColorStop, FramePacket, OverlayGradient, ThreadFrame};
pub use orchestrator::{
    compute_performance_profile, DeviceSignals, MutationReport, OrchestratorError, OrchestratorState,
    PerformanceProfile, TimelineOptions, TimelineThreads,
};
pub use render::{
    create_renderer, create_renderer_with, Capabilities, FactoryOptions, OffscreenSurface, RenderError, Renderer,
    RendererConfig, RendererConfigPatch, RendererKind, SurfaceSnapshot,
};
pub use threads::{
    create_thread, create_thread_with, generate_threads, generate_worker_threads, Direction, GeneratorParams,
    ThreadState, WorkerThreadData, WorkerThreadInput,
};
pub use workers::{generate_with_fallback, ThreadGenerationWorker, ThreadSource, WorkerError};
