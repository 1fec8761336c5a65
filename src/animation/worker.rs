//! Background animation worker.
//!
//! The worker owns the renderer and the [`Animator`]. The host moves an
//! [`OffscreenSurface`] in with [`AnimationCommand::Init`], then drives it
//! with [`AnimationWorker::tick`] once per display frame. Ticks travel through
//! a bounded channel; when the worker is still busy with the previous frame the
//! tick is dropped instead of queued, so a slow renderer never builds a
//! backlog.
//!
//! Renderer calls (init, draw, config updates) run under `catch_unwind`: a
//! panicking renderer is reported as an [`AnimationEvent::Error`] and discarded, and the worker stays responsive to
//! `Snapshot` and `Terminate`.

use std::panic::AssertUnwindSafe;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::animator::{Animator, Viewport};
use super::params::AnimationParams;
use crate::render::{
    create_renderer_with, Capabilities, FactoryOptions, OffscreenSurface, RenderError, Renderer, RendererConfig,
    RendererConfigPatch, RendererKind, SurfaceSnapshot,
};
use crate::threads::WorkerThreadInput;
use crate::workers::WorkerError;

const COMMAND_CAPACITY: usize = 4;

/// Payload of [`AnimationCommand::Init`].
pub struct InitMessage {
    /// Surface moved into the worker. The sender no longer owns it.
    pub surface: OffscreenSurface,
    pub config: RendererConfig,
    pub threads: Vec<WorkerThreadInput>,
    pub frame_interval_ms: f64,
    pub params: AnimationParams,
    pub factory: FactoryOptions,
    /// Detected on the worker when `None`.
    pub capabilities: Option<Capabilities>,
}

/// Command sent to the worker thread.
pub enum AnimationCommand {
    Init(Box<InitMessage>),
    Tick { now: f64 },
    UpdateConfig(RendererConfigPatch),
    /// Swap the thread set. Running traversals restart.
    ReplaceThreads {
        threads: Vec<WorkerThreadInput>,
        params: AnimationParams,
    },
    SetFrameInterval { ms: f64 },
    Snapshot { reply: Sender<Option<SurfaceSnapshot>> },
    Terminate,
}

/// Failure reported by the worker after a successful init.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerErrorReport {
    pub message: String,
    pub renderer: Option<RendererKind>,
    /// Tick timestamp the failure happened on.
    pub time_ms: Option<f64>,
    /// The renderer panicked and was discarded.
    pub fatal: bool,
}

/// Event sent back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum AnimationEvent {
    Ready { kind: RendererKind },
    InitFailed { reason: String },
    Error(WorkerErrorReport),
    Terminated,
}

/// Handle to the animation thread.
pub struct AnimationWorker {
    command_tx: SyncSender<AnimationCommand>,
    event_rx: Receiver<AnimationEvent>,
    handle: Option<JoinHandle<()>>,
    terminated: bool,
    dropped_ticks: u64,
}

impl AnimationWorker {
    pub fn spawn() -> Result<Self, WorkerError> {
        let (command_tx, command_rx) = mpsc::sync_channel::<AnimationCommand>(COMMAND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<AnimationEvent>();

        let handle = thread::Builder::new()
            .name("timeline-animation".into())
            .spawn(move || worker_loop(command_rx, event_tx))
            .map_err(WorkerError::Spawn)?;

        Ok(Self {
            command_tx,
            event_rx,
            handle: Some(handle),
            terminated: false,
            dropped_ticks: 0,
        })
    }

    /// Hand over the surface and start rendering.
    ///
    /// Completion is reported asynchronously as [`AnimationEvent::Ready`] or
    /// [`AnimationEvent::InitFailed`].
    pub fn init(&self, message: InitMessage) -> Result<(), WorkerError> {
        self.send(AnimationCommand::Init(Box::new(message)))
    }

    /// Request a frame at `now`. Returns false when the tick was dropped.
    pub fn tick(&mut self, now: f64) -> bool {
        if self.terminated {
            return false;
        }
        match self.command_tx.try_send(AnimationCommand::Tick { now }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_ticks += 1;
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn update_config(&self, patch: RendererConfigPatch) -> Result<(), WorkerError> {
        self.send(AnimationCommand::UpdateConfig(patch))
    }

    pub fn replace_threads(
        &self,
        threads: Vec<WorkerThreadInput>,
        params: AnimationParams,
    ) -> Result<(), WorkerError> {
        self.send(AnimationCommand::ReplaceThreads { threads, params })
    }

    pub fn set_frame_interval(&self, ms: f64) -> Result<(), WorkerError> {
        self.send(AnimationCommand::SetFrameInterval { ms })
    }

    /// Copy of the current surface contents, waiting at most `timeout`.
    pub fn snapshot(&self, timeout: Duration) -> Result<Option<SurfaceSnapshot>, WorkerError> {
        let (reply, rx) = mpsc::channel();
        self.send(AnimationCommand::Snapshot { reply })?;
        rx.recv_timeout(timeout).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => WorkerError::Timeout(timeout),
            mpsc::RecvTimeoutError::Disconnected => WorkerError::Disconnected,
        })
    }

    /// Drain pending events without blocking.
    pub fn poll_events(&self) -> Vec<AnimationEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Wait for the next event.
    pub fn recv_event(&self, timeout: Duration) -> Option<AnimationEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Ticks dropped because the worker was busy.
    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks
    }

    /// Send `Terminate` and join. Idempotent.
    pub fn shutdown(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        let _ = self.command_tx.send(AnimationCommand::Terminate);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Animation worker thread panicked during shutdown");
            }
        }
    }

    fn send(&self, command: AnimationCommand) -> Result<(), WorkerError> {
        if self.terminated {
            return Err(WorkerError::Disconnected);
        }
        self.command_tx.send(command).map_err(|_| WorkerError::Disconnected)
    }
}

impl Drop for AnimationWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker-side state.
#[derive(Default)]
struct AnimationSession {
    renderer: Option<Box<dyn Renderer>>,
    animator: Option<Animator>,
    /// Reported kind of the last renderer, kept after a fatal error.
    kind: Option<RendererKind>,
}

impl AnimationSession {
    fn init(&mut self, message: InitMessage, events: &Sender<AnimationEvent>) {
        if self.renderer.is_some() {
            log::warn!("Animation worker already initialised, ignoring init");
            return;
        }
        let InitMessage {
            surface,
            config,
            threads,
            frame_interval_ms,
            params,
            factory,
            capabilities,
        } = message;
        let caps = capabilities.unwrap_or_else(Capabilities::detect);

        let created =
            std::panic::catch_unwind(AssertUnwindSafe(|| create_renderer_with(&caps, surface, config, &factory)));
        let renderer = match created {
            Ok(Ok(renderer)) => renderer,
            Ok(Err(e)) => {
                log::error!("Renderer init failed: {}", e);
                let _ = events.send(AnimationEvent::InitFailed { reason: e.to_string() });
                return;
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log::error!("Renderer init panicked: {}", reason);
                let _ = events.send(AnimationEvent::InitFailed { reason });
                return;
            }
        };

        let kind = renderer.kind();
        let viewport = viewport_of(renderer.as_ref());
        log::info!(
            "Animation worker ready: {} renderer, {} threads, {:.1}ms frame interval",
            kind,
            threads.len(),
            frame_interval_ms
        );
        self.animator = Some(Animator::new(threads, params, frame_interval_ms, viewport));
        self.renderer = Some(renderer);
        self.kind = Some(kind);
        let _ = events.send(AnimationEvent::Ready { kind });
    }

    fn tick(&mut self, now: f64, events: &Sender<AnimationEvent>) {
        let (Some(renderer), Some(animator)) = (self.renderer.as_mut(), self.animator.as_mut()) else {
            return;
        };
        let Some(frame) = animator.tick(now) else {
            return;
        };

        match std::panic::catch_unwind(AssertUnwindSafe(|| renderer.draw(&frame))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("Draw failed at {:.1}ms on {}: {}", now, renderer.kind(), e);
                let _ = events.send(AnimationEvent::Error(WorkerErrorReport {
                    message: e.to_string(),
                    renderer: self.kind,
                    time_ms: Some(now),
                    fatal: matches!(e, RenderError::NotInitialized),
                }));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Renderer panicked at {:.1}ms: {}", now, message);
                self.renderer = None;
                self.animator = None;
                let _ = events.send(AnimationEvent::Error(WorkerErrorReport {
                    message,
                    renderer: self.kind,
                    time_ms: Some(now),
                    fatal: true,
                }));
            }
        }
    }

    fn update_config(&mut self, patch: &RendererConfigPatch, events: &Sender<AnimationEvent>) {
        let Some(renderer) = self.renderer.as_mut() else {
            log::debug!("Config update before init ignored");
            return;
        };

        match std::panic::catch_unwind(AssertUnwindSafe(|| renderer.update_config(patch))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("Config update rejected by {}: {}", renderer.kind(), e);
                let _ = events.send(AnimationEvent::Error(WorkerErrorReport {
                    message: e.to_string(),
                    renderer: self.kind,
                    time_ms: None,
                    fatal: false,
                }));
                return;
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Renderer panicked applying config: {}", message);
                self.renderer = None;
                self.animator = None;
                let _ = events.send(AnimationEvent::Error(WorkerErrorReport {
                    message,
                    renderer: self.kind,
                    time_ms: None,
                    fatal: true,
                }));
                return;
            }
        }

        let viewport = viewport_of(renderer.as_ref());
        if let Some(animator) = self.animator.as_mut() {
            animator.set_viewport(viewport);
        }
    }

    fn replace_threads(&mut self, threads: Vec<WorkerThreadInput>, params: AnimationParams) {
        if let Some(animator) = self.animator.as_mut() {
            log::info!("Replacing animated threads ({} threads)", threads.len());
            animator.replace_threads(threads, params);
        }
    }

    fn snapshot(&self) -> Option<SurfaceSnapshot> {
        self.renderer
            .as_ref()
            .and_then(|r| r.surface())
            .map(OffscreenSurface::snapshot)
    }
}

fn viewport_of(renderer: &dyn Renderer) -> Viewport {
    match renderer.config() {
        Some(c) => Viewport {
            width: c.width,
            height: c.height,
            pixel_ratio: c.pixel_ratio,
        },
        None => Viewport {
            width: 0,
            height: 0,
            pixel_ratio: 1.0,
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "renderer panicked".to_string()
    }
}

fn worker_loop(command_rx: Receiver<AnimationCommand>, events: Sender<AnimationEvent>) {
    let mut session = AnimationSession::default();

    while let Ok(command) = command_rx.recv() {
        match command {
            AnimationCommand::Init(message) => session.init(*message, &events),
            AnimationCommand::Tick { now } => session.tick(now, &events),
            AnimationCommand::UpdateConfig(patch) => session.update_config(&patch, &events),
            AnimationCommand::ReplaceThreads { threads, params } => session.replace_threads(threads, params),
            AnimationCommand::SetFrameInterval { ms } => {
                if let Some(animator) = session.animator.as_mut() {
                    animator.set_frame_interval(ms);
                }
            }
            AnimationCommand::Snapshot { reply } => {
                let _ = reply.send(session.snapshot());
            }
            AnimationCommand::Terminate => break,
        }
    }

    if let Some(mut renderer) = session.renderer.take() {
        renderer.dispose();
    }
    log::debug!("Animation worker stopped");
    let _ = events.send(AnimationEvent::Terminated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threads::{generate_worker_threads, GeneratorParams};

    const WAIT: Duration = Duration::from_secs(5);

    fn init_message(width: u32, height: u32) -> InitMessage {
        InitMessage {
            surface: OffscreenSurface::new(width, height, 1.0),
            config: RendererConfig {
                enable_blur: false,
                ..RendererConfig::default()
            },
            threads: generate_worker_threads(8, &GeneratorParams::default()),
            frame_interval_ms: 0.0,
            params: AnimationParams::default(),
            factory: FactoryOptions {
                force: Some(RendererKind::Canvas2d),
                ..FactoryOptions::default()
            },
            capabilities: Some(Capabilities::cpu_only()),
        }
    }

    #[test]
    fn test_init_reports_ready() {
        let worker = AnimationWorker::spawn().unwrap();
        worker.init(init_message(32, 16)).unwrap();
        assert_eq!(
            worker.recv_event(WAIT),
            Some(AnimationEvent::Ready {
                kind: RendererKind::Canvas2d
            })
        );
    }

    #[test]
    fn test_init_failure_reported() {
        let worker = AnimationWorker::spawn().unwrap();
        let mut msg = init_message(32, 16);
        msg.factory = FactoryOptions::default();
        worker.init(msg).unwrap();
        assert!(matches!(worker.recv_event(WAIT), Some(AnimationEvent::InitFailed { .. })));
    }

    #[test]
    fn test_ticks_render_into_surface() {
        let mut worker = AnimationWorker::spawn().unwrap();
        worker.init(init_message(48, 24)).unwrap();
        worker.recv_event(WAIT);

        let blank = worker.snapshot(WAIT).unwrap().unwrap();
        let mut t = 0.0;
        while worker.snapshot(WAIT).unwrap().unwrap().pixels == blank.pixels && t < 5000.0 {
            worker.tick(t);
            t += 50.0;
        }
        assert_ne!(worker.snapshot(WAIT).unwrap().unwrap().pixels, blank.pixels);
    }

    #[test]
    fn test_update_config_resizes_surface() {
        let worker = AnimationWorker::spawn().unwrap();
        worker.init(init_message(32, 16)).unwrap();
        worker.recv_event(WAIT);
        worker
            .update_config(RendererConfigPatch {
                width: Some(64),
                height: Some(20),
                ..Default::default()
            })
            .unwrap();
        let snap = worker.snapshot(WAIT).unwrap().unwrap();
        assert_eq!((snap.width, snap.height), (64, 20));
    }

    #[test]
    fn test_rejected_config_reports_error_and_keeps_rendering() {
        let mut worker = AnimationWorker::spawn().unwrap();
        worker.init(init_message(32, 16)).unwrap();
        worker.recv_event(WAIT);
        worker
            .update_config(RendererConfigPatch {
                width: Some(0),
                ..Default::default()
            })
            .unwrap();

        match worker.recv_event(WAIT) {
            Some(AnimationEvent::Error(report)) => {
                assert!(!report.fatal);
                assert_eq!(report.renderer, Some(RendererKind::Canvas2d));
            }
            other => panic!("expected error event, got {:?}", other),
        }
        assert!(worker.is_alive());
        assert!(worker.tick(0.0));
        let snap = worker.snapshot(WAIT).unwrap().unwrap();
        assert_eq!((snap.width, snap.height), (32, 16));
    }

    #[test]
    fn test_ticks_after_shutdown_ignored() {
        let mut worker = AnimationWorker::spawn().unwrap();
        worker.init(init_message(16, 16)).unwrap();
        worker.shutdown();
        assert!(worker.is_terminated());
        assert!(!worker.tick(100.0));
        assert!(worker.update_config(RendererConfigPatch::default()).is_err());
        let events = worker.poll_events();
        assert_eq!(events.last(), Some(&AnimationEvent::Terminated));
    }

    #[test]
    fn test_snapshot_before_init_is_none() {
        let worker = AnimationWorker::spawn().unwrap();
        assert_eq!(worker.snapshot(WAIT).unwrap(), None);
    }
}
