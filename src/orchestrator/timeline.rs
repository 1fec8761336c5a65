//! Main-thread controller for the timeline threads background.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::profile::{compute_performance_profile, DeviceSignals, PerformanceProfile};
use super::state::OrchestratorState;
use crate::animation::{AnimationEvent, AnimationWorker, InitMessage, WorkerErrorReport};
use crate::config::{ResolvedParams, ThreadControlParams};
use crate::render::{
    Capabilities, FactoryOptions, OffscreenSurface, RendererConfig, RendererConfigPatch, RendererKind, SurfaceSnapshot,
};
use crate::threads::{generate_worker_threads, WorkerThreadInput};
use crate::workers::{PendingGeneration, ThreadGenerationWorker, ThreadSource, WorkerError, GENERATOR_TIMEOUT};

/// Observable change in the visualization, for debug tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum MutationReport {
    ProfileChanged {
        profile: PerformanceProfile,
    },
    ThreadsRegenerated {
        count: u32,
        source: ThreadSource,
    },
    RendererSelected {
        kind: RendererKind,
    },
    RendererUnavailable {
        reason: String,
    },
    StateChanged {
        from: OrchestratorState,
        to: OrchestratorState,
    },
}

/// Callback receiving every [`MutationReport`].
pub type MutationReporter = Arc<dyn Fn(&MutationReport) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Invalid state transition {from} -> {to}")]
    InvalidTransition {
        from: OrchestratorState,
        to: OrchestratorState,
    },
    #[error("Timeline is already mounted")]
    AlreadyMounted,
    #[error("Timeline is not mounted")]
    NotMounted,
    #[error("Timeline has been disposed")]
    Disposed,
    #[error("No renderer available: {0}")]
    RendererUnavailable(String),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Options for [`TimelineThreads`].
#[derive(Clone)]
pub struct TimelineOptions {
    /// Debug overrides layered over the computed profile.
    pub overrides: ThreadControlParams,
    pub factory: FactoryOptions,
    /// Detected on the animation worker when `None`.
    pub capabilities: Option<Capabilities>,
    pub reporter: Option<MutationReporter>,
    /// Background, glow alpha and curve quality. Size and blur come from the profile.
    pub base_config: RendererConfig,
    pub generator_timeout: Duration,
    /// How long the renderer may take to come up before the timeline hides.
    pub renderer_timeout: Duration,
    /// Parallax offset per scrolled pixel.
    pub parallax_factor: f32,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            overrides: ThreadControlParams::default(),
            factory: FactoryOptions::default(),
            capabilities: None,
            reporter: None,
            base_config: RendererConfig::default(),
            generator_timeout: GENERATOR_TIMEOUT,
            renderer_timeout: Duration::from_secs(10),
            parallax_factor: 0.2,
        }
    }
}

impl TimelineOptions {
    pub fn with_reporter(mut self, reporter: impl Fn(&MutationReport) + Send + Sync + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }
}

impl std::fmt::Debug for TimelineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineOptions")
            .field("overrides", &self.overrides)
            .field("factory", &self.factory)
            .field("capabilities", &self.capabilities)
            .field("reporter", &self.reporter.is_some())
            .field("base_config", &self.base_config)
            .field("generator_timeout", &self.generator_timeout)
            .field("renderer_timeout", &self.renderer_timeout)
            .field("parallax_factor", &self.parallax_factor)
            .finish()
    }
}

/// Sleep between polls in [`TimelineThreads::wait_for_renderer`].
const READY_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// The animated background, from device detection to teardown.
///
/// Nothing here blocks the host: thread generation and renderer start-up run
/// on workers and are picked up by [`tick`](TimelineThreads::tick). Headless
/// hosts that want to wait can call
/// [`wait_for_renderer`](TimelineThreads::wait_for_renderer).
///
/// ```no_run
/// use std::time::Duration;
/// use timeline_threads::{DeviceSignals, TimelineOptions, TimelineThreads};
///
/// let mut timeline = TimelineThreads::new(TimelineOptions::default());
/// if timeline.mount(DeviceSignals::viewport(1280.0, 720.0, 1.0)).is_ok() {
///     timeline.notify_page_ready();
///     for frame in 0..60 {
///         timeline.tick(frame as f64 * 16.7);
///     }
/// }
/// let _ = timeline.wait_for_renderer(Duration::from_secs(1));
/// timeline.dispose();
/// ```
pub struct TimelineThreads {
    options: TimelineOptions,
    state: OrchestratorState,
    signals: DeviceSignals,
    profile: Option<PerformanceProfile>,
    resolved: Option<ResolvedParams>,
    /// Last generated batch. Written by generation, read at worker init.
    threads: Vec<WorkerThreadInput>,
    thread_source: Option<ThreadSource>,
    generator: Option<ThreadGenerationWorker>,
    pending_generation: Option<PendingGeneration>,
    /// Surface waiting for the first batch before the renderer starts.
    staged_surface: Option<OffscreenSurface>,
    worker: Option<AnimationWorker>,
    renderer_kind: Option<RendererKind>,
    renderer_deadline: Option<Instant>,
    unavailable_reason: Option<String>,
    page_ready: bool,
    visible: bool,
    pending_signals: Option<DeviceSignals>,
    events: Vec<AnimationEvent>,
    last_error: Option<WorkerErrorReport>,
    parallax_offset: f32,
}

impl TimelineThreads {
    pub fn new(options: TimelineOptions) -> Self {
        Self {
            options,
            state: OrchestratorState::Idle,
            signals: DeviceSignals::default(),
            profile: None,
            resolved: None,
            threads: Vec::new(),
            thread_source: None,
            generator: None,
            pending_generation: None,
            staged_surface: None,
            worker: None,
            renderer_kind: None,
            renderer_deadline: None,
            unavailable_reason: None,
            page_ready: false,
            visible: true,
            pending_signals: None,
            events: Vec::new(),
            last_error: None,
            parallax_offset: 0.0,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn profile(&self) -> Option<&PerformanceProfile> {
        self.profile.as_ref()
    }

    pub fn resolved_params(&self) -> Option<&ResolvedParams> {
        self.resolved.as_ref()
    }

    pub fn threads(&self) -> &[WorkerThreadInput] {
        &self.threads
    }

    pub fn thread_source(&self) -> Option<ThreadSource> {
        self.thread_source
    }

    pub fn renderer_kind(&self) -> Option<RendererKind> {
        self.renderer_kind
    }

    /// Last failure reported by the animation worker.
    pub fn last_error(&self) -> Option<&WorkerErrorReport> {
        self.last_error.as_ref()
    }

    pub fn parallax_offset(&self) -> f32 {
        self.parallax_offset
    }

    /// Whether anything should be shown. False until a renderer is up, and
    /// for good once it turned out to be unavailable.
    pub fn is_rendered(&self) -> bool {
        self.renderer_kind.is_some() && self.state != OrchestratorState::Disposed
    }

    /// Mount on a surface sized to `signals`, generating threads on a worker.
    pub fn mount(&mut self, signals: DeviceSignals) -> Result<(), OrchestratorError> {
        let (width, height) = signals.surface_size();
        let surface = OffscreenSurface::new(width, height, signals.pixel_ratio());
        let generator = match ThreadGenerationWorker::spawn() {
            Ok(worker) => Some(worker),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        };
        self.mount_with(surface, signals, generator)
    }

    /// Mount on an explicit surface with an optional generator worker.
    ///
    /// Returns as soon as generation is requested. With a generator the
    /// timeline stays in [`OrchestratorState::GeneratingThreads`] until the
    /// batch (or the fallback after `generator_timeout`) is picked up by
    /// [`tick`](Self::tick). Without one, threads are generated here and the
    /// renderer is started right away. A renderer failure disposes the
    /// timeline and leaves [`is_rendered`](Self::is_rendered) false.
    pub fn mount_with(
        &mut self,
        surface: OffscreenSurface,
        signals: DeviceSignals,
        generator: Option<ThreadGenerationWorker>,
    ) -> Result<(), OrchestratorError> {
        match self.state {
            OrchestratorState::Idle => {}
            OrchestratorState::Disposed => return Err(OrchestratorError::Disposed),
            _ => return Err(OrchestratorError::AlreadyMounted),
        }
        self.signals = signals;
        self.generator = generator;
        self.transition(OrchestratorState::GeneratingThreads)?;

        let profile = compute_performance_profile(&self.signals);
        self.profile = Some(profile);
        self.report(MutationReport::ProfileChanged { profile });
        self.resolved = Some(self.options.overrides.resolve(&profile));
        self.staged_surface = Some(surface);

        self.start_generation()
    }

    /// Block until the renderer reports ready, fails, or `timeout` passes.
    ///
    /// For headless hosts and tests; interactive hosts just keep calling
    /// [`tick`](Self::tick).
    pub fn wait_for_renderer(&mut self, timeout: Duration) -> Result<RendererKind, OrchestratorError> {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            match (self.state, self.renderer_kind) {
                (OrchestratorState::Disposed, _) => {
                    return Err(OrchestratorError::RendererUnavailable(
                        self.unavailable_reason.clone().unwrap_or_else(|| "timeline disposed".into()),
                    ))
                }
                (OrchestratorState::Idle, _) => return Err(OrchestratorError::NotMounted),
                (_, Some(kind)) => return Ok(kind),
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(OrchestratorError::Worker(WorkerError::Timeout(timeout)));
            }
            std::thread::sleep(READY_POLL_INTERVAL);
        }
    }

    /// Ask the generator for the batch described by the current params.
    ///
    /// Falls back to generating on the calling thread when there is no
    /// generator or it cannot take the request.
    fn start_generation(&mut self) -> Result<(), OrchestratorError> {
        let Some(resolved) = self.resolved.as_ref() else {
            return Ok(());
        };
        let (count, params) = (resolved.thread_count, resolved.generator.clone());

        let requested = self
            .generator
            .as_ref()
            .map(|g| g.request(count, &params, self.options.generator_timeout));
        match requested {
            Some(Ok(pending)) => {
                log::debug!("Requested {} threads (request {})", count, pending.request_id);
                self.pending_generation = Some(pending);
                Ok(())
            }
            Some(Err(e)) => {
                log::warn!("Thread generation worker failed ({}), generating on main thread", e);
                self.generator = None;
                self.pending_generation = None;
                self.finish_generation(generate_worker_threads(count, &params), ThreadSource::MainThreadFallback)
            }
            None => {
                log::warn!("No thread generation worker, generating on main thread");
                self.pending_generation = None;
                self.finish_generation(generate_worker_threads(count, &params), ThreadSource::MainThreadFallback)
            }
        }
    }

    /// Pick up the outstanding batch, or fall back once it is overdue.
    fn poll_generation(&mut self) -> Result<(), OrchestratorError> {
        let (Some(pending), Some(generator)) = (self.pending_generation.as_ref(), self.generator.as_ref()) else {
            return Ok(());
        };
        let (threads, source) = match generator.try_take(pending) {
            Ok(None) => return Ok(()),
            Ok(Some(threads)) => (threads, ThreadSource::Worker),
            Err(e) => {
                log::warn!("Thread generation worker failed ({}), generating on main thread", e);
                let threads = pending.generate_locally();
                if matches!(e, WorkerError::Disconnected) {
                    self.generator = None;
                }
                (threads, ThreadSource::MainThreadFallback)
            }
        };
        self.pending_generation = None;
        self.finish_generation(threads, source)
    }

    fn finish_generation(
        &mut self,
        threads: Vec<WorkerThreadInput>,
        source: ThreadSource,
    ) -> Result<(), OrchestratorError> {
        let Some(resolved) = self.resolved.clone() else {
            return Ok(());
        };
        log::info!("Generated {} threads ({:?})", threads.len(), source);
        self.threads = threads;
        self.thread_source = Some(source);
        self.report(MutationReport::ThreadsRegenerated {
            count: self.threads.len() as u32,
            source,
        });
        self.transition(OrchestratorState::ReadyButNotAnimating)?;

        if let Some(worker) = self.worker.as_ref() {
            if let Err(e) = worker.replace_threads(self.threads.clone(), resolved.animation.clone()) {
                log::warn!("Could not replace animated threads: {}", e);
            }
        } else if let Some(surface) = self.staged_surface.take() {
            self.start_renderer(surface, &resolved)?;
        }
        self.maybe_start();
        Ok(())
    }

    /// Move the surface into a new animation worker. Readiness arrives as an event.
    fn start_renderer(&mut self, surface: OffscreenSurface, resolved: &ResolvedParams) -> Result<(), OrchestratorError> {
        let config = RendererConfig {
            width: surface.width(),
            height: surface.height(),
            pixel_ratio: surface.pixel_ratio(),
            enable_blur: resolved.enable_blur,
            blur_std_deviation: resolved.blur_std_deviation,
            ..self.options.base_config.clone()
        };
        let message = InitMessage {
            surface,
            config,
            threads: self.threads.clone(),
            frame_interval_ms: resolved.frame_interval_ms,
            params: resolved.animation.clone(),
            factory: self.options.factory.clone(),
            capabilities: self.options.capabilities,
        };

        let worker = match AnimationWorker::spawn() {
            Ok(worker) => worker,
            Err(e) => return Err(self.renderer_unavailable(e.to_string())),
        };
        if let Err(e) = worker.init(message) {
            return Err(self.renderer_unavailable(e.to_string()));
        }
        self.renderer_deadline = Some(Instant::now() + self.options.renderer_timeout);
        self.worker = Some(worker);
        Ok(())
    }

    fn renderer_ready(&mut self, kind: RendererKind) {
        log::info!("Timeline threads mounted with {} renderer", kind);
        self.renderer_kind = Some(kind);
        self.renderer_deadline = None;
        self.report(MutationReport::RendererSelected { kind });
        self.maybe_start();
    }

    fn renderer_unavailable(&mut self, reason: String) -> OrchestratorError {
        log::warn!("Hiding timeline threads: {}", reason);
        self.report(MutationReport::RendererUnavailable { reason: reason.clone() });
        self.renderer_kind = None;
        self.unavailable_reason = Some(reason.clone());
        self.dispose();
        OrchestratorError::RendererUnavailable(reason)
    }

    /// The page finished loading; animation may start.
    pub fn notify_page_ready(&mut self) {
        self.page_ready = true;
        self.maybe_start();
    }

    /// Pause when scrolled out of view, resume when back.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        let result = match (self.state, visible) {
            (OrchestratorState::Animating, false) => self.transition(OrchestratorState::Paused),
            (OrchestratorState::Paused, true) => self.transition(OrchestratorState::Animating),
            (OrchestratorState::ReadyButNotAnimating, true) => {
                self.maybe_start();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            log::debug!("{}", e);
        }
    }

    fn maybe_start(&mut self) {
        if self.state == OrchestratorState::ReadyButNotAnimating
            && self.page_ready
            && self.visible
            && self.renderer_kind.is_some()
        {
            let _ = self.transition(OrchestratorState::Animating);
        }
    }

    /// The previous batch keeps animating while a replacement is generated.
    fn animating_previous_batch(&self) -> bool {
        self.state == OrchestratorState::GeneratingThreads
            && self.renderer_kind.is_some()
            && self.page_ready
            && self.visible
    }

    /// Drive one display frame. Returns true when a tick reached the worker.
    ///
    /// Pending profile updates are applied first, so bursts of resize events
    /// cost one recomputation per frame. Finished generation and renderer
    /// start-up are picked up here too; none of it waits.
    pub fn tick(&mut self, now: f64) -> bool {
        if self.state == OrchestratorState::Disposed {
            return false;
        }
        if let Some(signals) = self.pending_signals.take() {
            self.apply_profile_update(signals);
        }
        self.pump();
        if !self.state.is_active() && !self.animating_previous_batch() {
            return false;
        }
        match self.worker.as_mut() {
            Some(worker) => worker.tick(now),
            None => false,
        }
    }

    fn pump(&mut self) {
        if let Err(e) = self.poll_generation() {
            log::debug!("{}", e);
        }
        self.collect_events();
    }

    /// Scroll parallax offset in CSS pixels, independent of the animation state.
    pub fn scroll(&mut self, scroll_y: f32) -> f32 {
        if self.state == OrchestratorState::Disposed {
            return 0.0;
        }
        self.parallax_offset = scroll_y.max(0.0) * self.options.parallax_factor;
        self.parallax_offset
    }

    /// Queue new device signals; applied on the next [`tick`](Self::tick).
    pub fn request_profile_update(&mut self, signals: DeviceSignals) {
        self.pending_signals = Some(signals);
    }

    fn apply_profile_update(&mut self, signals: DeviceSignals) {
        let profile = compute_performance_profile(&signals);
        self.signals = signals;
        let (Some(previous), Some(previous_resolved)) = (self.profile, self.resolved.clone()) else {
            return;
        };
        if profile != previous {
            self.profile = Some(profile);
            self.report(MutationReport::ProfileChanged { profile });
        }
        let resolved = self.options.overrides.resolve(&profile);
        let (width, height) = self.signals.surface_size();
        let pixel_ratio = self.signals.pixel_ratio();

        if let Some(worker) = self.worker.as_ref() {
            let patch = RendererConfigPatch {
                width: Some(width),
                height: Some(height),
                pixel_ratio: Some(pixel_ratio),
                enable_blur: Some(resolved.enable_blur),
                blur_std_deviation: Some(resolved.blur_std_deviation),
                ..RendererConfigPatch::default()
            };
            if let Err(e) = worker.update_config(patch) {
                log::warn!("Could not update renderer config: {}", e);
            }
            if resolved.frame_interval_ms != previous_resolved.frame_interval_ms {
                if let Err(e) = worker.set_frame_interval(resolved.frame_interval_ms) {
                    log::warn!("Could not update frame interval: {}", e);
                }
            }
        } else if let Some(surface) = self.staged_surface.as_mut() {
            surface.set_pixel_ratio(pixel_ratio);
            surface.resize(width, height);
        }

        let regenerate = resolved.thread_count != previous_resolved.thread_count;
        self.resolved = Some(resolved);
        if regenerate {
            self.regenerate();
        }
    }

    /// Request a new batch after a thread count change.
    fn regenerate(&mut self) {
        let Some(count) = self.resolved.as_ref().map(|r| r.thread_count) else {
            return;
        };
        log::info!("Thread count changed to {}, regenerating threads", count);
        if let Err(e) = self.transition(OrchestratorState::GeneratingThreads) {
            log::debug!("{}", e);
            return;
        }
        if let Err(e) = self.start_generation() {
            log::warn!("Regeneration failed: {}", e);
        }
    }

    /// Patch the renderer config directly.
    pub fn update_config(&self, patch: RendererConfigPatch) -> Result<(), OrchestratorError> {
        self.active_worker()?.update_config(patch)?;
        Ok(())
    }

    /// Copy of the rendered surface.
    pub fn snapshot(&self, timeout: Duration) -> Result<Option<SurfaceSnapshot>, OrchestratorError> {
        Ok(self.active_worker()?.snapshot(timeout)?)
    }

    fn active_worker(&self) -> Result<&AnimationWorker, OrchestratorError> {
        match (&self.worker, self.state) {
            (_, OrchestratorState::Disposed) => Err(OrchestratorError::Disposed),
            (Some(worker), _) => Ok(worker),
            (None, _) => Err(OrchestratorError::NotMounted),
        }
    }

    fn collect_events(&mut self) {
        let Some(worker) = self.worker.as_ref() else {
            return;
        };
        for event in worker.poll_events() {
            match &event {
                AnimationEvent::Ready { kind } => self.renderer_ready(*kind),
                AnimationEvent::InitFailed { reason } => {
                    self.renderer_unavailable(reason.clone());
                }
                AnimationEvent::Terminated if self.renderer_kind.is_none() => {
                    self.renderer_unavailable("animation worker terminated".into());
                }
                AnimationEvent::Error(report) => {
                    log::error!(
                        "Animation worker error at {:?}ms on {:?}: {}",
                        report.time_ms,
                        report.renderer,
                        report.message
                    );
                    self.last_error = Some(report.clone());
                }
                AnimationEvent::Terminated => {}
            }
            self.events.push(event);
        }

        let overdue = self.renderer_deadline.is_some_and(|d| Instant::now() >= d);
        if overdue && self.renderer_kind.is_none() && self.state != OrchestratorState::Disposed {
            let reason = format!("renderer did not initialise within {:?}", self.options.renderer_timeout);
            self.renderer_unavailable(reason);
        }
    }

    /// Events from the animation worker since the last call.
    pub fn poll_events(&mut self) -> Vec<AnimationEvent> {
        self.pump();
        std::mem::take(&mut self.events)
    }

    /// Stop the workers and release the surface. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == OrchestratorState::Disposed {
            return;
        }
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
        self.generator = None;
        self.pending_generation = None;
        self.staged_surface = None;
        self.renderer_deadline = None;
        let _ = self.transition(OrchestratorState::Disposed);
    }

    fn transition(&mut self, next: OrchestratorState) -> Result<(), OrchestratorError> {
        let from = self.state;
        if from == next {
            return Ok(());
        }
        if !from.can_transition_to(next) {
            return Err(OrchestratorError::InvalidTransition { from, to: next });
        }
        log::debug!("Timeline state {} -> {}", from, next);
        self.state = next;
        self.report(MutationReport::StateChanged { from, to: next });
        Ok(())
    }

    fn report(&self, report: MutationReport) {
        if let Some(reporter) = &self.options.reporter {
            reporter(&report);
        }
    }
}

impl Drop for TimelineThreads {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::{GeneratorRequest, GeneratorResponse};
    use std::sync::mpsc;
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    fn canvas_options() -> TimelineOptions {
        TimelineOptions {
            capabilities: Some(Capabilities::cpu_only()),
            factory: FactoryOptions {
                allow_canvas_fallback: true,
                ..FactoryOptions::default()
            },
            ..TimelineOptions::default()
        }
    }

    fn recording(options: TimelineOptions) -> (TimelineOptions, Arc<Mutex<Vec<MutationReport>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let options = options.with_reporter(move |r| sink.lock().unwrap().push(r.clone()));
        (options, log)
    }

    fn mounted(options: TimelineOptions) -> TimelineThreads {
        let signals = DeviceSignals::viewport(160.0, 90.0, 1.0);
        let mut t = TimelineThreads::new(options);
        t.mount_with(OffscreenSurface::new(160, 90, 1.0), signals, None).unwrap();
        t.wait_for_renderer(WAIT).unwrap();
        t
    }

    fn silent_generator() -> (
        ThreadGenerationWorker,
        mpsc::Receiver<GeneratorRequest>,
        mpsc::Sender<GeneratorResponse>,
    ) {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        (ThreadGenerationWorker::from_channels(request_tx, response_rx), request_rx, response_tx)
    }

    #[test]
    fn test_mount_waits_for_page_ready() {
        let mut t = mounted(canvas_options());
        assert_eq!(t.state(), OrchestratorState::ReadyButNotAnimating);
        assert_eq!(t.thread_source(), Some(ThreadSource::MainThreadFallback));
        assert!(!t.tick(0.0));
        t.notify_page_ready();
        assert_eq!(t.state(), OrchestratorState::Animating);
        assert!(t.tick(16.0));
        assert!(t.is_rendered());
    }

    #[test]
    fn test_visibility_pauses_ticks() {
        let mut t = mounted(canvas_options());
        t.notify_page_ready();
        t.set_visible(false);
        assert_eq!(t.state(), OrchestratorState::Paused);
        assert!(!t.tick(100.0));
        t.set_visible(true);
        assert_eq!(t.state(), OrchestratorState::Animating);
    }

    #[test]
    fn test_hidden_at_page_ready_starts_on_visible() {
        let mut t = mounted(canvas_options());
        t.set_visible(false);
        t.notify_page_ready();
        assert_eq!(t.state(), OrchestratorState::ReadyButNotAnimating);
        t.set_visible(true);
        assert_eq!(t.state(), OrchestratorState::Animating);
    }

    #[test]
    fn test_no_renderer_hides_timeline() {
        let (options, log) = recording(TimelineOptions {
            capabilities: Some(Capabilities::cpu_only()),
            ..TimelineOptions::default()
        });
        let mut t = TimelineThreads::new(options);
        t.mount_with(OffscreenSurface::new(32, 32, 1.0), DeviceSignals::default(), None)
            .unwrap();
        let result = t.wait_for_renderer(WAIT);
        assert!(matches!(result, Err(OrchestratorError::RendererUnavailable(_))));
        assert!(!t.is_rendered());
        assert_eq!(t.state(), OrchestratorState::Disposed);
        assert!(log
            .lock()
            .unwrap()
            .iter()
            .any(|r| matches!(r, MutationReport::RendererUnavailable { .. })));
    }

    #[test]
    fn test_mount_returns_while_generator_is_silent() {
        let (generator, requests, _responses) = silent_generator();
        let mut t = TimelineThreads::new(TimelineOptions {
            generator_timeout: Duration::from_millis(300),
            ..canvas_options()
        });
        let started = Instant::now();
        t.mount_with(OffscreenSurface::new(64, 32, 1.0), DeviceSignals::viewport(64.0, 32.0, 1.0), Some(generator))
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(t.state(), OrchestratorState::GeneratingThreads);
        assert!(t.threads().is_empty());
        assert!(!t.is_rendered());
        assert!(requests.try_recv().is_ok());

        assert!(!t.tick(0.0));
        assert_eq!(t.state(), OrchestratorState::GeneratingThreads);

        assert_eq!(t.wait_for_renderer(WAIT).unwrap(), RendererKind::Canvas2d);
        assert_eq!(t.thread_source(), Some(ThreadSource::MainThreadFallback));
        assert_eq!(t.state(), OrchestratorState::ReadyButNotAnimating);
    }

    #[test]
    fn test_worker_batch_arrives_through_tick() {
        let (generator, requests, responses) = silent_generator();
        let mut t = TimelineThreads::new(canvas_options());
        t.mount_with(OffscreenSurface::new(64, 32, 1.0), DeviceSignals::viewport(64.0, 32.0, 1.0), Some(generator))
            .unwrap();

        let Ok(GeneratorRequest::GenerateThreads {
            request_id,
            count,
            params,
        }) = requests.try_recv()
        else {
            panic!("no generation request");
        };
        responses
            .send(GeneratorResponse::ThreadsGenerated {
                request_id,
                threads: generate_worker_threads(count, &params),
            })
            .unwrap();

        t.tick(0.0);
        assert_eq!(t.thread_source(), Some(ThreadSource::Worker));
        assert_eq!(t.threads().len(), count as usize);
        assert_eq!(t.state(), OrchestratorState::ReadyButNotAnimating);
    }

    #[test]
    fn test_regeneration_does_not_block_tick() {
        let (generator, _requests, _responses) = silent_generator();
        let mut t = TimelineThreads::new(TimelineOptions {
            generator_timeout: Duration::from_millis(300),
            ..canvas_options()
        });
        t.mount_with(OffscreenSurface::new(160, 90, 1.0), DeviceSignals::viewport(160.0, 90.0, 1.0), Some(generator))
            .unwrap();
        t.wait_for_renderer(WAIT).unwrap();
        t.notify_page_ready();
        assert_eq!(t.state(), OrchestratorState::Animating);
        let before = t.threads().len();

        t.request_profile_update(DeviceSignals::viewport(1600.0, 900.0, 1.0));
        let started = Instant::now();
        assert!(t.tick(16.0), "previous batch keeps animating");
        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(t.state(), OrchestratorState::GeneratingThreads);
        assert_eq!(t.threads().len(), before);

        let deadline = Instant::now() + WAIT;
        let mut now = 16.0;
        while t.state() != OrchestratorState::Animating && Instant::now() < deadline {
            now += 16.0;
            t.tick(now);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(t.state(), OrchestratorState::Animating);
        assert_ne!(t.threads().len(), before);
        assert_eq!(t.thread_source(), Some(ThreadSource::MainThreadFallback));
    }

    #[test]
    fn test_mount_twice_rejected() {
        let mut t = mounted(canvas_options());
        let again = t.mount_with(OffscreenSurface::new(8, 8, 1.0), DeviceSignals::default(), None);
        assert!(matches!(again, Err(OrchestratorError::AlreadyMounted)));
    }

    #[test]
    fn test_thread_count_change_regenerates() {
        let (options, log) = recording(canvas_options());
        let mut t = mounted(options);
        t.notify_page_ready();
        let before = t.threads().len();

        t.request_profile_update(DeviceSignals::viewport(1600.0, 900.0, 1.0));
        t.tick(0.0);
        assert_ne!(t.threads().len(), before);
        assert_eq!(t.state(), OrchestratorState::Animating);

        let regenerations = log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| matches!(r, MutationReport::ThreadsRegenerated { .. }))
            .count();
        assert_eq!(regenerations, 2);
    }

    #[test]
    fn test_same_thread_count_only_patches_config() {
        let (options, log) = recording(canvas_options());
        let mut t = mounted(options);
        t.notify_page_ready();
        let threads = t.threads().to_vec();

        t.request_profile_update(DeviceSignals::viewport(200.0, 120.0, 1.0));
        t.tick(0.0);
        assert_eq!(t.threads(), threads.as_slice());
        let snap = t.snapshot(WAIT).unwrap().unwrap();
        assert_eq!((snap.width, snap.height), (200, 120));
        let regenerations = log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| matches!(r, MutationReport::ThreadsRegenerated { .. }))
            .count();
        assert_eq!(regenerations, 1);
    }

    #[test]
    fn test_scroll_parallax() {
        let mut t = mounted(canvas_options());
        assert!((t.scroll(100.0) - 20.0).abs() < 1e-4);
        t.set_visible(false);
        assert!((t.scroll(50.0) - 10.0).abs() < 1e-4);
        t.dispose();
        assert_eq!(t.scroll(50.0), 0.0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (options, log) = recording(canvas_options());
        let mut t = mounted(options);
        t.dispose();
        t.dispose();
        assert!(!t.tick(0.0));
        assert!(matches!(t.snapshot(WAIT), Err(OrchestratorError::Disposed)));
        let disposals = log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    MutationReport::StateChanged {
                        to: OrchestratorState::Disposed,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(disposals, 1);
    }

    #[test]
    fn test_report_serializes_with_tag() {
        let json = serde_json::to_string(&MutationReport::RendererSelected {
            kind: RendererKind::Canvas2d,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"rendererSelected\""));
    }
}
