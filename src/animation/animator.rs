//! Frame-by-frame simulation.

use crate::frame::{FramePacket, OverlayGradient, ThreadFrame};
use crate::threads::WorkerThreadInput;

use super::interpolation::{interpolate_points, Oscillation};
use super::params::{AnimationParams, FRAME_INTERVAL_MS};
use super::scheduler::FlipScheduler;
use super::state::ThreadRuntime;

/// Surface geometry frames are produced for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

/// Advances thread state and builds a [`FramePacket`] per accepted tick.
pub struct Animator {
    threads: Vec<ThreadRuntime>,
    params: AnimationParams,
    scheduler: FlipScheduler,
    frame_interval_ms: f64,
    viewport: Viewport,
    overlay: OverlayGradient,
    last_seen: Option<f64>,
    last_frame: Option<f64>,
    frames: u64,
}

impl Animator {
    pub fn new(
        threads: Vec<WorkerThreadInput>,
        params: AnimationParams,
        frame_interval_ms: f64,
        viewport: Viewport,
    ) -> Self {
        Self {
            threads: threads.into_iter().map(ThreadRuntime::new).collect(),
            scheduler: FlipScheduler::new(params.flip_seed),
            params,
            frame_interval_ms: frame_interval_ms.max(0.0),
            viewport,
            overlay: OverlayGradient::default(),
            last_seen: None,
            last_frame: None,
            frames: 0,
        }
    }

    /// Animator with baseline frame interval and default parameters.
    pub fn with_defaults(threads: Vec<WorkerThreadInput>, viewport: Viewport) -> Self {
        Self::new(threads, AnimationParams::default(), FRAME_INTERVAL_MS, viewport)
    }

    pub fn threads(&self) -> &[ThreadRuntime] {
        &self.threads
    }

    pub fn params(&self) -> &AnimationParams {
        &self.params
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames
    }

    pub fn frame_interval_ms(&self) -> f64 {
        self.frame_interval_ms
    }

    pub fn set_frame_interval(&mut self, ms: f64) {
        self.frame_interval_ms = ms.max(0.0);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Swap in a new thread set; traversals restart on the next tick.
    pub fn replace_threads(&mut self, threads: Vec<WorkerThreadInput>, params: AnimationParams) {
        if params.flip_seed != self.params.flip_seed {
            self.scheduler = FlipScheduler::new(params.flip_seed);
        }
        self.threads = threads.into_iter().map(ThreadRuntime::new).collect();
        self.params = params;
        self.last_frame = None;
    }

    /// Advance to `now` and build a frame, or `None` when the tick is gated.
    ///
    /// Ticks closer than the frame interval to the last frame are skipped;
    /// timestamps going backwards are ignored. A long gap simply yields a
    /// larger step.
    pub fn tick(&mut self, now: f64) -> Option<FramePacket> {
        if !now.is_finite() {
            return None;
        }
        if let Some(last) = self.last_seen {
            if now < last {
                log::debug!("Ignoring non-monotonic tick {} < {}", now, last);
                return None;
            }
        }
        self.last_seen = Some(now);

        if let Some(last) = self.last_frame {
            if now - last < self.frame_interval_ms {
                return None;
            }
        }
        self.last_frame = Some(now);

        self.advance(now);
        self.frames += 1;
        Some(self.build_frame(now))
    }

    fn advance(&mut self, now: f64) {
        for t in &mut self.threads {
            if t.started_at.is_none() {
                t.started_at = Some(now);
            }
        }
        self.scheduler.schedule(
            now,
            &mut self.threads,
            self.params.flip_interval_ms,
            self.params.settle_buffer_ms,
            self.params.flip_fraction,
        );
        for t in &mut self.threads {
            t.apply_target(now);
        }
    }

    /// Frame at `now` without advancing state.
    pub fn build_frame(&self, now: f64) -> FramePacket {
        let Viewport {
            width,
            height,
            pixel_ratio,
        } = self.viewport;
        let (w, h) = (width as f32, height as f32);

        let threads = self
            .threads
            .iter()
            .map(|t| {
                let d = &t.data;
                let osc = Oscillation {
                    sway: Oscillation::at(now, d.sway_phase, d.sway_freq, d.sway_amp),
                    drift: Oscillation::at(now, d.drift_phase, d.drift_freq, d.drift_amp),
                };
                let points = interpolate_points(
                    &d.neutral,
                    t.pose_points(t.from_pose),
                    t.pose_points(t.direction.into()),
                    t.progress(now),
                    self.params.pivot_x,
                    self.params.pivot_damping,
                    osc,
                )
                .into_iter()
                .map(|p| [p[0] * w, p[1] * h])
                .collect();

                ThreadFrame {
                    id: d.id,
                    points,
                    stroke_width: d.weight * pixel_ratio,
                    opacity: d.opacity,
                    color_stops: t.color_stops.clone(),
                    gradient_min_y: (t.extent.0 - d.drift_amp) * h,
                    gradient_max_y: (t.extent.1 + d.drift_amp) * h,
                }
            })
            .collect();

        FramePacket {
            width,
            height,
            time_ms: now,
            threads,
            overlay: self.overlay.clone(),
        }
    }
}
