//! Deterministic thread generation.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::color::{pick_thread_color, Hsl};
use super::params::*;
use super::profile::{create_path_profile, PathProfile, Point};
use super::rng::SeededRng;

/// Vertical motion state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// A generated thread with everything needed to animate it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState {
    pub id: u32,
    pub color: Hsl,
    pub weight: f32,
    pub opacity: f32,
    pub profile: PathProfile,
    pub direction: Direction,
    pub target_direction: Direction,
    pub duration_up_ms: f32,
    pub duration_down_ms: f32,
    pub sway_phase: f32,
    pub drift_phase: f32,
    pub sway_freq: f32,
    pub drift_freq: f32,
    pub sway_amp: f32,
    pub drift_amp: f32,
}

impl ThreadState {
    /// Traversal time toward `direction`.
    pub fn duration_for(&self, direction: Direction) -> f32 {
        match direction {
            Direction::Up => self.duration_up_ms,
            Direction::Down => self.duration_down_ms,
        }
    }

    /// Traversal time of the current direction.
    pub fn duration_ms(&self) -> f32 {
        self.duration_for(self.direction)
    }
}

/// Deterministic opacity ramp: later threads sit slightly in front.
fn layered_opacity(id: u32, total: u32) -> f32 {
    let t = if total <= 1 {
        1.0
    } else {
        (id.min(total - 1)) as f32 / (total - 1) as f32
    };
    OPACITY_RANGE.0 + (OPACITY_RANGE.1 - OPACITY_RANGE.0) * t
}

/// Create thread `id` of `total` with default parameters.
///
/// # Example
/// ```
/// use timeline_threads::threads::create_thread;
///
/// let a = create_thread(0, 20);
/// let b = create_thread(0, 20);
/// assert_eq!(a, b);
/// ```
pub fn create_thread(id: u32, total: u32) -> ThreadState {
    create_thread_with(id, total, &GeneratorParams::default())
}

/// Create thread `id` of `total`.
pub fn create_thread_with(id: u32, total: u32, params: &GeneratorParams) -> ThreadState {
    let mut rng = SeededRng::for_thread(id);

    let profile = create_path_profile(id, &mut rng, total, params);
    let direction = if rng.chance(params.up_fraction) {
        Direction::Up
    } else {
        Direction::Down
    };
    let color = pick_thread_color(&mut rng);
    let weight = rng.range(WEIGHT_RANGE.0, WEIGHT_RANGE.1);

    let (dmin, dmax) = if params.duration_max_ms >= params.duration_min_ms {
        (params.duration_min_ms, params.duration_max_ms)
    } else {
        (params.duration_max_ms, params.duration_min_ms)
    };
    let duration_up_ms = rng.range(dmin, dmax);
    let duration_down_ms = rng.range(dmin, dmax);

    let sway_phase = rng.range(0.0, TAU);
    let sway_freq = rng.range(SWAY_FREQ_RANGE.0, SWAY_FREQ_RANGE.1);
    let sway_amp = rng.range(SWAY_AMP_RANGE.0, SWAY_AMP_RANGE.1);
    let drift_phase = rng.range(0.0, TAU);
    let drift_freq = rng.range(DRIFT_FREQ_RANGE.0, DRIFT_FREQ_RANGE.1);
    let drift_amp = rng.range(DRIFT_AMP_RANGE.0, DRIFT_AMP_RANGE.1);

    ThreadState {
        id,
        color,
        weight,
        opacity: layered_opacity(id, total),
        profile,
        direction,
        target_direction: direction,
        duration_up_ms,
        duration_down_ms,
        sway_phase,
        drift_phase,
        sway_freq,
        drift_freq,
        sway_amp,
        drift_amp,
    }
}

/// Generate a full batch of `count` threads.
///
/// Guarantees at least one thread moving up by patching the first thread.
pub fn generate_threads(count: u32, params: &GeneratorParams) -> Vec<ThreadState> {
    let mut threads: Vec<ThreadState> = (0..count)
        .map(|id| create_thread_with(id, count, params))
        .collect();
    ensure_up_thread(&mut threads);
    threads
}

fn threads_have_up(threads: &[ThreadState]) -> bool {
    threads.iter().any(|t| t.direction == Direction::Up)
}

/// Patch index 0 to move up if no thread does.
pub fn ensure_up_thread(threads: &mut [ThreadState]) {
    if threads_have_up(threads) {
        return;
    }
    let len = threads.len();
    if let Some(first) = threads.first_mut() {
        log::debug!("No upward thread in batch of {}, patching thread 0", len);
        first.direction = Direction::Up;
        first.target_direction = Direction::Up;
    }
}

/// Flattened, serializable form of a [`ThreadState`] passed between workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerThreadData {
    pub id: u32,
    /// `[h, s, l]`
    pub color: [f32; 3],
    pub weight: f32,
    pub opacity: f32,
    pub neutral: Vec<Point>,
    pub up: Vec<Point>,
    pub down: Vec<Point>,
    pub direction: Direction,
    pub target_direction: Direction,
    pub duration_up_ms: f32,
    pub duration_down_ms: f32,
    pub sway_phase: f32,
    pub drift_phase: f32,
    pub sway_freq: f32,
    pub drift_freq: f32,
    pub sway_amp: f32,
    pub drift_amp: f32,
}

/// Thread descriptor as accepted by the animation worker.
pub type WorkerThreadInput = WorkerThreadData;

impl From<&ThreadState> for WorkerThreadData {
    fn from(t: &ThreadState) -> Self {
        Self {
            id: t.id,
            color: [t.color.h, t.color.s, t.color.l],
            weight: t.weight,
            opacity: t.opacity,
            neutral: t.profile.neutral.clone(),
            up: t.profile.up.clone(),
            down: t.profile.down.clone(),
            direction: t.direction,
            target_direction: t.target_direction,
            duration_up_ms: t.duration_up_ms,
            duration_down_ms: t.duration_down_ms,
            sway_phase: t.sway_phase,
            drift_phase: t.drift_phase,
            sway_freq: t.sway_freq,
            drift_freq: t.drift_freq,
            sway_amp: t.sway_amp,
            drift_amp: t.drift_amp,
        }
    }
}

impl From<ThreadState> for WorkerThreadData {
    fn from(t: ThreadState) -> Self {
        Self::from(&t)
    }
}

impl From<WorkerThreadData> for ThreadState {
    fn from(d: WorkerThreadData) -> Self {
        Self {
            id: d.id,
            color: Hsl {
                h: d.color[0],
                s: d.color[1],
                l: d.color[2],
            },
            weight: d.weight,
            opacity: d.opacity,
            profile: PathProfile {
                neutral: d.neutral,
                up: d.up,
                down: d.down,
            },
            direction: d.direction,
            target_direction: d.target_direction,
            duration_up_ms: d.duration_up_ms,
            duration_down_ms: d.duration_down_ms,
            sway_phase: d.sway_phase,
            drift_phase: d.drift_phase,
            sway_freq: d.sway_freq,
            drift_freq: d.drift_freq,
            sway_amp: d.sway_amp,
            drift_amp: d.drift_amp,
        }
    }
}

impl WorkerThreadData {
    pub fn hsl(&self) -> Hsl {
        Hsl {
            h: self.color[0],
            s: self.color[1],
            l: self.color[2],
        }
    }

    pub fn duration_for(&self, direction: Direction) -> f32 {
        match direction {
            Direction::Up => self.duration_up_ms,
            Direction::Down => self.duration_down_ms,
        }
    }

    /// Profile point sequence for a direction.
    pub fn pose_points(&self, direction: Direction) -> &[Point] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

/// Generate a batch directly in its transferable form.
pub fn generate_worker_threads(count: u32, params: &GeneratorParams) -> Vec<WorkerThreadData> {
    generate_threads(count, params)
        .into_iter()
        .map(WorkerThreadData::from)
        .collect()
}
