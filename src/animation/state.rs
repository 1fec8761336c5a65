//! Per-thread runtime state.

use serde::{Deserialize, Serialize};

use crate::frame::{thread_color_stops, ColorStop};
use crate::threads::{Direction, Point, WorkerThreadInput};

/// Shape a traversal starts from or ends at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pose {
    Neutral,
    Up,
    Down,
}

impl From<Direction> for Pose {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Up => Pose::Up,
            Direction::Down => Pose::Down,
        }
    }
}

/// A thread plus where it is in its current traversal.
#[derive(Debug, Clone)]
pub struct ThreadRuntime {
    pub data: WorkerThreadInput,
    pub direction: Direction,
    pub target_direction: Direction,
    pub from_pose: Pose,
    /// Start of the current traversal; `None` until the first tick.
    pub started_at: Option<f64>,
    pub color_stops: Vec<ColorStop>,
    /// Normalized y range over all poses.
    pub extent: (f32, f32),
}

impl ThreadRuntime {
    pub fn new(data: WorkerThreadInput) -> Self {
        let color_stops = thread_color_stops(data.hsl());
        let extent = data
            .neutral
            .iter()
            .chain(&data.up)
            .chain(&data.down)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| (lo.min(p[1]), hi.max(p[1])));
        Self {
            direction: data.direction,
            target_direction: data.target_direction,
            from_pose: Pose::Neutral,
            started_at: None,
            color_stops,
            extent,
            data,
        }
    }

    pub fn pose_points(&self, pose: Pose) -> &[Point] {
        match pose {
            Pose::Neutral => &self.data.neutral,
            Pose::Up => &self.data.up,
            Pose::Down => &self.data.down,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.data.duration_for(self.direction).max(1.0) as f64
    }

    /// Progress of the current traversal, clamped to `[0, 1]`.
    pub fn progress(&self, now: f64) -> f32 {
        match self.started_at {
            Some(start) => ((now - start) / self.duration_ms()).clamp(0.0, 1.0) as f32,
            None => 0.0,
        }
    }

    /// True once the traversal has ended and the settle buffer has passed.
    pub fn can_flip(&self, now: f64, settle_buffer_ms: f64) -> bool {
        match self.started_at {
            Some(start) => now >= start + self.duration_ms() + settle_buffer_ms,
            None => false,
        }
    }

    /// Start a traversal toward `target_direction` if it differs from `direction`.
    pub fn apply_target(&mut self, now: f64) -> bool {
        if self.target_direction == self.direction {
            return false;
        }
        self.from_pose = Pose::from(self.direction);
        self.direction = self.target_direction;
        self.started_at = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threads::{create_thread, WorkerThreadData};

    fn runtime() -> ThreadRuntime {
        ThreadRuntime::new(WorkerThreadData::from(create_thread(2, 10)))
    }

    #[test]
    fn test_initial_traversal_from_neutral() {
        let t = runtime();
        assert_eq!(t.from_pose, Pose::Neutral);
        assert_eq!(t.progress(1000.0), 0.0);
        assert!(!t.can_flip(1e9, 0.0));
    }

    #[test]
    fn test_progress_clamped() {
        let mut t = runtime();
        t.started_at = Some(100.0);
        assert_eq!(t.progress(50.0), 0.0);
        assert_eq!(t.progress(100.0 + t.duration_ms() * 3.0), 1.0);
    }

    #[test]
    fn test_settle_buffer_guards_flip() {
        let mut t = runtime();
        t.started_at = Some(0.0);
        let end = t.duration_ms();
        assert!(!t.can_flip(end + 10.0, 500.0));
        assert!(t.can_flip(end + 500.0, 500.0));
    }

    #[test]
    fn test_apply_target_flips_from_current_pose() {
        let mut t = runtime();
        t.started_at = Some(0.0);
        let before = t.direction;
        t.target_direction = before.opposite();
        assert!(t.apply_target(5000.0));
        assert_eq!(t.direction, before.opposite());
        assert_eq!(t.from_pose, Pose::from(before));
        assert_eq!(t.started_at, Some(5000.0));
        assert!(!t.apply_target(6000.0));
    }
}
