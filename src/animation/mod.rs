//! Thread animation: flip scheduling, interpolation and the animation worker.
//!
//! [`Animator`] is the pure simulation: fed monotonic timestamps it produces
//! [`FramePacket`](crate::frame::FramePacket)s. [`AnimationWorker`] runs an
//! animator plus the active renderer on a dedicated thread, driven by
//! [`AnimationCommand`] messages.

mod animator;
mod interpolation;
mod params;
mod scheduler;
mod state;
mod worker;

pub use animator::{Animator, Viewport};
pub use interpolation::{decelerate, ease_in_out, eased_progress, end_envelope, interpolate_points, Oscillation};
pub use params::*;
pub use scheduler::FlipScheduler;
pub use state::{Pose, ThreadRuntime};
pub use worker::{AnimationCommand, AnimationEvent, AnimationWorker, InitMessage, WorkerErrorReport};
