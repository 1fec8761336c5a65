//! Deterministic thread generation.
//!
//! Every thread is a pure function of `(id, total)`: a seeded PRNG stream
//! draws its path profile, initial direction, color, stroke weight, traversal
//! durations and oscillator parameters in a fixed order. Regenerating after a
//! resize therefore reproduces the same threads instead of reshuffling them.

mod color;
mod generator;
mod params;
mod profile;
mod rng;

pub use color::{pick_thread_color, Hsl, PaletteEntry, THREAD_PALETTE};
pub use generator::{
    create_thread, create_thread_with, ensure_up_thread, generate_threads,
    generate_worker_threads, Direction, ThreadState, WorkerThreadData, WorkerThreadInput,
};
pub use params::*;
pub use profile::{create_path_profile, pivot_proximity, PathProfile, Point};
pub use rng::{SeededRng, GOLDEN_RATIO_SEED};
