//! Off-thread thread generation with a synchronous fallback.

mod generator;

use std::time::Duration;

pub use generator::{
    generate_with_fallback, GeneratorRequest, GeneratorResponse, PendingGeneration, ThreadGenerationWorker,
    ThreadSource, GENERATOR_TIMEOUT,
};

/// Errors from worker threads and their channels.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Worker channel disconnected")]
    Disconnected,
    #[error("Worker did not respond within {0:?}")]
    Timeout(Duration),
}
