//! Main-thread orchestration: device profiling, lifecycle and worker wiring.

mod profile;
mod state;
mod timeline;

pub use profile::{
    compute_performance_profile, DeviceSignals, EffectiveConnectionType, ParseConnectionTypeError,
    PerformanceProfile, BASE_THREAD_COUNT,
    DEFAULT_BLUR_STD_DEVIATION, MIN_THREAD_COUNT, REDUCED_BLUR_STD_DEVIATION,
};
pub use state::OrchestratorState;
pub use timeline::{MutationReport, MutationReporter, OrchestratorError, TimelineOptions, TimelineThreads};
