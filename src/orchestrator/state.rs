//! Orchestrator lifecycle.

use serde::{Deserialize, Serialize};

/// Lifecycle of a mounted visualization.
///
/// ```text
/// Idle -> GeneratingThreads -> ReadyButNotAnimating -> Animating <-> Paused
///                 ^                                        |           |
///                 +------------- thread count change ------+-----------+
/// any -> Disposed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrchestratorState {
    Idle,
    GeneratingThreads,
    ReadyButNotAnimating,
    Animating,
    Paused,
    Disposed,
}

impl OrchestratorState {
    pub fn can_transition_to(self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;
        matches!(
            (self, next),
            (Idle, GeneratingThreads)
                | (GeneratingThreads, ReadyButNotAnimating)
                | (ReadyButNotAnimating, Animating)
                | (ReadyButNotAnimating, GeneratingThreads)
                | (Animating, Paused)
                | (Paused, Animating)
                | (Animating, GeneratingThreads)
                | (Paused, GeneratingThreads)
        ) || (next == Disposed && self != Disposed)
    }

    /// A renderer may be receiving ticks.
    pub fn is_active(self) -> bool {
        matches!(self, OrchestratorState::Animating)
    }

    pub fn name(self) -> &'static str {
        match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::GeneratingThreads => "generating-threads",
            OrchestratorState::ReadyButNotAnimating => "ready-but-not-animating",
            OrchestratorState::Animating => "animating",
            OrchestratorState::Paused => "paused",
            OrchestratorState::Disposed => "disposed",
        }
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
