//! Periodic direction-flip selection.

use crate::threads::SeededRng;

use super::state::ThreadRuntime;

/// Picks a seeded random subset of eligible threads every `flip_interval_ms`.
#[derive(Debug, Clone)]
pub struct FlipScheduler {
    rng: SeededRng,
    last_check: Option<f64>,
}

impl FlipScheduler {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: SeededRng::new(seed),
            last_check: None,
        }
    }

    /// Restart the interval clock at `now`.
    pub fn reset(&mut self, now: f64) {
        self.last_check = Some(now);
    }

    /// Set `target_direction` on the threads chosen to flip. Returns their indices.
    ///
    /// Runs at most once per call even if several intervals were skipped.
    pub fn schedule(
        &mut self,
        now: f64,
        threads: &mut [ThreadRuntime],
        interval_ms: f64,
        settle_buffer_ms: f64,
        fraction: f32,
    ) -> Vec<usize> {
        let Some(last) = self.last_check else {
            self.last_check = Some(now);
            return Vec::new();
        };
        if now - last < interval_ms {
            return Vec::new();
        }
        self.last_check = Some(now);

        let mut eligible: Vec<usize> = threads
            .iter()
            .enumerate()
            .filter(|(_, t)| t.target_direction == t.direction && t.can_flip(now, settle_buffer_ms))
            .map(|(i, _)| i)
            .collect();
        if eligible.is_empty() || fraction <= 0.0 {
            return Vec::new();
        }

        let count = ((eligible.len() as f32 * fraction.min(1.0)).ceil() as usize).min(eligible.len());
        // partial Fisher-Yates
        for i in 0..count {
            let j = i + self.rng.index(eligible.len() - i);
            eligible.swap(i, j);
        }
        eligible.truncate(count);
        eligible.sort_unstable();

        for &i in &eligible {
            let t = &mut threads[i];
            t.target_direction = t.direction.opposite();
            log::debug!("Thread {} flips to {:?}", t.data.id, t.target_direction);
        }
        eligible
    }
}
