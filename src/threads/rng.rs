//! Seeded pseudo-random number generation.
//!
//! Thread generation never touches the wall clock or an OS entropy source.
//! Every value is drawn from a mulberry32 stream whose seed is derived from
//! the thread id, so a given `(id, total)` always produces the same thread.

/// Base seed shared by every generator stream (32-bit golden ratio).
pub const GOLDEN_RATIO_SEED: u32 = 0x9E37_79B9;

/// Small, fast, 32-bit state PRNG (mulberry32).
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    /// Create a generator from a raw seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Generator stream for a single thread: `GOLDEN_RATIO_SEED ^ (id + 1)`.
    pub fn for_thread(id: u32) -> Self {
        Self::new(GOLDEN_RATIO_SEED ^ id.wrapping_add(1))
    }

    /// Next raw 32-bit value.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        // 24 bits keep the result exactly representable and strictly below 1.0
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform value in `[min, max)`.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    /// `true` with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }

    /// Uniform index in `0..len`. Returns 0 for an empty range.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_f32() * len as f32) as usize).min(len - 1)
    }

    /// Pick an index from a list of non-negative weights.
    ///
    /// Always consumes exactly one draw so callers keep a fixed draw order.
    pub fn pick_weighted(&mut self, weights: &[f32]) -> usize {
        let roll = self.next_f32();
        let total: f32 = weights.iter().sum();
        if weights.is_empty() || total <= 0.0 {
            return 0;
        }

        let mut acc = 0.0;
        for (i, w) in weights.iter().enumerate() {
            acc += w / total;
            if roll < acc {
                return i;
            }
        }
        weights.len() - 1
    }
}
