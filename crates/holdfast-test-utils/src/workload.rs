//! Seeded random workloads.
//!
//! The same seed always yields the same operation sequence, so failures
//! found by a workload are reproducible by seed alone.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One writer step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Allocate an entry of this many elements.
    Alloc(u32),
    /// Hold the live entry at this index (modulo the live count).
    Hold(usize),
    /// Free the live entry at this index (modulo the live count).
    Free(usize),
    /// Run the transfer / advance / trim cycle.
    Commit,
}

/// Relative weights of each operation, in percent.
#[derive(Clone, Copy, Debug)]
pub struct Mix {
    pub alloc: u32,
    pub hold: u32,
    pub free: u32,
}

impl Default for Mix {
    fn default() -> Self {
        Self {
            alloc: 55,
            hold: 25,
            free: 10,
        }
    }
}

/// `len` operations drawn from `seed`. Allocation sizes fall in
/// `1..=max_entry`, or are exactly `fixed` when given.
pub fn generate(seed: u64, len: usize, mix: Mix, max_entry: u32, fixed: Option<u32>) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let roll = rng.random_range(0..100u32);
            if roll < mix.alloc {
                Op::Alloc(fixed.unwrap_or_else(|| rng.random_range(1..=max_entry)))
            } else if roll < mix.alloc + mix.hold {
                Op::Hold(rng.random_range(0..usize::MAX))
            } else if roll < mix.alloc + mix.hold + mix.free {
                Op::Free(rng.random_range(0..usize::MAX))
            } else {
                Op::Commit
            }
        })
        .collect()
}
