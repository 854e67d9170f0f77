//! Generation tracking for lock-free readers.
//!
//! [`GenerationHandler`] owns the global generation counter and one padded
//! slot per concurrent reader. A reader pins the current generation by
//! taking a [`GenerationGuard`]; the writer asks for
//! [`oldest_used_generation`](GenerationHandler::oldest_used_generation),
//! the minimum over all pinned slots, and never releases storage held at
//! or after that watermark. The watermark is clamped to its previous value,
//! so it never moves backwards even when a reader briefly pins a stale
//! generation before re-pinning.
//!
//! The writer cycle after a batch of mutations is:
//! 1. `arena.transfer_hold_lists(handler.current_generation())`
//! 2. `handler.inc_generation()`
//! 3. `arena.trim_hold_lists(handler.oldest_used_generation())`

use std::sync::atomic::{AtomicU64, Ordering};

use crate::id::Generation;
use crate::traits::GenerationTracker;

/// Sentinel value meaning "this slot is not pinned to any generation."
pub const GENERATION_UNPINNED: u64 = u64::MAX;

/// Per-reader pin slot, padded to avoid false sharing.
///
/// 128-byte alignment covers both 64-byte (x86) and 128-byte (Apple
/// M-series) cache line sizes.
#[repr(align(128))]
struct ReaderSlot {
    /// Pinned generation, or `GENERATION_UNPINNED`.
    pinned: AtomicU64,
}

impl ReaderSlot {
    fn new() -> Self {
        Self {
            pinned: AtomicU64::new(GENERATION_UNPINNED),
        }
    }
}

/// Global generation counter plus reader pin table.
///
/// Single writer: only one thread calls [`inc_generation`](Self::inc_generation).
/// Any number of threads (up to the slot count) may hold guards at once.
pub struct GenerationHandler {
    current: AtomicU64,
    /// Highest watermark handed out so far.
    watermark: AtomicU64,
    slots: Box<[ReaderSlot]>,
}

// Compile-time assertion: GenerationHandler must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<GenerationHandler>();
};

impl GenerationHandler {
    /// Create a handler at generation 0 with room for `max_readers`
    /// simultaneously pinned readers.
    ///
    /// # Panics
    ///
    /// Panics if `max_readers` is zero.
    pub fn new(max_readers: usize) -> Self {
        assert!(max_readers > 0, "GenerationHandler needs at least one reader slot");
        Self {
            current: AtomicU64::new(0),
            watermark: AtomicU64::new(0),
            slots: (0..max_readers).map(|_| ReaderSlot::new()).collect(),
        }
    }

    /// Read the current generation.
    pub fn current_generation(&self) -> Generation {
        Generation(self.current.load(Ordering::SeqCst))
    }

    /// Advance the generation. Writer only. Returns the new generation.
    ///
    /// # Panics
    ///
    /// Panics on counter overflow.
    pub fn inc_generation(&self) -> Generation {
        let prev = self.current.fetch_add(1, Ordering::SeqCst);
        assert!(prev != GENERATION_UNPINNED - 1, "generation counter overflow");
        Generation(prev + 1)
    }

    /// Pin the current generation for a read section.
    ///
    /// # Panics
    ///
    /// Panics if every reader slot is already pinned.
    pub fn take_guard(&self) -> GenerationGuard<'_> {
        self.try_take_guard().unwrap_or_else(|| {
            panic!(
                "all {} reader slots are pinned; raise GenerationHandler capacity",
                self.slots.len()
            )
        })
    }

    /// Pin the current generation, or `None` if every slot is busy.
    pub fn try_take_guard(&self) -> Option<GenerationGuard<'_>> {
        for (index, slot) in self.slots.iter().enumerate() {
            let mut gen = self.current.load(Ordering::SeqCst);
            if slot
                .pinned
                .compare_exchange(GENERATION_UNPINNED, gen, Ordering::SeqCst, Ordering::Relaxed)
                .is_err()
            {
                continue;
            }
            // The writer may have bumped and scanned between our load and
            // the pin. Re-pin until the pinned value is current; pinning a
            // newer generation is always conservative.
            loop {
                let now = self.current.load(Ordering::SeqCst);
                if now == gen {
                    break;
                }
                slot.pinned.store(now, Ordering::SeqCst);
                gen = now;
            }
            return Some(GenerationGuard {
                handler: self,
                slot: index,
                generation: Generation(gen),
            });
        }
        None
    }

    /// The oldest generation still pinned by any reader, or the current
    /// generation if no reader is pinned.
    ///
    /// Never smaller than a value previously returned. A reader that pinned
    /// a stale generation in [`try_take_guard`](Self::try_take_guard) re-pins
    /// before dereferencing anything, so raising its pin to the last
    /// watermark is safe.
    pub fn oldest_used_generation(&self) -> Generation {
        let current = self.current.load(Ordering::SeqCst);
        let oldest = self
            .slots
            .iter()
            .map(|s| s.pinned.load(Ordering::SeqCst))
            .min()
            .unwrap_or(GENERATION_UNPINNED)
            .min(current);
        let prev = self.watermark.fetch_max(oldest, Ordering::SeqCst);
        Generation(prev.max(oldest))
    }

    /// Number of readers currently pinned.
    pub fn reader_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.pinned.load(Ordering::Acquire) != GENERATION_UNPINNED)
            .count()
    }

    /// Total number of reader slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn release(&self, slot: usize) {
        self.slots[slot]
            .pinned
            .store(GENERATION_UNPINNED, Ordering::Release);
    }
}

impl Default for GenerationHandler {
    fn default() -> Self {
        Self::new(64)
    }
}

impl GenerationTracker for GenerationHandler {
    fn current_generation(&self) -> Generation {
        GenerationHandler::current_generation(self)
    }

    fn oldest_used_generation(&self) -> Generation {
        GenerationHandler::oldest_used_generation(self)
    }
}

/// RAII pin on one generation. Unpins on drop.
#[must_use]
pub struct GenerationGuard<'a> {
    handler: &'a GenerationHandler,
    slot: usize,
    generation: Generation,
}

impl GenerationGuard<'_> {
    /// The generation this guard pins.
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        self.handler.release(self.slot);
    }
}
