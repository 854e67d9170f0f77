//! Test utilities for holdfast development.
//!
//! Provides a [`ManualTracker`] for deterministic generation control, a
//! [`commit`] helper that runs the writer cycle against a real
//! [`GenerationHandler`], fixture buffer types in [`fixtures`], and seeded
//! random workloads in [`workload`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod workload;

use holdfast_arena::BufferArena;
use holdfast_core::{Element, Generation, GenerationHandler, GenerationTracker};

/// Generation tracker driven by hand.
///
/// Readers are simulated by pinning generations explicitly. Pins are
/// identified by the token returned from [`pin`](ManualTracker::pin).
#[derive(Debug, Default)]
pub struct ManualTracker {
    current: u64,
    pins: Vec<Option<u64>>,
}

impl ManualTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at `generation` instead of 0.
    pub fn starting_at(generation: u64) -> Self {
        Self {
            current: generation,
            pins: Vec::new(),
        }
    }

    /// Advance the current generation by one.
    pub fn advance(&mut self) -> Generation {
        self.current += 1;
        Generation(self.current)
    }

    /// Pin the current generation, as a reader starting now would.
    pub fn pin(&mut self) -> usize {
        self.pins.push(Some(self.current));
        self.pins.len() - 1
    }

    /// Release a pin taken by [`pin`](Self::pin).
    pub fn unpin(&mut self, token: usize) {
        self.pins[token] = None;
    }

    /// Run the writer cycle: transfer at the current generation, advance,
    /// then trim at the watermark.
    pub fn commit<T: Element>(&mut self, arena: &mut BufferArena<T>) {
        arena.transfer_hold_lists(self.current_generation());
        self.advance();
        arena.trim_hold_lists(self.oldest_used_generation());
    }
}

impl GenerationTracker for ManualTracker {
    fn current_generation(&self) -> Generation {
        Generation(self.current)
    }

    fn oldest_used_generation(&self) -> Generation {
        let oldest = self.pins.iter().flatten().copied().min();
        Generation(oldest.map_or(self.current, |p| p.min(self.current)))
    }
}

/// Run the writer cycle against a shared [`GenerationHandler`].
pub fn commit<T: Element>(arena: &mut BufferArena<T>, handler: &GenerationHandler) {
    arena.transfer_hold_lists(handler.current_generation());
    handler.inc_generation();
    arena.trim_hold_lists(handler.oldest_used_generation());
}
