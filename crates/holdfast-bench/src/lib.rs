//! Benchmark profiles for the holdfast buffer arena.
//!
//! - [`reference_arena`]: three types (two fixed-size, one variable) in a
//!   full 1024-slot pool
//! - [`fragment`]: an arena whose buffers are half dead, ready to compact
//! - [`entry_lengths`]: deterministic variable entry lengths via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use holdfast_arena::{ArenaConfig, BufferArena, EntryRef};
use holdfast_core::{ArrayBufferType, BufferTypeId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Type ids registered by [`reference_arena`].
#[derive(Clone, Copy, Debug)]
pub struct ReferenceTypes {
    /// Fixed 2-element entries.
    pub pairs: BufferTypeId,
    /// Fixed 8-element entries.
    pub rows: BufferTypeId,
    /// Variable-length entries.
    pub blobs: BufferTypeId,
}

/// Build the reference profile: default pool size, free lists on.
pub fn reference_arena() -> (BufferArena<u64>, ReferenceTypes) {
    let config = ArenaConfig::default().with_free_lists(true);
    let mut arena = BufferArena::new(config).expect("default config is valid");
    let pairs = arena
        .add_type(Box::new(ArrayBufferType::fixed("pairs", 2, 1024, 1 << 20)))
        .expect("register pairs");
    let rows = arena
        .add_type(Box::new(ArrayBufferType::fixed("rows", 8, 1024, 1 << 20)))
        .expect("register rows");
    let blobs = arena
        .add_type(Box::new(ArrayBufferType::variable("blobs", 4096, 1 << 20)))
        .expect("register blobs");
    (arena, ReferenceTypes { pairs, rows, blobs })
}

/// Fill `type_id` with `entries` fixed-size entries of `entry_len`, then
/// free every other one. Returns the surviving references.
///
/// Disables free lists first so freed slots stay dead.
pub fn fragment(
    arena: &mut BufferArena<u64>,
    type_id: BufferTypeId,
    entry_len: u32,
    entries: usize,
) -> Vec<EntryRef> {
    arena.disable_free_lists();
    let values = vec![7u64; entry_len as usize];
    let mut live = Vec::with_capacity(entries / 2 + 1);
    for i in 0..entries {
        let r = arena.alloc(type_id, &values).expect("fragment alloc");
        if i % 2 == 0 {
            live.push(r);
        } else {
            arena.free_elem(r, entry_len);
        }
    }
    live
}

/// `n` entry lengths in `1..=max`, reproducible from `seed`.
pub fn entry_lengths(n: usize, max: u32, seed: u64) -> Vec<u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(1..=max)).collect()
}
