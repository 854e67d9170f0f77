//! Reusable buffer type fixtures.
//!
//! - [`pairs`] / [`blobs`]: stock fixed-size and variable-length types.
//! - [`CountingType`]: wraps a stock type and counts hook invocations.
//! - [`arena_with`]: an arena with the given types already registered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use holdfast_arena::{ArenaConfig, BufferArena};
use holdfast_core::{ArrayBufferType, BufferType, BufferTypeId, Element, EntrySize};

/// Fixed-size entries of two elements.
pub fn pairs(min_elems: u32, max_elems: u32) -> ArrayBufferType {
    ArrayBufferType::fixed("pairs", 2, min_elems, max_elems)
}

/// Variable-length entries.
pub fn blobs(min_elems: u32, max_elems: u32) -> ArrayBufferType {
    ArrayBufferType::variable("blobs", min_elems, max_elems)
}

/// Shared counters for [`CountingType`].
#[derive(Debug, Default)]
pub struct HookCounts {
    pub initialized_elems: AtomicUsize,
    pub cleaned_elems: AtomicUsize,
}

impl HookCounts {
    pub fn initialized(&self) -> usize {
        self.initialized_elems.load(Ordering::Relaxed)
    }

    pub fn cleaned(&self) -> usize {
        self.cleaned_elems.load(Ordering::Relaxed)
    }
}

/// Delegates to an [`ArrayBufferType`] and counts elements passed to the
/// construct and destruct hooks.
pub struct CountingType {
    inner: ArrayBufferType,
    counts: Arc<HookCounts>,
}

impl CountingType {
    pub fn new(inner: ArrayBufferType) -> (Self, Arc<HookCounts>) {
        let counts = Arc::new(HookCounts::default());
        (
            Self {
                inner,
                counts: Arc::clone(&counts),
            },
            counts,
        )
    }
}

impl<T: Element> BufferType<T> for CountingType {
    fn name(&self) -> &str {
        BufferType::<T>::name(&self.inner)
    }

    fn entry_size(&self) -> EntrySize {
        BufferType::<T>::entry_size(&self.inner)
    }

    fn min_elems(&self) -> u32 {
        BufferType::<T>::min_elems(&self.inner)
    }

    fn max_elems(&self) -> u32 {
        BufferType::<T>::max_elems(&self.inner)
    }

    fn grow_factor(&self) -> u32 {
        BufferType::<T>::grow_factor(&self.inner)
    }

    fn initialize(&self, elems: &mut [T]) {
        self.counts
            .initialized_elems
            .fetch_add(elems.len(), Ordering::Relaxed);
        BufferType::<T>::initialize(&self.inner, elems);
    }

    fn clean_hold(&self, elems: &mut [T]) {
        self.counts
            .cleaned_elems
            .fetch_add(elems.len(), Ordering::Relaxed);
        BufferType::<T>::clean_hold(&self.inner, elems);
    }
}

/// An arena of `num_buffers` slots with `types` registered in order.
///
/// # Panics
///
/// Panics if the config or any type is rejected.
pub fn arena_with<T: Element>(
    num_buffers: u32,
    types: Vec<Box<dyn BufferType<T>>>,
) -> (BufferArena<T>, Vec<BufferTypeId>) {
    let mut arena = BufferArena::new(ArenaConfig::new(num_buffers)).expect("valid arena config");
    let ids = types
        .into_iter()
        .map(|t| arena.add_type(t).expect("type registration"))
        .collect();
    (arena, ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfast_core::Generation;

    #[test]
    fn counting_type_sees_hooks() {
        let (ty, counts) = CountingType::new(pairs(8, 64));
        let (mut arena, ids) = arena_with::<u32>(4, vec![Box::new(ty)]);
        assert_eq!(counts.initialized(), 8);

        let r = arena.alloc(ids[0], &[1, 2]).unwrap();
        arena.hold_elem(r, 2);
        arena.transfer_hold_lists(Generation(0));
        arena.trim_hold_lists(Generation(1));
        assert_eq!(counts.cleaned(), 2);
    }
}
