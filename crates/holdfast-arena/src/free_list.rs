//! Per-type free lists of reusable fixed-size entries.
//!
//! Each registered type gets a LIFO stack of entry references whose slots
//! are dead and may be handed out again by `alloc`. Only buffers of
//! fixed-size types with their free list enabled ever contribute entries.
//! Disabling a buffer's free list purges its entries from the stack; the
//! purged slots stay counted as dead.

use holdfast_core::{BufferId, BufferTypeId};

use crate::entry_ref::EntryRef;

/// Free lists for all registered types, indexed by `BufferTypeId`.
#[derive(Debug, Default)]
pub struct FreeListLayer {
    lists: Vec<Vec<EntryRef>>,
}

impl FreeListLayer {
    /// An empty layer with no types.
    pub fn new() -> Self {
        Self { lists: Vec::new() }
    }

    /// Add an empty list for a newly registered type.
    pub(crate) fn add_type(&mut self) {
        self.lists.push(Vec::new());
    }

    /// Make `entry` available for reuse.
    #[inline]
    pub(crate) fn push(&mut self, type_id: BufferTypeId, entry: EntryRef) {
        self.lists[type_id.index()].push(entry);
    }

    /// Take the most recently freed entry of `type_id`, if any.
    #[inline]
    pub(crate) fn pop(&mut self, type_id: BufferTypeId) -> Option<EntryRef> {
        self.lists[type_id.index()].pop()
    }

    /// Drop every entry of `type_id` that lives in `buffer`. Returns how
    /// many were removed.
    pub(crate) fn purge_buffer(&mut self, type_id: BufferTypeId, buffer: BufferId) -> usize {
        let list = &mut self.lists[type_id.index()];
        let before = list.len();
        list.retain(|r| r.buffer_id() != buffer);
        before - list.len()
    }

    /// Number of reusable entries for `type_id`.
    pub fn len(&self, type_id: BufferTypeId) -> usize {
        self.lists.get(type_id.index()).map_or(0, Vec::len)
    }

    /// Whether `type_id` has no reusable entries.
    pub fn is_empty(&self, type_id: BufferTypeId) -> bool {
        self.len(type_id) == 0
    }

    /// Reusable entries of `type_id`, oldest first.
    pub fn entries(&self, type_id: BufferTypeId) -> &[EntryRef] {
        self.lists.get(type_id.index()).map_or(&[], Vec::as_slice)
    }
}
