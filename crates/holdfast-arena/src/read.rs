//! Lock-free read access for threads other than the writer.
//!
//! An [`ArenaReader`] shares the arena's buffer table and nothing else. A
//! read section looks like:
//!
//! ```text
//! let guard = handler.take_guard();          // pin the generation
//! let r = index.lookup(key);                 // obtain a published EntryRef
//! let elems = unsafe { reader.get(&guard, r, len) };
//! drop(guard);                               // elems cannot outlive this
//! ```
//!
//! Resolving a reference performs no locking and no reference counting:
//! one `Acquire` load of the buffer's storage pointer and a bounds check.

#![allow(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use holdfast_core::{Element, EntrySize, GenerationGuard};

use crate::entry_ref::EntryRef;
use crate::raw::BufferTable;

/// Cloneable, thread-safe read view of a [`BufferArena`](crate::BufferArena).
pub struct ArenaReader<T: Element> {
    table: Arc<BufferTable<T>>,
}

// Compile-time assertion: readers are handed to other threads.
const _: fn() = || {
    fn assert<T: Send + Sync + Clone>() {}
    assert::<ArenaReader<u64>>();
};

impl<T: Element> ArenaReader<T> {
    pub(crate) fn new(table: Arc<BufferTable<T>>) -> Self {
        Self { table }
    }

    /// Resolve `len` elements at `r`.
    ///
    /// The result borrows from `guard`, so it cannot outlive the read
    /// section that protects it.
    ///
    /// # Panics
    ///
    /// Panics if `r` names a buffer with no storage or a range past the
    /// buffer's capacity.
    ///
    /// # Safety
    ///
    /// - `guard` pins the generation handler whose generations the arena's
    ///   writer passes to `transfer_hold_lists` / `trim_hold_lists`.
    /// - `guard` was taken before `r` was obtained, and `r` was reachable
    ///   from reader-visible state at that time (not freed with
    ///   `free_elem` or reused through a free list since).
    /// - The arena has not been dropped and the writer has not called
    ///   `clear_hold_lists` during the read section.
    #[inline]
    pub unsafe fn get<'a>(
        &'a self,
        _guard: &'a GenerationGuard<'_>,
        r: EntryRef,
        len: u32,
    ) -> &'a [T] {
        let id = r.buffer_id();
        // SAFETY: the caller's guard keeps every storage reachable at the
        // time `r` was obtained alive until the guard drops; the returned
        // borrow is tied to the guard.
        let storage = unsafe { self.table.load(id) }
            .unwrap_or_else(|| panic!("{r}: buffer {id} has no published storage"));
        // SAFETY: the writer only mutates ranges that no reader protected
        // by a live guard can reach.
        unsafe { storage.slice(r.offset(), len) }
    }

    /// Resolve the fixed-size entry at `r`.
    ///
    /// # Panics
    ///
    /// As for [`get`](Self::get), and if the buffer stores variable-length
    /// entries.
    ///
    /// # Safety
    ///
    /// Same contract as [`get`](Self::get).
    #[inline]
    pub unsafe fn get_entry<'a>(&'a self, guard: &'a GenerationGuard<'_>, r: EntryRef) -> &'a [T] {
        let id = r.buffer_id();
        // SAFETY: forwarded caller contract.
        let storage = unsafe { self.table.load(id) }
            .unwrap_or_else(|| panic!("{r}: buffer {id} has no published storage"));
        match storage.entry_size() {
            // SAFETY: forwarded caller contract.
            EntrySize::Fixed(n) => unsafe { self.get(guard, r, n) },
            EntrySize::Variable => panic!("get_entry({r}): buffer has variable-length entries"),
        }
    }

    /// Number of buffer slots the reader can resolve.
    pub fn num_buffers(&self) -> u32 {
        self.table.len()
    }
}

impl<T: Element> Clone for ArenaReader<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<T: Element> fmt::Debug for ArenaReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaReader")
            .field("num_buffers", &self.table.len())
            .finish()
    }
}
