//! Low-level storage primitives shared between the writer and readers.
//!
//! One of the two modules in the crate allowed to use `unsafe` (the other is
//! the reader view). It holds two types:
//!
//! - [`RawBuffer`]: a fixed-capacity slab of interior-mutable elements. The
//!   writer fills ranges through [`RawBuffer::slice_mut`] while readers on
//!   other threads view disjoint, already-published ranges through
//!   [`RawBuffer::slice`].
//! - [`BufferTable`]: one atomic pointer per buffer id. The writer publishes
//!   storage with a `Release` store; readers resolve a buffer id with an
//!   `Acquire` load. The table never owns storage: the writer keeps every
//!   published `RawBuffer` alive through an `Arc` until the generation
//!   protocol says no reader can still be looking at it.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use holdfast_core::{BufferId, Element, EntrySize};

/// Backing storage of one buffer.
pub(crate) struct RawBuffer<T> {
    cells: Box<[UnsafeCell<T>]>,
    entry_size: EntrySize,
}

// SAFETY: concurrent access is coordinated by the writer protocol. The
// writer only calls `slice_mut` on ranges that no reader can reach (fresh
// slots, or slots whose hold was released at a generation older than every
// pinned reader), and readers only call `slice`. `T: Sync` makes the shared
// reads themselves sound.
unsafe impl<T: Send + Sync> Sync for RawBuffer<T> {}

impl<T: Element> RawBuffer<T> {
    /// Wrap already-initialised elements.
    pub(crate) fn from_vec(elems: Vec<T>, entry_size: EntrySize) -> Self {
        Self {
            cells: elems.into_iter().map(UnsafeCell::new).collect(),
            entry_size,
        }
    }

    /// Capacity in elements.
    #[inline]
    pub(crate) fn capacity(&self) -> u32 {
        self.cells.len() as u32
    }

    /// Entry size of the type that owns this storage.
    #[inline]
    pub(crate) fn entry_size(&self) -> EntrySize {
        self.entry_size
    }

    #[inline]
    fn check_range(&self, offset: u32, len: u32) -> usize {
        let start = offset as usize;
        let end = start + len as usize;
        assert!(
            end <= self.cells.len(),
            "range {start}..{end} out of bounds for buffer of {} elements",
            self.cells.len()
        );
        start
    }

    /// Shared view of `len` elements at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the capacity.
    ///
    /// # Safety
    ///
    /// No `&mut` slice obtained from [`slice_mut`](Self::slice_mut) over an
    /// overlapping range may be alive for the lifetime of the result.
    #[inline]
    pub(crate) unsafe fn slice(&self, offset: u32, len: u32) -> &[T] {
        let start = self.check_range(offset, len);
        // SAFETY: `UnsafeCell<T>` has the same layout as `T`, the range is
        // in bounds, and the caller rules out concurrent mutation.
        unsafe {
            let base = UnsafeCell::raw_get(self.cells.as_ptr().add(start));
            std::slice::from_raw_parts(base, len as usize)
        }
    }

    /// Exclusive view of `len` elements at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the capacity.
    ///
    /// # Safety
    ///
    /// No other slice (shared or exclusive) over an overlapping range may be
    /// alive for the lifetime of the result, on any thread.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    unsafe fn slice_mut(&self, offset: u32, len: u32) -> &mut [T] {
        let start = self.check_range(offset, len);
        // SAFETY: interior mutability through `UnsafeCell::raw_get`; the
        // pointer keeps the provenance of the whole cell slice, the range is
        // in bounds, and the caller guarantees exclusivity.
        unsafe {
            let base = UnsafeCell::raw_get(self.cells.as_ptr().add(start));
            std::slice::from_raw_parts_mut(base, len as usize)
        }
    }

    // Writer-side accessors. Only `BufferArena` calls these, and only while
    // it holds `&self` (reads) or `&mut self` (writes), so no two writer
    // views overlap. Readers never mutate, and the arena only writes ranges
    // that no reader can reach: fresh bump space, free-list slots whose
    // owner unpublished them, or holds released past the reader watermark.

    /// Writer read of a range.
    #[inline]
    pub(crate) fn read(&self, offset: u32, len: u32) -> &[T] {
        // SAFETY: see the writer-side contract above; the returned borrow
        // is tied to the arena borrow, which excludes writer mutation.
        unsafe { self.slice(offset, len) }
    }

    /// Copy `values` into the range starting at `offset`.
    #[inline]
    pub(crate) fn write(&self, offset: u32, values: &[T]) {
        // SAFETY: see the writer-side contract above; the exclusive view
        // does not outlive this call.
        let dst = unsafe { self.slice_mut(offset, values.len() as u32) };
        dst.copy_from_slice(values);
    }

    /// Run `f` over a range the writer has exclusive use of.
    #[inline]
    pub(crate) fn with_range_mut(&self, offset: u32, len: u32, f: impl FnOnce(&mut [T])) {
        // SAFETY: see the writer-side contract above; the exclusive view
        // does not outlive `f`.
        f(unsafe { self.slice_mut(offset, len) })
    }

    /// Copy the first `len` elements out.
    pub(crate) fn copy_prefix(&self, len: u32) -> Vec<T> {
        self.read(0, len).to_vec()
    }
}

/// Buffer id to published storage, readable without locks.
pub(crate) struct BufferTable<T> {
    slots: Box<[AtomicPtr<RawBuffer<T>>]>,
}

impl<T: Element> BufferTable<T> {
    /// A table of `num_buffers` empty slots.
    pub(crate) fn new(num_buffers: u32) -> Self {
        Self {
            slots: (0..num_buffers)
                .map(|_| AtomicPtr::new(ptr::null_mut()))
                .collect(),
        }
    }

    /// Number of slots.
    pub(crate) fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Make `storage` visible to readers under `id`.
    ///
    /// The caller must keep `storage` alive until a later
    /// [`retract`](Self::retract) or `publish` for the same id has been
    /// followed by a generation-protected release.
    pub(crate) fn publish(&self, id: BufferId, storage: &Arc<RawBuffer<T>>) {
        self.slots[id.index()].store(Arc::as_ptr(storage).cast_mut(), Ordering::Release);
    }

    /// Remove the storage published under `id`.
    pub(crate) fn retract(&self, id: BufferId) {
        self.slots[id.index()].store(ptr::null_mut(), Ordering::Release);
    }

    /// Resolve `id` to its published storage.
    ///
    /// # Safety
    ///
    /// The storage published under `id` at the time of the load must stay
    /// alive for `'a`. Readers uphold this by holding a generation guard
    /// taken before the reference they are resolving was obtained.
    #[inline]
    pub(crate) unsafe fn load<'a>(&'a self, id: BufferId) -> Option<&'a RawBuffer<T>> {
        let p = self.slots.get(id.index())?.load(Ordering::Acquire);
        // SAFETY: non-null pointers in the table come from `Arc::as_ptr` on
        // storage the writer keeps alive; the caller extends that guarantee
        // over `'a`.
        unsafe { p.as_ref() }
    }
}
