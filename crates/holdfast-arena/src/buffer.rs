//! Per-buffer state: lifecycle status, element accounting, and storage.
//!
//! A [`BufferState`] tracks one slot of the buffer pool. Its lifecycle is
//! `Free -> Active -> Held -> Free`:
//!
//! - **Active**: the one buffer a type bump-allocates from.
//! - **Held (retired)**: replaced by a newer active buffer. Still serves
//!   reads of its live entries; element holds and frees keep working. Once
//!   every used element is dead it is promoted to a whole-buffer hold.
//! - **Held (buffer hold)**: all of its storage awaits generation-protected
//!   release. Element counters are folded into `hold_elems`.
//! - **Free**: no storage, no type.

use std::fmt;
use std::sync::Arc;

use holdfast_core::{BufferTypeId, Element, EntrySize};

use crate::raw::RawBuffer;

/// Lifecycle state of one buffer slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferStatus {
    /// Unassigned; no storage.
    Free,
    /// Accepting allocations for its type.
    Active,
    /// No longer accepting allocations; awaiting reclamation.
    Held,
}

impl fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Free => "free",
            Self::Active => "active",
            Self::Held => "held",
        };
        f.write_str(s)
    }
}

/// Accounting and storage for one buffer slot.
///
/// Counter invariant while the slot is not whole-buffer held:
/// `dead_elems + hold_elems <= used_elems <= alloc_elems`.
pub struct BufferState<T> {
    status: BufferStatus,
    type_id: Option<BufferTypeId>,
    entry_size: EntrySize,
    alloc_elems: u32,
    used_elems: u32,
    dead_elems: u32,
    hold_elems: u32,
    free_list_enabled: bool,
    elem_holds_disabled: bool,
    compacting: bool,
    buffer_hold_staged: bool,
    storage: Option<Arc<RawBuffer<T>>>,
}

impl<T: Element> BufferState<T> {
    /// A free slot.
    pub(crate) fn new() -> Self {
        Self {
            status: BufferStatus::Free,
            type_id: None,
            entry_size: EntrySize::Variable,
            alloc_elems: 0,
            used_elems: 0,
            dead_elems: 0,
            hold_elems: 0,
            free_list_enabled: false,
            elem_holds_disabled: false,
            compacting: false,
            buffer_hold_staged: false,
            storage: None,
        }
    }

    /// Free -> Active with fresh storage.
    pub(crate) fn on_active(
        &mut self,
        type_id: BufferTypeId,
        storage: Arc<RawBuffer<T>>,
        free_list_enabled: bool,
    ) {
        assert_eq!(
            self.status,
            BufferStatus::Free,
            "only a free buffer can be activated"
        );
        self.status = BufferStatus::Active;
        self.type_id = Some(type_id);
        self.entry_size = storage.entry_size();
        self.alloc_elems = storage.capacity();
        self.used_elems = 0;
        self.dead_elems = 0;
        self.hold_elems = 0;
        self.free_list_enabled = free_list_enabled && self.entry_size.is_fixed();
        self.elem_holds_disabled = false;
        self.compacting = false;
        self.buffer_hold_staged = false;
        self.storage = Some(storage);
    }

    /// Active -> Held, keeping live elements readable.
    pub(crate) fn on_retire(&mut self) {
        assert_eq!(
            self.status,
            BufferStatus::Active,
            "only an active buffer can be retired"
        );
        self.status = BufferStatus::Held;
        self.free_list_enabled = false;
    }

    /// Fold all element accounting into a whole-buffer hold.
    ///
    /// Every used element, live or not, now counts as held until the
    /// buffer is released.
    pub(crate) fn on_hold(&mut self) {
        assert!(
            self.status != BufferStatus::Free && !self.buffer_hold_staged,
            "buffer cannot be held twice or while free"
        );
        self.status = BufferStatus::Held;
        self.hold_elems = self.used_elems;
        self.used_elems = 0;
        self.dead_elems = 0;
        self.free_list_enabled = false;
        self.elem_holds_disabled = true;
        self.buffer_hold_staged = true;
    }

    /// Held -> Free. Returns the storage so the caller decides when it drops.
    pub(crate) fn on_free(&mut self) -> Option<Arc<RawBuffer<T>>> {
        assert!(
            self.status == BufferStatus::Held && self.buffer_hold_staged,
            "only a buffer under a whole-buffer hold can be freed"
        );
        let storage = self.storage.take();
        *self = Self::new();
        storage
    }

    /// Swap in larger storage, returning the old one. The used prefix must
    /// already have been copied.
    pub(crate) fn replace_storage(
        &mut self,
        storage: Arc<RawBuffer<T>>,
    ) -> Option<Arc<RawBuffer<T>>> {
        debug_assert!(storage.capacity() >= self.used_elems);
        self.alloc_elems = storage.capacity();
        self.storage.replace(storage)
    }

    /// Reserve `len` elements at the bump cursor. Returns the offset.
    #[inline]
    pub(crate) fn bump(&mut self, len: u32) -> u32 {
        debug_assert_eq!(self.status, BufferStatus::Active);
        assert!(
            len <= self.remaining(),
            "bump of {len} elements exceeds remaining capacity {}",
            self.remaining()
        );
        let offset = self.used_elems;
        self.used_elems += len;
        offset
    }

    #[inline]
    pub(crate) fn inc_dead(&mut self, n: u32) {
        self.dead_elems += n;
        debug_assert!(
            self.dead_elems + self.hold_elems <= self.used_elems,
            "dead {} + hold {} exceeds used {}",
            self.dead_elems,
            self.hold_elems,
            self.used_elems
        );
    }

    #[inline]
    pub(crate) fn dec_dead(&mut self, n: u32) {
        debug_assert!(self.dead_elems >= n);
        self.dead_elems -= n;
    }

    #[inline]
    pub(crate) fn inc_hold(&mut self, n: u32) {
        self.hold_elems += n;
        debug_assert!(self.dead_elems + self.hold_elems <= self.used_elems);
    }

    /// Move `n` held elements to dead.
    #[inline]
    pub(crate) fn release_hold(&mut self, n: u32) {
        debug_assert!(self.hold_elems >= n);
        self.hold_elems -= n;
        self.dead_elems += n;
    }

    /// A retired buffer whose every used element is dead.
    pub(crate) fn is_drained(&self) -> bool {
        self.status == BufferStatus::Held
            && !self.buffer_hold_staged
            && !self.compacting
            && self.hold_elems == 0
            && self.dead_elems == self.used_elems
    }

    pub(crate) fn set_free_list_enabled(&mut self, enabled: bool) {
        self.free_list_enabled = enabled;
    }

    pub(crate) fn disable_elem_holds(&mut self) {
        self.elem_holds_disabled = true;
    }

    pub(crate) fn set_compacting(&mut self, compacting: bool) {
        self.compacting = compacting;
    }

    /// Storage of a non-free buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is free.
    #[inline]
    pub(crate) fn raw(&self) -> &RawBuffer<T> {
        match self.storage.as_deref() {
            Some(raw) => raw,
            None => panic!("{} buffer has no storage", self.status),
        }
    }
}

impl<T> BufferState<T> {
    /// Current lifecycle status.
    pub fn status(&self) -> BufferStatus {
        self.status
    }

    /// Owning type, or `None` while free.
    pub fn type_id(&self) -> Option<BufferTypeId> {
        self.type_id
    }

    /// Entry size of the owning type.
    pub fn entry_size(&self) -> EntrySize {
        self.entry_size
    }

    /// Capacity in elements.
    pub fn alloc_elems(&self) -> u32 {
        self.alloc_elems
    }

    /// Elements handed out so far (the bump cursor).
    pub fn used_elems(&self) -> u32 {
        self.used_elems
    }

    /// Used elements that are unreachable and not held.
    pub fn dead_elems(&self) -> u32 {
        self.dead_elems
    }

    /// Elements awaiting generation-protected release.
    pub fn hold_elems(&self) -> u32 {
        self.hold_elems
    }

    /// Capacity left for bump allocation.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.alloc_elems - self.used_elems
    }

    /// Whether freed entries in this buffer go to the type's free list.
    pub fn free_list_enabled(&self) -> bool {
        self.free_list_enabled
    }

    /// Whether element holds are skipped for this buffer.
    pub fn elem_holds_disabled(&self) -> bool {
        self.elem_holds_disabled
    }

    /// Whether the buffer is a compaction source.
    pub fn is_compacting(&self) -> bool {
        self.compacting
    }

    /// Whether the whole buffer is staged for release.
    pub fn is_buffer_held(&self) -> bool {
        self.buffer_hold_staged
    }
}

impl<T> fmt::Debug for BufferState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferState")
            .field("status", &self.status)
            .field("type_id", &self.type_id)
            .field("entry_size", &self.entry_size)
            .field("alloc_elems", &self.alloc_elems)
            .field("used_elems", &self.used_elems)
            .field("dead_elems", &self.dead_elems)
            .field("hold_elems", &self.hold_elems)
            .field("free_list_enabled", &self.free_list_enabled)
            .field("compacting", &self.compacting)
            .field("buffer_hold_staged", &self.buffer_hold_staged)
            .finish_non_exhaustive()
    }
}
