//! The writer-owned buffer arena.
//!
//! [`BufferArena`] hands out [`EntryRef`]s into typed buffers and defers
//! every reclamation a reader could observe until the reader watermark has
//! passed it. All mutation goes through `&mut self` on a single writer;
//! readers resolve references through an [`ArenaReader`].
//!
//! The writer cycle after each batch of mutations is:
//! 1. [`transfer_hold_lists`](BufferArena::transfer_hold_lists) with the
//!    current generation
//! 2. advance the generation
//! 3. [`trim_hold_lists`](BufferArena::trim_hold_lists) with the oldest
//!    generation any reader still uses

use std::sync::Arc;

use holdfast_core::{BufferId, BufferType, BufferTypeId, Element, EntrySize, Generation};
use tracing::{debug, trace};

use crate::buffer::{BufferState, BufferStatus};
use crate::config::ArenaConfig;
use crate::entry_ref::EntryRef;
use crate::error::ArenaError;
use crate::free_list::FreeListLayer;
use crate::hold::{BufferHold, ElemHold, FallbackHold, HoldLedger};
use crate::raw::{BufferTable, RawBuffer};
use crate::read::ArenaReader;
use crate::stats::{MemStats, MemoryUsage};
use crate::types::TypeTable;

/// Typed buffer arena with generation-protected reclamation.
///
/// # Buffer layout
///
/// ```text
/// states[0..num_buffers]   one BufferState per slot, Free/Active/Held
/// table (Arc, shared)      slot -> published storage, read by ArenaReader
/// types                    name -> descriptor, sizing, active buffer id
/// free_lists               per type: reusable fixed-size entries
/// elem_holds               pending/stamped element ranges
/// buffer_holds             pending/stamped whole buffers and old storage
/// ```
pub struct BufferArena<T: Element> {
    config: ArenaConfig,
    pub(crate) states: Vec<BufferState<T>>,
    table: Arc<BufferTable<T>>,
    pub(crate) types: TypeTable<T>,
    pub(crate) free_lists: FreeListLayer,
    free_lists_enabled: bool,
    elem_holds_enabled: bool,
    elem_holds: HoldLedger<ElemHold>,
    buffer_holds: HoldLedger<BufferHold<T>>,
    last_trim: Generation,
}

// Compile-time assertion: the arena can move to a dedicated writer thread.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<BufferArena<u64>>();
};

impl<T: Element> BufferArena<T> {
    /// Create an arena with every buffer slot Free and no types.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let n = config.num_buffers;
        debug!(
            num_buffers = n,
            max_elems_per_buffer = config.max_elems_per_buffer,
            free_lists = config.free_lists,
            "created buffer arena"
        );
        Ok(Self {
            states: (0..n).map(|_| BufferState::new()).collect(),
            table: Arc::new(BufferTable::new(n)),
            types: TypeTable::new(),
            free_lists: FreeListLayer::new(),
            free_lists_enabled: config.free_lists,
            elem_holds_enabled: true,
            elem_holds: HoldLedger::new(),
            buffer_holds: HoldLedger::new(),
            last_trim: Generation::ZERO,
            config,
        })
    }

    /// Register a buffer type and activate its first buffer.
    ///
    /// The first buffer gets the type's `min_elems` and is taken from the
    /// lowest-numbered Free slot.
    pub fn add_type(
        &mut self,
        descriptor: Box<dyn BufferType<T>>,
    ) -> Result<BufferTypeId, ArenaError> {
        let Some(buffer_id) = self.find_free_buffer(None) else {
            return Err(ArenaError::BufferIdsExhausted {
                num_buffers: self.config.num_buffers,
                types: self.types.len() as u32,
            });
        };
        let type_id = self
            .types
            .register(descriptor, self.config.max_elems_per_buffer)?;
        self.free_lists.add_type();
        let capacity = self.types.get(type_id)?.meta.min_elems;
        self.activate(buffer_id, type_id, capacity)?;
        debug!(
            type_id = %type_id,
            name = %self.types.get(type_id)?.meta.name,
            buffer = %buffer_id,
            "registered buffer type"
        );
        Ok(type_id)
    }

    /// Make sure the active buffer of `type_id` has room for `elems`
    /// more elements, switching to a new buffer if it does not.
    #[inline]
    pub fn ensure_capacity(&mut self, type_id: BufferTypeId, elems: u32) -> Result<(), ArenaError> {
        let active = self.types.get(type_id)?.active;
        if elems > self.states[active.index()].remaining() {
            self.switch_active_buffer(type_id, elems)?;
        }
        Ok(())
    }

    /// Retire the active buffer of `type_id` and activate a new one with
    /// room for at least `elems_needed` elements.
    ///
    /// Free slots are searched round-robin starting after the current
    /// active buffer. If none is left, the current buffer is grown in place
    /// instead (see [`fallback_resize`](Self::fallback_resize)). Returns the
    /// buffer that is active afterwards.
    #[cold]
    pub fn switch_active_buffer(
        &mut self,
        type_id: BufferTypeId,
        elems_needed: u32,
    ) -> Result<BufferId, ArenaError> {
        match self.switch_to_free_buffer(type_id, elems_needed) {
            Err(ArenaError::BufferIdsExhausted { .. }) => {
                let entry = self.types.get(type_id)?;
                let active = entry.active;
                let state = &self.states[active.index()];
                let needed = u64::from(state.used_elems()) + u64::from(elems_needed);
                let capacity = entry
                    .meta
                    .next_capacity(needed, state.alloc_elems())
                    .ok_or(ArenaError::CapacityExceeded {
                        type_id,
                        requested: needed,
                        max_elems: entry.meta.max_elems,
                    })?;
                if capacity <= state.alloc_elems() {
                    return Err(ArenaError::CapacityExceeded {
                        type_id,
                        requested: needed,
                        max_elems: entry.meta.max_elems,
                    });
                }
                self.fallback_resize(active, capacity)?;
                Ok(active)
            }
            other => other,
        }
    }

    /// Switch to a Free slot, failing with `BufferIdsExhausted` if there is
    /// none. Leaves the arena unchanged on error.
    pub(crate) fn switch_to_free_buffer(
        &mut self,
        type_id: BufferTypeId,
        elems_needed: u32,
    ) -> Result<BufferId, ArenaError> {
        let entry = self.types.get(type_id)?;
        let old = entry.active;
        let prev_capacity = self.states[old.index()].alloc_elems();
        let capacity = entry
            .meta
            .next_capacity(u64::from(elems_needed), prev_capacity)
            .ok_or(ArenaError::CapacityExceeded {
                type_id,
                requested: u64::from(elems_needed),
                max_elems: entry.meta.max_elems,
            })?;
        let Some(new) = self.find_free_buffer(Some(old)) else {
            return Err(ArenaError::BufferIdsExhausted {
                num_buffers: self.config.num_buffers,
                types: self.types.len() as u32,
            });
        };
        self.retire_buffer(old);
        self.activate(new, type_id, capacity)?;
        debug!(
            type_id = %type_id,
            from = %old,
            to = %new,
            capacity,
            "switched active buffer"
        );
        Ok(new)
    }

    /// Grow an active buffer in place to `new_capacity` elements.
    ///
    /// The used prefix is copied to new storage, which is then published
    /// under the same buffer id. The old storage stays alive as a fallback
    /// hold until readers that resolved it before the switch are gone.
    pub fn fallback_resize(
        &mut self,
        buffer_id: BufferId,
        new_capacity: u32,
    ) -> Result<(), ArenaError> {
        let state = &self.states[buffer_id.index()];
        assert_eq!(
            state.status(),
            BufferStatus::Active,
            "fallback_resize({buffer_id}): only an active buffer can grow"
        );
        let Some(type_id) = state.type_id() else {
            unreachable!("active buffer without a type");
        };
        let entry = self.types.get(type_id)?;
        let used = state.used_elems();
        if new_capacity > entry.meta.max_elems || new_capacity < used {
            return Err(ArenaError::CapacityExceeded {
                type_id,
                requested: u64::from(new_capacity),
                max_elems: entry.meta.max_elems,
            });
        }

        let mut elems = state.raw().copy_prefix(used);
        elems.resize(new_capacity as usize, T::default());
        entry.descriptor.initialize(&mut elems[used as usize..]);
        let storage = Arc::new(RawBuffer::from_vec(elems, entry.meta.entry_size));
        self.table.publish(buffer_id, &storage);

        let old_capacity = state.alloc_elems();
        if let Some(old) = self.states[buffer_id.index()].replace_storage(storage) {
            self.buffer_holds.record(BufferHold::Fallback(FallbackHold {
                buffer: buffer_id,
                type_id,
                used_elems: used,
                storage: old,
            }));
        }
        debug!(
            buffer = %buffer_id,
            type_id = %type_id,
            old_capacity,
            new_capacity,
            "fallback resize"
        );
        Ok(())
    }

    /// Copy `values` into a new entry of `type_id`.
    ///
    /// Fixed-size types take a free-list slot first when one is available.
    /// Otherwise the entry is bump-allocated from the active buffer, which
    /// may switch buffers. An empty entry still gets an offset inside its
    /// buffer, so it switches away from a full one like any other entry.
    pub fn alloc(&mut self, type_id: BufferTypeId, values: &[T]) -> Result<EntryRef, ArenaError> {
        let meta = &self.types.get(type_id)?.meta;
        let max_elems = meta.max_elems;
        if let EntrySize::Fixed(n) = meta.entry_size {
            if values.len() != n as usize {
                return Err(ArenaError::EntrySizeMismatch {
                    type_id,
                    expected: n,
                    actual: values.len(),
                });
            }
            if let Some(r) = self.free_lists.pop(type_id) {
                let state = &mut self.states[r.buffer_id().index()];
                state.dec_dead(n);
                state.raw().write(r.offset(), values);
                trace!(entry = %r, "reused free-list slot");
                return Ok(r);
            }
        }
        let len = u32::try_from(values.len()).map_err(|_| ArenaError::CapacityExceeded {
            type_id,
            requested: values.len() as u64,
            max_elems,
        })?;
        self.ensure_capacity(type_id, len.max(1))?;
        let active = self.types.get(type_id)?.active;
        let state = &mut self.states[active.index()];
        let offset = state.bump(len);
        state.raw().write(offset, values);
        Ok(EntryRef::new(active, offset))
    }

    /// Writer view of `len` elements at `r`.
    ///
    /// # Panics
    ///
    /// Panics if `r` points into a Free buffer or past its capacity.
    pub fn get(&self, r: EntryRef, len: u32) -> &[T] {
        let state = &self.states[r.buffer_id().index()];
        assert!(
            state.status() != BufferStatus::Free,
            "{r} points into a free buffer"
        );
        state.raw().read(r.offset(), len)
    }

    /// Writer view of the fixed-size entry at `r`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer holds variable-length entries.
    pub fn get_entry(&self, r: EntryRef) -> &[T] {
        let state = &self.states[r.buffer_id().index()];
        match state.entry_size() {
            EntrySize::Fixed(n) => self.get(r, n),
            EntrySize::Variable => panic!("get_entry({r}): buffer has variable-length entries"),
        }
    }

    /// Mark `len` elements at `r` dead right away, skipping the generation
    /// delay.
    ///
    /// A whole fixed-size entry in a buffer with its free list enabled is
    /// pushed for reuse by the next `alloc`. Only call this for ranges no
    /// reader can still reach; otherwise use [`hold_elem`](Self::hold_elem).
    pub fn free_elem(&mut self, r: EntryRef, len: u32) {
        let id = r.buffer_id();
        let state = &mut self.states[id.index()];
        assert!(
            state.status() != BufferStatus::Free,
            "free_elem({r}): buffer is free"
        );
        if state.is_buffer_held() {
            return;
        }
        state.inc_dead(len);
        if state.free_list_enabled() && state.entry_size().fixed() == Some(len) {
            if let Some(type_id) = state.type_id() {
                self.free_lists.push(type_id, r);
            }
        }
        self.stage_if_drained(id);
    }

    /// Put `len` elements at `r` on hold until readers can no longer see
    /// them.
    ///
    /// Buffers with element holds disabled count the range as dead
    /// immediately.
    pub fn hold_elem(&mut self, r: EntryRef, len: u32) {
        let id = r.buffer_id();
        let state = &mut self.states[id.index()];
        assert!(
            state.status() != BufferStatus::Free,
            "hold_elem({r}): buffer is free"
        );
        if state.is_buffer_held() {
            return;
        }
        if state.elem_holds_disabled() {
            state.inc_dead(len);
            self.stage_if_drained(id);
            return;
        }
        state.inc_hold(len);
        self.elem_holds.record(ElemHold { entry: r, len });
    }

    /// Count `n` elements of `buffer_id` as dead.
    pub fn inc_dead(&mut self, buffer_id: BufferId, n: u32) {
        let state = &mut self.states[buffer_id.index()];
        assert!(
            state.status() != BufferStatus::Free,
            "inc_dead({buffer_id}): buffer is free"
        );
        if state.is_buffer_held() {
            return;
        }
        state.inc_dead(n);
        self.stage_if_drained(buffer_id);
    }

    /// Put a retired buffer on hold as a whole.
    ///
    /// All of its used elements count as held from now on, and the slot
    /// returns to Free at the first trim whose watermark passes the
    /// generation of the next transfer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is a type's active buffer, free, or already
    /// held as a whole.
    pub fn hold_buffer(&mut self, buffer_id: BufferId) {
        let state = &self.states[buffer_id.index()];
        assert!(
            state.status() == BufferStatus::Held && !state.is_buffer_held(),
            "hold_buffer({buffer_id}): buffer is {} (whole-buffer hold: {}); \
             switch away from it first",
            state.status(),
            state.is_buffer_held()
        );
        self.stage_buffer_hold(buffer_id);
    }

    /// Stamp all pending holds with `generation`.
    pub fn transfer_hold_lists(&mut self, generation: Generation) {
        let elems = self.elem_holds.pending_len();
        let buffers = self.buffer_holds.pending_len();
        self.elem_holds.transfer(generation);
        self.buffer_holds.transfer(generation);
        trace!(generation = %generation, elems, buffers, "transferred hold lists");
    }

    /// Release every hold stamped before `used_generation`.
    ///
    /// Element holds go first: their ranges become dead, are cleaned, and
    /// may feed free lists or drain a retired buffer. Buffer holds follow,
    /// returning slots to Free and dropping fallback storage.
    ///
    /// # Panics
    ///
    /// Panics if `used_generation` is older than the previous watermark.
    pub fn trim_hold_lists(&mut self, used_generation: Generation) {
        assert!(
            used_generation >= self.last_trim,
            "trim watermark moved backwards: {used_generation} < {}",
            self.last_trim
        );
        self.last_trim = used_generation;

        let mut elems = 0usize;
        while let Some(hold) = self.elem_holds.pop_released(used_generation) {
            self.release_elem_hold(hold);
            elems += 1;
        }
        let mut buffers = 0usize;
        while let Some(hold) = self.buffer_holds.pop_released(used_generation) {
            self.release_buffer_hold(hold);
            buffers += 1;
        }
        trace!(used_generation = %used_generation, elems, buffers, "trimmed hold lists");
    }

    /// Release every hold regardless of generation.
    ///
    /// For teardown, when no reader can be active.
    pub fn clear_hold_lists(&mut self) {
        let elems: Vec<_> = self.elem_holds.clear().collect();
        for hold in elems {
            self.release_elem_hold(hold);
        }
        let buffers: Vec<_> = self.buffer_holds.clear().collect();
        for hold in buffers {
            self.release_buffer_hold(hold);
        }
        debug!("cleared hold lists");
    }

    /// Whether element holds are waiting for a transfer.
    pub fn has_elem_hold_pending(&self) -> bool {
        self.elem_holds.has_pending()
    }

    /// Element holds, pending and stamped.
    pub fn elem_hold_list(&self) -> &HoldLedger<ElemHold> {
        &self.elem_holds
    }

    /// Buffer-level holds, pending and stamped.
    pub fn buffer_hold_list(&self) -> &HoldLedger<BufferHold<T>> {
        &self.buffer_holds
    }

    /// Enable free lists on every active fixed-size buffer, and for
    /// buffers activated later.
    ///
    /// With free lists on, [`free_elem`](Self::free_elem) and released
    /// holds feed slots straight back to `alloc`. The caller must only free
    /// entries it has already unpublished from every reader-visible index.
    pub fn enable_free_lists(&mut self) {
        self.free_lists_enabled = true;
        for state in &mut self.states {
            if state.status() == BufferStatus::Active && state.entry_size().is_fixed() {
                state.set_free_list_enabled(true);
            }
        }
        debug!("enabled free lists");
    }

    /// Disable free lists everywhere and forget all reusable slots.
    pub fn disable_free_lists(&mut self) {
        self.free_lists_enabled = false;
        for i in 0..self.states.len() {
            self.disable_free_list(BufferId(i as u32));
        }
        debug!("disabled free lists");
    }

    /// Enable the free list of one active fixed-size buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not active or stores variable-length entries.
    pub fn enable_free_list(&mut self, buffer_id: BufferId) {
        let state = &mut self.states[buffer_id.index()];
        assert!(
            state.status() == BufferStatus::Active && state.entry_size().is_fixed(),
            "enable_free_list({buffer_id}): needs an active buffer with fixed-size entries"
        );
        state.set_free_list_enabled(true);
    }

    /// Disable the free list of one buffer. Slots already on the list are
    /// dropped from it and stay dead.
    pub fn disable_free_list(&mut self, buffer_id: BufferId) {
        let state = &mut self.states[buffer_id.index()];
        if !state.free_list_enabled() {
            return;
        }
        state.set_free_list_enabled(false);
        if let Some(type_id) = state.type_id() {
            self.free_lists.purge_buffer(type_id, buffer_id);
        }
    }

    /// Stop recording element holds in every buffer, including buffers
    /// activated later. Holds already recorded are still released by trim.
    pub fn disable_elem_hold_lists(&mut self) {
        self.elem_holds_enabled = false;
        for state in &mut self.states {
            if state.status() != BufferStatus::Free {
                state.disable_elem_holds();
            }
        }
        debug!("disabled element hold lists");
    }

    /// Stop recording element holds for one buffer; later holds are
    /// counted as dead at once.
    pub fn disable_elem_hold_list(&mut self, buffer_id: BufferId) {
        let state = &mut self.states[buffer_id.index()];
        assert!(
            state.status() != BufferStatus::Free,
            "disable_elem_hold_list({buffer_id}): buffer is free"
        );
        state.disable_elem_holds();
    }

    /// Element and buffer accounting over the whole pool.
    pub fn mem_stats(&self) -> MemStats {
        let mut stats = MemStats::default();
        for state in &self.states {
            stats.add_buffer(state, std::mem::size_of::<T>());
        }
        stats
    }

    /// Element and buffer accounting over the buffers of one type.
    pub fn type_mem_stats(&self, type_id: BufferTypeId) -> MemStats {
        let mut stats = MemStats::default();
        for state in self.states.iter().filter(|s| s.type_id() == Some(type_id)) {
            stats.add_buffer(state, std::mem::size_of::<T>());
        }
        stats
    }

    /// Byte-level usage, including storage kept alive by fallback resizes.
    pub fn memory_usage(&self) -> MemoryUsage {
        let fallback_elems: u64 = self
            .buffer_holds
            .pending()
            .chain(self.buffer_holds.stamped().map(|(hold, _)| hold))
            .map(|hold| match hold {
                BufferHold::Fallback(f) => u64::from(f.capacity()),
                BufferHold::Buffer(_) => 0,
            })
            .sum();
        let fallback_bytes = fallback_elems * std::mem::size_of::<T>() as u64;
        MemoryUsage::from_stats(&self.mem_stats(), fallback_bytes)
    }

    /// State of one buffer slot.
    pub fn buffer_state(&self, buffer_id: BufferId) -> &BufferState<T> {
        &self.states[buffer_id.index()]
    }

    /// The buffer `type_id` currently allocates from.
    pub fn active_buffer_id(&self, type_id: BufferTypeId) -> Result<BufferId, ArenaError> {
        Ok(self.types.get(type_id)?.active)
    }

    /// The type a buffer belongs to, if it is not free.
    pub fn type_id_of(&self, buffer_id: BufferId) -> Option<BufferTypeId> {
        self.states.get(buffer_id.index())?.type_id()
    }

    /// Registered types.
    pub fn types(&self) -> &TypeTable<T> {
        &self.types
    }

    /// Number of slots in the buffer pool.
    pub fn num_buffers(&self) -> u32 {
        self.config.num_buffers
    }

    /// Configuration the arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Number of reusable free-list slots for `type_id`.
    pub fn free_list_len(&self, type_id: BufferTypeId) -> usize {
        self.free_lists.len(type_id)
    }

    /// A lock-free read view for other threads.
    pub fn reader(&self) -> ArenaReader<T> {
        ArenaReader::new(Arc::clone(&self.table))
    }

    /// Activate a Free slot with fresh storage for `type_id`.
    fn activate(
        &mut self,
        buffer_id: BufferId,
        type_id: BufferTypeId,
        capacity: u32,
    ) -> Result<(), ArenaError> {
        let entry = self.types.get(type_id)?;
        let mut elems = vec![T::default(); capacity as usize];
        entry.descriptor.initialize(&mut elems);
        let storage = Arc::new(RawBuffer::from_vec(elems, entry.meta.entry_size));
        self.table.publish(buffer_id, &storage);
        let state = &mut self.states[buffer_id.index()];
        state.on_active(type_id, storage, self.free_lists_enabled);
        if !self.elem_holds_enabled {
            state.disable_elem_holds();
        }
        self.types.get_mut(type_id)?.active = buffer_id;
        trace!(buffer = %buffer_id, type_id = %type_id, capacity, "activated buffer");
        Ok(())
    }

    /// First Free slot, scanning round-robin after `after` (or from 0).
    fn find_free_buffer(&self, after: Option<BufferId>) -> Option<BufferId> {
        let n = self.states.len();
        let start = after.map_or(0, |id| id.index() + 1);
        (0..n)
            .map(|i| (start + i) % n)
            .find(|&i| self.states[i].status() == BufferStatus::Free)
            .map(|i| BufferId(i as u32))
    }

    /// Active -> Held for a buffer that a type switched away from.
    fn retire_buffer(&mut self, buffer_id: BufferId) {
        let state = &mut self.states[buffer_id.index()];
        state.on_retire();
        if let Some(type_id) = state.type_id() {
            self.free_lists.purge_buffer(type_id, buffer_id);
        }
        self.stage_if_drained(buffer_id);
    }

    fn stage_if_drained(&mut self, buffer_id: BufferId) {
        if self.states[buffer_id.index()].is_drained() {
            self.stage_buffer_hold(buffer_id);
        }
    }

    fn stage_buffer_hold(&mut self, buffer_id: BufferId) {
        let state = &mut self.states[buffer_id.index()];
        state.on_hold();
        let hold_elems = state.hold_elems();
        if let Some(type_id) = state.type_id() {
            self.free_lists.purge_buffer(type_id, buffer_id);
        }
        self.buffer_holds.record(BufferHold::Buffer(buffer_id));
        debug!(buffer = %buffer_id, hold_elems, "buffer put on hold");
    }

    fn release_elem_hold(&mut self, hold: ElemHold) {
        let id = hold.entry.buffer_id();
        let state = &mut self.states[id.index()];
        debug_assert!(
            state.status() != BufferStatus::Free,
            "element hold {} outlived its buffer",
            hold.entry
        );
        if state.status() == BufferStatus::Free || state.is_buffer_held() {
            return;
        }
        state.release_hold(hold.len);
        let Some(type_id) = state.type_id() else {
            return;
        };
        if let Ok(entry) = self.types.get(type_id) {
            state.raw().with_range_mut(hold.entry.offset(), hold.len, |elems| {
                entry.descriptor.clean_hold(elems)
            });
        }
        if state.free_list_enabled() && state.entry_size().fixed() == Some(hold.len) {
            self.free_lists.push(type_id, hold.entry);
        }
        self.stage_if_drained(id);
    }

    fn release_buffer_hold(&mut self, hold: BufferHold<T>) {
        match hold {
            BufferHold::Buffer(id) => self.done_hold_buffer(id),
            BufferHold::Fallback(old) => {
                debug!(
                    buffer = %old.buffer,
                    type_id = %old.type_id,
                    capacity = old.capacity(),
                    "released fallback storage"
                );
            }
        }
    }

    /// Held -> Free once the watermark has passed the buffer's hold.
    pub(crate) fn done_hold_buffer(&mut self, buffer_id: BufferId) {
        self.table.retract(buffer_id);
        let state = &mut self.states[buffer_id.index()];
        let type_id = state.type_id();
        let capacity = state.alloc_elems();
        drop(state.on_free());
        debug!(buffer = %buffer_id, type_id = ?type_id, capacity, "released buffer");
    }
}

impl<T: Element> Drop for BufferArena<T> {
    fn drop(&mut self) {
        // Readers may outlive the arena; leave them nothing to resolve.
        for i in 0..self.states.len() {
            self.table.retract(BufferId(i as u32));
        }
    }
}
