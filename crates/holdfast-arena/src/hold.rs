//! Two-phase hold lists.
//!
//! Anything a reader might still observe is not released immediately. It is
//! first recorded in a ledger's pending list during a writer batch. At the
//! end of the batch [`HoldLedger::transfer`] stamps every pending item with
//! the generation current at that moment. [`HoldLedger::pop_released`] then
//! yields stamped items whose generation is strictly older than the oldest
//! generation any reader still uses.
//!
//! Stamps are non-decreasing from front to back, so release is always a
//! prefix of the queue.

use std::collections::VecDeque;
use std::sync::Arc;

use holdfast_core::{BufferId, BufferTypeId, Element, Generation};

use crate::entry_ref::EntryRef;
use crate::raw::RawBuffer;

/// An item stamped with the generation at which it became unreachable.
#[derive(Debug)]
struct Stamped<E> {
    item: E,
    generation: Generation,
}

/// Pending and generation-stamped holds of one kind.
#[derive(Debug)]
pub struct HoldLedger<E> {
    pending: Vec<E>,
    stamped: VecDeque<Stamped<E>>,
}

impl<E> HoldLedger<E> {
    /// An empty ledger.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            stamped: VecDeque::new(),
        }
    }

    /// Record an item that became unreachable during the current batch.
    #[inline]
    pub fn record(&mut self, item: E) {
        self.pending.push(item);
    }

    /// Stamp every pending item with `generation` and queue it for release.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `generation` is older than the newest
    /// stamp already queued.
    pub fn transfer(&mut self, generation: Generation) {
        if let Some(back) = self.stamped.back() {
            debug_assert!(
                generation >= back.generation,
                "transfer at {generation} after a transfer at {}",
                back.generation
            );
        }
        self.stamped.extend(
            self.pending
                .drain(..)
                .map(|item| Stamped { item, generation }),
        );
    }

    /// Pop the oldest stamped item if its generation is strictly older than
    /// `used_generation`.
    #[inline]
    pub fn pop_released(&mut self, used_generation: Generation) -> Option<E> {
        match self.stamped.front() {
            Some(front) if front.generation < used_generation => {
                self.stamped.pop_front().map(|s| s.item)
            }
            _ => None,
        }
    }

    /// Drain every item released under `used_generation`, oldest first.
    pub fn trim(&mut self, used_generation: Generation) -> impl Iterator<Item = E> + '_ {
        std::iter::from_fn(move || self.pop_released(used_generation))
    }

    /// Drain everything, pending and stamped, regardless of generation.
    pub fn clear(&mut self) -> impl Iterator<Item = E> + '_ {
        let stamped = self.stamped.drain(..).map(|s| s.item);
        stamped.chain(self.pending.drain(..))
    }

    /// Whether items are waiting for a transfer.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Items waiting for a transfer.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Items stamped and waiting for release.
    pub fn stamped_len(&self) -> usize {
        self.stamped.len()
    }

    /// Whether nothing is recorded at all.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.stamped.is_empty()
    }

    /// Iterate over pending items.
    pub fn pending(&self) -> impl Iterator<Item = &E> {
        self.pending.iter()
    }

    /// Iterate over stamped items with their stamps.
    pub fn stamped(&self) -> impl Iterator<Item = (&E, Generation)> {
        self.stamped.iter().map(|s| (&s.item, s.generation))
    }
}

impl<E> Default for HoldLedger<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A held element range inside one buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElemHold {
    /// First element of the range.
    pub entry: EntryRef,
    /// Number of elements.
    pub len: u32,
}

/// Old storage of a buffer that was grown in place.
///
/// Readers that resolved the buffer before the resize may still be reading
/// the old storage, so it lives until its stamp is released.
pub struct FallbackHold<T> {
    /// Buffer that was resized.
    pub buffer: BufferId,
    /// Type that owned the buffer.
    pub type_id: BufferTypeId,
    /// Elements in use when the copy was made.
    pub used_elems: u32,
    pub(crate) storage: Arc<RawBuffer<T>>,
}

impl<T: Element> FallbackHold<T> {
    /// Capacity of the retained storage, in elements.
    pub fn capacity(&self) -> u32 {
        self.storage.capacity()
    }
}

/// Buffer-level items awaiting release.
pub enum BufferHold<T> {
    /// A whole buffer whose slot returns to Free on release.
    Buffer(BufferId),
    /// Storage replaced by a fallback resize.
    Fallback(FallbackHold<T>),
}

impl<T> std::fmt::Debug for BufferHold<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffer(id) => f.debug_tuple("Buffer").field(id).finish(),
            Self::Fallback(h) => f
                .debug_struct("Fallback")
                .field("buffer", &h.buffer)
                .field("type_id", &h.type_id)
                .field("used_elems", &h.used_elems)
                .finish_non_exhaustive(),
        }
    }
}
