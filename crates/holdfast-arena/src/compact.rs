//! Compaction: moving live entries out of fragmented buffers.
//!
//! The arena does not know which entries are live; the index that owns the
//! references does. Compaction is therefore a two-step protocol:
//!
//! 1. [`start_compact`](BufferArena::start_compact) (or
//!    [`start_compact_worst_buffer`](BufferArena::start_compact_worst_buffer))
//!    switches the type to a fresh active buffer and marks the source
//!    buffers as compacting.
//! 2. The caller re-allocates every live entry it finds in those buffers,
//!    republishes the new references, then calls
//!    [`finish_compact`](BufferArena::finish_compact). The sources go on hold
//!    as whole buffers and return to Free once readers move past them.

use holdfast_core::{BufferId, BufferTypeId, Element};
use smallvec::SmallVec;
use tracing::debug;

use crate::arena::BufferArena;
use crate::buffer::BufferStatus;
use crate::error::ArenaError;

impl<T: Element> BufferArena<T> {
    /// Begin compacting every buffer of `type_id`.
    ///
    /// Switches to a new active buffer and returns the ids of all earlier
    /// buffers of the type that still hold entries. Requires a Free slot;
    /// fails with `BufferIdsExhausted` otherwise, leaving the arena
    /// unchanged.
    pub fn start_compact(
        &mut self,
        type_id: BufferTypeId,
    ) -> Result<SmallVec<[BufferId; 4]>, ArenaError> {
        let active = self.switch_to_free_buffer(type_id, 0)?;
        let mut sources = SmallVec::new();
        for (i, state) in self.states.iter_mut().enumerate() {
            if state.type_id() == Some(type_id)
                && state.status() == BufferStatus::Held
                && !state.is_buffer_held()
                && !state.is_compacting()
            {
                state.set_compacting(true);
                sources.push(BufferId(i as u32));
            }
        }
        debug!(
            type_id = %type_id,
            active = %active,
            sources = ?sources.as_slice(),
            "started compaction"
        );
        Ok(sources)
    }

    /// Begin compacting the single buffer of `type_id` with the highest
    /// dead-to-used ratio.
    ///
    /// Returns `None` if no buffer of the type has dead elements. If the
    /// chosen buffer is the active one, the type switches away from it
    /// first; the buffer is marked compacting before it retires, so even a
    /// fully dead one waits for [`finish_compact`](Self::finish_compact).
    /// Ties go to the lowest buffer id.
    pub fn start_compact_worst_buffer(
        &mut self,
        type_id: BufferTypeId,
    ) -> Result<Option<BufferId>, ArenaError> {
        let active = self.active_buffer_id(type_id)?;
        let mut worst: Option<(BufferId, u64, u64)> = None;
        for (i, state) in self.states.iter().enumerate() {
            if state.type_id() != Some(type_id) || state.is_buffer_held() || state.is_compacting() {
                continue;
            }
            let dead = u64::from(state.dead_elems());
            let used = u64::from(state.used_elems());
            if dead == 0 {
                continue;
            }
            let better = match worst {
                None => true,
                Some((_, worst_dead, worst_used)) => dead * worst_used > worst_dead * used,
            };
            if better {
                worst = Some((BufferId(i as u32), dead, used));
            }
        }
        let Some((id, dead, used)) = worst else {
            return Ok(None);
        };
        self.states[id.index()].set_compacting(true);
        if id == active {
            if let Err(err) = self.switch_to_free_buffer(type_id, 0) {
                self.states[id.index()].set_compacting(false);
                return Err(err);
            }
        }
        debug!(type_id = %type_id, buffer = %id, dead, used, "started compaction of worst buffer");
        Ok(Some(id))
    }

    /// Put the compacted source buffers on hold.
    ///
    /// # Panics
    ///
    /// Panics if any id was not returned by a compaction start.
    pub fn finish_compact(&mut self, sources: &[BufferId]) {
        for &id in sources {
            assert!(
                self.states[id.index()].is_compacting(),
                "finish_compact: {id} is not being compacted"
            );
            self.hold_buffer(id);
        }
        debug!(sources = ?sources, "finished compaction");
    }
}
