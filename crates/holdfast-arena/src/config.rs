//! Arena configuration parameters.

use crate::entry_ref::EntryRef;
use crate::error::ArenaError;

/// Configuration for the buffer arena.
///
/// Controls the size of the buffer pool and per-buffer limits. Validated
/// once by [`BufferArena::new`](crate::BufferArena::new); all values are
/// immutable after creation.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Number of buffer slots in the pool.
    ///
    /// Default: 1024, the most an [`EntryRef`] can address. Each registered
    /// type permanently occupies one slot for its active buffer, so this
    /// must be at least the number of types plus headroom for held buffers.
    pub num_buffers: u32,

    /// Upper bound on any single buffer's capacity, in elements.
    ///
    /// Default: 4_194_304 (the offset space of an [`EntryRef`]). Each
    /// type's own maximum is clamped to this value.
    pub max_elems_per_buffer: u32,

    /// Whether free lists start enabled for newly activated buffers of
    /// fixed-size types.
    ///
    /// Default: false. See
    /// [`BufferArena::enable_free_lists`](crate::BufferArena::enable_free_lists)
    /// for the reuse contract that enabling implies.
    pub free_lists: bool,
}

impl ArenaConfig {
    /// Default buffer pool size.
    pub const DEFAULT_NUM_BUFFERS: u32 = EntryRef::MAX_BUFFERS;

    /// Default per-buffer element limit.
    pub const DEFAULT_MAX_ELEMS_PER_BUFFER: u32 = EntryRef::OFFSET_SPACE;

    /// Create a config with the given number of buffer slots.
    ///
    /// Uses default values for all other parameters.
    pub fn new(num_buffers: u32) -> Self {
        Self {
            num_buffers,
            max_elems_per_buffer: Self::DEFAULT_MAX_ELEMS_PER_BUFFER,
            free_lists: false,
        }
    }

    /// Set the per-buffer element limit.
    pub fn with_max_elems_per_buffer(mut self, max_elems: u32) -> Self {
        self.max_elems_per_buffer = max_elems;
        self
    }

    /// Start with free lists enabled.
    pub fn with_free_lists(mut self, enabled: bool) -> Self {
        self.free_lists = enabled;
        self
    }

    /// Check the config against the reference encoding.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.num_buffers == 0 || self.num_buffers > EntryRef::MAX_BUFFERS {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "num_buffers must be in 1..={} (got {})",
                    EntryRef::MAX_BUFFERS,
                    self.num_buffers,
                ),
            });
        }
        if self.max_elems_per_buffer == 0 || self.max_elems_per_buffer > EntryRef::OFFSET_SPACE {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "max_elems_per_buffer must be in 1..={} (got {})",
                    EntryRef::OFFSET_SPACE,
                    self.max_elems_per_buffer,
                ),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NUM_BUFFERS)
    }
}
