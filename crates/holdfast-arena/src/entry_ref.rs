//! Packed entry references.
//!
//! An [`EntryRef`] is a single `u32` naming one entry: the high bits select
//! the buffer, the low bits give the element offset of the entry's first
//! element. References are plain values that index structures store and
//! hand to readers; they carry no lifetime and no generation.

use std::fmt;

use holdfast_core::BufferId;

/// Location of one entry in the arena.
///
/// Absence is expressed as `Option<EntryRef>`; there is no reserved
/// "invalid" bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryRef(u32);

impl EntryRef {
    /// Bits used for the element offset.
    pub const OFFSET_BITS: u32 = 22;

    /// Bits used for the buffer id.
    pub const BUFFER_BITS: u32 = u32::BITS - Self::OFFSET_BITS;

    /// Number of distinct buffer ids a reference can name.
    pub const MAX_BUFFERS: u32 = 1 << Self::BUFFER_BITS;

    /// Number of distinct offsets a reference can name.
    pub const OFFSET_SPACE: u32 = 1 << Self::OFFSET_BITS;

    /// Largest encodable offset.
    pub const MAX_OFFSET: u32 = Self::OFFSET_SPACE - 1;

    const OFFSET_MASK: u32 = Self::MAX_OFFSET;

    /// Pack a buffer id and element offset.
    ///
    /// Both parts are range-checked in debug builds only; the arena never
    /// produces out-of-range values because buffer capacities are bounded by
    /// [`OFFSET_SPACE`](Self::OFFSET_SPACE).
    #[inline]
    pub fn new(buffer: BufferId, offset: u32) -> Self {
        debug_assert!(
            buffer.0 < Self::MAX_BUFFERS,
            "buffer id {buffer} does not fit in {} bits",
            Self::BUFFER_BITS
        );
        debug_assert!(
            offset <= Self::MAX_OFFSET,
            "offset {offset} does not fit in {} bits",
            Self::OFFSET_BITS
        );
        Self((buffer.0 << Self::OFFSET_BITS) | (offset & Self::OFFSET_MASK))
    }

    /// The buffer holding the entry.
    #[inline]
    pub fn buffer_id(self) -> BufferId {
        BufferId(self.0 >> Self::OFFSET_BITS)
    }

    /// Element offset of the entry's first element.
    #[inline]
    pub fn offset(self) -> u32 {
        self.0 & Self::OFFSET_MASK
    }

    /// The packed representation.
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// Rebuild a reference from its packed representation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryRef(buf={}, off={})", self.buffer_id(), self.offset())
    }
}
