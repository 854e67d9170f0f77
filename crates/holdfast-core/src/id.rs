//! Strongly-typed identifiers shared by the arena and its callers.

use std::fmt;

/// Identifies one slot in the arena's fixed-size buffer pool.
///
/// Buffer ids are dense: `BufferId(n)` is the n-th slot, and the pool size
/// is bounded by the width of the buffer field in an entry reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl BufferId {
    /// The slot index as a `usize`, for indexing state tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BufferId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a buffer type registered with an arena.
///
/// Types are registered once and assigned sequential ids in registration
/// order. `BufferTypeId(n)` is the n-th registered type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferTypeId(pub u32);

impl BufferTypeId {
    /// The type index as a `usize`, for indexing per-type tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BufferTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BufferTypeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// A write-epoch marker.
///
/// Generations increase monotonically. Readers capture the current
/// generation before dereferencing arena memory; storage held at
/// generation `g` may only be released once every reader has moved
/// past `g`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl Generation {
    /// The first generation.
    pub const ZERO: Generation = Generation(0);

    /// The generation immediately after this one.
    ///
    /// # Panics
    ///
    /// Panics on `u64` overflow.
    pub fn next(self) -> Generation {
        Generation(
            self.0
                .checked_add(1)
                .expect("generation counter overflow"),
        )
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Generation {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_ordering_follows_counter() {
        assert!(Generation(4) < Generation(5));
        assert_eq!(Generation(4).next(), Generation(5));
        assert_eq!(Generation::default(), Generation::ZERO);
    }

    #[test]
    #[should_panic(expected = "generation counter overflow")]
    fn generation_next_panics_on_overflow() {
        let _ = Generation(u64::MAX).next();
    }

    #[test]
    fn ids_display_as_plain_numbers() {
        assert_eq!(BufferId(7).to_string(), "7");
        assert_eq!(BufferTypeId(3).to_string(), "3");
        assert_eq!(Generation(11).to_string(), "11");
    }

    #[test]
    fn index_matches_inner_value() {
        assert_eq!(BufferId::from(9).index(), 9);
        assert_eq!(BufferTypeId::from(2).index(), 2);
    }
}
