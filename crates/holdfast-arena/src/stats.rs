//! Memory accounting snapshots.

use std::fmt;
use std::ops::AddAssign;

use crate::buffer::{BufferState, BufferStatus};

/// Element and buffer counts summed over buffer states.
///
/// Byte figures are element counts times the element size. Counts from
/// whole-buffer holds show up in `hold_elems`, not in `used_elems`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemStats {
    /// Capacity of all non-free buffers, in elements.
    pub alloc_elems: u64,
    /// Elements handed out by bump allocation.
    pub used_elems: u64,
    /// Used elements that are unreachable and released.
    pub dead_elems: u64,
    /// Elements awaiting generation-protected release.
    pub hold_elems: u64,
    /// `alloc_elems` in bytes.
    pub alloc_bytes: u64,
    /// `used_elems` in bytes.
    pub used_bytes: u64,
    /// `dead_elems` in bytes.
    pub dead_bytes: u64,
    /// `hold_elems` in bytes.
    pub hold_bytes: u64,
    /// Buffers in the Free state.
    pub free_buffers: u32,
    /// Buffers in the Active state.
    pub active_buffers: u32,
    /// Buffers in the Held state.
    pub hold_buffers: u32,
}

impl MemStats {
    /// Add one buffer's accounting.
    pub fn add_buffer<T>(&mut self, state: &BufferState<T>, elem_size: usize) {
        match state.status() {
            BufferStatus::Free => {
                self.free_buffers += 1;
                return;
            }
            BufferStatus::Active => self.active_buffers += 1,
            BufferStatus::Held => self.hold_buffers += 1,
        }
        let elem_size = elem_size as u64;
        let alloc = u64::from(state.alloc_elems());
        let used = u64::from(state.used_elems());
        let dead = u64::from(state.dead_elems());
        let hold = u64::from(state.hold_elems());
        self.alloc_elems += alloc;
        self.used_elems += used;
        self.dead_elems += dead;
        self.hold_elems += hold;
        self.alloc_bytes += alloc * elem_size;
        self.used_bytes += used * elem_size;
        self.dead_bytes += dead * elem_size;
        self.hold_bytes += hold * elem_size;
    }
}

impl AddAssign for MemStats {
    fn add_assign(&mut self, rhs: Self) {
        self.alloc_elems += rhs.alloc_elems;
        self.used_elems += rhs.used_elems;
        self.dead_elems += rhs.dead_elems;
        self.hold_elems += rhs.hold_elems;
        self.alloc_bytes += rhs.alloc_bytes;
        self.used_bytes += rhs.used_bytes;
        self.dead_bytes += rhs.dead_bytes;
        self.hold_bytes += rhs.hold_bytes;
        self.free_buffers += rhs.free_buffers;
        self.active_buffers += rhs.active_buffers;
        self.hold_buffers += rhs.hold_buffers;
    }
}

impl fmt::Display for MemStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "elems alloc={} used={} dead={} hold={}; buffers free={} active={} held={}",
            self.alloc_elems,
            self.used_elems,
            self.dead_elems,
            self.hold_elems,
            self.free_buffers,
            self.active_buffers,
            self.hold_buffers
        )
    }
}

/// Byte-level memory usage, including storage retained by fallback resizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes of all allocated storage.
    pub allocated_bytes: u64,
    /// Bytes handed out by bump allocation.
    pub used_bytes: u64,
    /// Bytes of dead elements.
    pub dead_bytes: u64,
    /// Bytes waiting on generation-protected release.
    pub allocated_bytes_on_hold: u64,
}

impl MemoryUsage {
    /// Build from element stats plus storage held outside any buffer slot.
    pub fn from_stats(stats: &MemStats, extra_held_bytes: u64) -> Self {
        Self {
            allocated_bytes: stats.alloc_bytes + extra_held_bytes,
            used_bytes: stats.used_bytes,
            dead_bytes: stats.dead_bytes,
            allocated_bytes_on_hold: stats.hold_bytes + extra_held_bytes,
        }
    }
}

impl AddAssign for MemoryUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.allocated_bytes += rhs.allocated_bytes;
        self.used_bytes += rhs.used_bytes;
        self.dead_bytes += rhs.dead_bytes;
        self.allocated_bytes_on_hold += rhs.allocated_bytes_on_hold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assign_sums_every_field() {
        let a = MemStats {
            alloc_elems: 10,
            used_elems: 6,
            dead_elems: 1,
            hold_elems: 2,
            alloc_bytes: 40,
            used_bytes: 24,
            dead_bytes: 4,
            hold_bytes: 8,
            free_buffers: 3,
            active_buffers: 1,
            hold_buffers: 1,
        };
        let mut total = MemStats::default();
        total += a;
        total += a;
        assert_eq!(total.alloc_elems, 20);
        assert_eq!(total.hold_bytes, 16);
        assert_eq!(total.free_buffers, 6);
    }

    #[test]
    fn usage_includes_fallback_storage() {
        let stats = MemStats {
            alloc_bytes: 100,
            used_bytes: 60,
            hold_bytes: 8,
            ..MemStats::default()
        };
        let usage = MemoryUsage::from_stats(&stats, 32);
        assert_eq!(usage.allocated_bytes, 132);
        assert_eq!(usage.allocated_bytes_on_hold, 40);
        assert_eq!(usage.used_bytes, 60);
    }

    #[test]
    fn display_is_compact() {
        let s = MemStats {
            free_buffers: 2,
            ..MemStats::default()
        };
        assert!(s.to_string().contains("free=2"));
    }
}
