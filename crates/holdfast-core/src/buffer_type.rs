//! Per-type buffer descriptors.
//!
//! A [`BufferType`] tells the arena how large the buffers of one registered
//! type may be, how big each entry is, and how to construct and clean raw
//! element storage. The arena consumes descriptors; it never creates them.

use std::fmt;

use crate::traits::Element;

/// Size of the entries a buffer type stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntrySize {
    /// Every entry is exactly this many elements.
    ///
    /// Uniform entries are the only ones eligible for free-list reuse.
    Fixed(u32),
    /// Entries have caller-chosen lengths (e.g. posting arrays, strings).
    Variable,
}

impl EntrySize {
    /// The fixed entry length, if any.
    pub fn fixed(self) -> Option<u32> {
        match self {
            Self::Fixed(n) => Some(n),
            Self::Variable => None,
        }
    }

    /// Whether entries are uniform in size.
    pub fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

impl fmt::Display for EntrySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "fixed({n})"),
            Self::Variable => write!(f, "variable"),
        }
    }
}

/// Descriptor for one registered buffer type.
///
/// Capacities are counted in elements of `T`, not in entries.
pub trait BufferType<T: Element>: Send + Sync {
    /// Human-readable name (for diagnostics).
    fn name(&self) -> &str;

    /// Entry size for this type.
    fn entry_size(&self) -> EntrySize;

    /// Smallest buffer ever allocated for this type, in elements.
    fn min_elems(&self) -> u32;

    /// Largest buffer ever allocated for this type, in elements.
    fn max_elems(&self) -> u32;

    /// Multiplier applied to the previous buffer's capacity when a new
    /// buffer is activated.
    fn grow_factor(&self) -> u32 {
        2
    }

    /// Construct hook: prepare freshly allocated storage.
    fn initialize(&self, elems: &mut [T]) {
        elems.fill(T::default());
    }

    /// Destruct hook: clean a range whose hold has been released.
    fn clean_hold(&self, elems: &mut [T]) {
        elems.fill(T::default());
    }

    /// Size of one element in bytes.
    fn elem_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// Alignment of one element in bytes.
    fn elem_align(&self) -> usize {
        std::mem::align_of::<T>()
    }
}

/// Stock descriptor: entries of `T` with fixed or variable length.
#[derive(Clone, Debug)]
pub struct ArrayBufferType {
    name: String,
    entry_size: EntrySize,
    min_elems: u32,
    max_elems: u32,
    grow_factor: u32,
}

impl ArrayBufferType {
    /// Create a descriptor.
    ///
    /// # Panics
    ///
    /// Panics if `min_elems > max_elems`, if `max_elems` is zero, or if a
    /// fixed entry size is zero or larger than `max_elems`.
    pub fn new(
        name: impl Into<String>,
        entry_size: EntrySize,
        min_elems: u32,
        max_elems: u32,
    ) -> Self {
        let name = name.into();
        assert!(max_elems > 0, "buffer type '{name}': max_elems must be non-zero");
        assert!(
            min_elems <= max_elems,
            "buffer type '{name}': min_elems ({min_elems}) > max_elems ({max_elems})",
        );
        if let EntrySize::Fixed(n) = entry_size {
            assert!(
                n > 0 && n <= max_elems,
                "buffer type '{name}': fixed entry size {n} must be in 1..={max_elems}",
            );
        }
        Self {
            name,
            entry_size,
            min_elems,
            max_elems,
            grow_factor: 2,
        }
    }

    /// Fixed-size entries of `entry_len` elements.
    pub fn fixed(name: impl Into<String>, entry_len: u32, min_elems: u32, max_elems: u32) -> Self {
        Self::new(name, EntrySize::Fixed(entry_len), min_elems, max_elems)
    }

    /// Variable-length entries.
    pub fn variable(name: impl Into<String>, min_elems: u32, max_elems: u32) -> Self {
        Self::new(name, EntrySize::Variable, min_elems, max_elems)
    }

    /// Override the growth multiplier (minimum 1).
    pub fn with_grow_factor(mut self, grow_factor: u32) -> Self {
        self.grow_factor = grow_factor.max(1);
        self
    }
}

impl<T: Element> BufferType<T> for ArrayBufferType {
    fn name(&self) -> &str {
        &self.name
    }

    fn entry_size(&self) -> EntrySize {
        self.entry_size
    }

    fn min_elems(&self) -> u32 {
        self.min_elems
    }

    fn max_elems(&self) -> u32 {
        self.max_elems
    }

    fn grow_factor(&self) -> u32 {
        self.grow_factor
    }
}
