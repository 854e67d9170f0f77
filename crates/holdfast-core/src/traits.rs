//! Interfaces the arena consumes from its neighbours.

use crate::id::Generation;

/// Element types that can live in arena storage.
///
/// Elements are plain values: they are copied into freshly allocated slots,
/// default-initialised when storage is created, and reset when a held range
/// is released. Readers on other threads observe them through shared
/// references, hence `Send + Sync`.
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Element for T {}

/// Source of generation numbers and the reader watermark.
///
/// The arena never reads the tracker itself: the writer queries it and
/// passes the values into `transfer_hold_lists` / `trim_hold_lists`.
pub trait GenerationTracker {
    /// The generation readers pin when they start a read section now.
    fn current_generation(&self) -> Generation;

    /// The oldest generation any live reader may still be observing.
    ///
    /// Must be monotonically non-decreasing across calls. When no reader
    /// is active this equals [`current_generation`](Self::current_generation).
    fn oldest_used_generation(&self) -> Generation;
}
