//! Holdfast: a generation-protected buffer arena with lock-free readers.
//!
//! This is the facade crate that re-exports the public API of the holdfast
//! sub-crates. For most users, adding `holdfast` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use holdfast::prelude::*;
//!
//! let mut arena = BufferArena::<u32>::new(ArenaConfig::new(16)).unwrap();
//! let pairs = arena
//!     .add_type(Box::new(ArrayBufferType::fixed("pairs", 2, 64, 4096)))
//!     .unwrap();
//!
//! let handler = GenerationHandler::new(4);
//! let reader = arena.reader();
//!
//! let r = arena.alloc(pairs, &[3, 4]).unwrap();
//! {
//!     let guard = handler.take_guard();
//!     // SAFETY: the guard is taken before `r` is handed to the reader, and
//!     // `r` stays reachable for the whole read section.
//!     let entry = unsafe { reader.get_entry(&guard, r) };
//!     assert_eq!(entry, &[3, 4]);
//! }
//!
//! // Retire the entry: hold it, then run one writer cycle.
//! arena.hold_elem(r, 2);
//! arena.transfer_hold_lists(handler.current_generation());
//! handler.inc_generation();
//! arena.trim_hold_lists(handler.oldest_used_generation());
//! assert_eq!(arena.buffer_state(r.buffer_id()).dead_elems(), 2);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `holdfast-arena` | Buffer arena, entry references, hold lists, reader view |
//! | [`types`] | `holdfast-core` | IDs, buffer type descriptors, generation tracking |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Buffer arena, hold lists, and reader view (`holdfast-arena`).
///
/// Most users only need [`arena::BufferArena`], [`arena::EntryRef`] and
/// [`arena::ArenaReader`], which are also in the [`prelude`].
pub use holdfast_arena as arena;

/// Identifiers, buffer type descriptors, and generation tracking
/// (`holdfast-core`).
///
/// Contains the [`types::BufferType`] and [`types::GenerationTracker`]
/// traits and the lock-free [`types::GenerationHandler`].
pub use holdfast_core as types;

/// Common imports for typical holdfast usage.
///
/// ```rust
/// use holdfast::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use holdfast_arena::{
        ArenaConfig, ArenaError, ArenaReader, BufferArena, BufferStatus, EntryRef, MemStats,
        MemoryUsage,
    };

    // Core types and traits
    pub use holdfast_core::{
        ArrayBufferType, BufferId, BufferType, BufferTypeId, Element, EntrySize, Generation,
        GenerationGuard, GenerationHandler, GenerationTracker,
    };
}
