//! Generation-protected typed buffer arena.
//!
//! A single writer allocates entries into typed buffers and hands out
//! compact [`EntryRef`]s; any number of reader threads resolve those
//! references without locks. Nothing a reader might still observe is
//! reclaimed until the oldest generation pinned by a reader has moved past
//! the generation at which it became unreachable.
//!
//! # Architecture
//!
//! ```text
//! BufferArena<T> (writer, &mut self)
//! ├── BufferState × num_buffers   Free → Active → Held → Free
//! ├── TypeTable                   name → descriptor, sizing, active buffer
//! ├── FreeListLayer               per type: reusable fixed-size slots
//! ├── HoldLedger<ElemHold>        element ranges: pending → stamped → released
//! ├── HoldLedger<BufferHold>      whole buffers and fallback storage
//! └── Arc<BufferTable>  ─────────▶ ArenaReader<T> (readers, lock-free)
//! ```
//!
//! # Reclamation
//!
//! - [`BufferArena::hold_elem`] defers an element range until trim.
//! - [`BufferArena::free_elem`] marks it dead at once, for ranges that were
//!   never visible to readers or are known to be unreachable.
//! - A buffer retired by a switch stays readable and is put on hold as a
//!   whole once all of its elements are dead.
//! - Compaction moves live entries out and holds the source buffers.
//!
//! # Safety
//!
//! `unsafe` is confined to `raw.rs` (storage and the atomic buffer table)
//! and `read.rs` (the reader entry points, whose contract ties resolution
//! to a held [`GenerationGuard`](holdfast_core::GenerationGuard)).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod buffer;
mod compact;
pub mod config;
pub mod entry_ref;
pub mod error;
pub mod free_list;
pub mod hold;
mod raw;
pub mod read;
pub mod stats;
pub mod types;

// Public re-exports for the primary API surface.
pub use arena::BufferArena;
pub use buffer::{BufferState, BufferStatus};
pub use config::ArenaConfig;
pub use entry_ref::EntryRef;
pub use error::ArenaError;
pub use hold::{BufferHold, ElemHold, FallbackHold, HoldLedger};
pub use read::ArenaReader;
pub use stats::{MemStats, MemoryUsage};
