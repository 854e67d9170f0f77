//! Core types and traits for the holdfast buffer arena.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the arena and its callers:
//!
//! - strongly typed identifiers ([`BufferId`], [`BufferTypeId`], [`Generation`]),
//! - the two external interfaces the arena consumes: [`GenerationTracker`]
//!   (current generation and reader watermark) and [`BufferType`] (per-type
//!   sizing plus construct/clean hooks),
//! - [`GenerationHandler`], a lock-free tracker where readers pin the
//!   current generation through RAII [`GenerationGuard`]s.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer_type;
pub mod generation;
pub mod id;
pub mod traits;

pub use buffer_type::{ArrayBufferType, BufferType, EntrySize};
pub use generation::{GenerationGuard, GenerationHandler};
pub use id::{BufferId, BufferTypeId, Generation};
pub use traits::{Element, GenerationTracker};
