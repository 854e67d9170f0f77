//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use holdfast_core::BufferTypeId;

/// Errors that can occur during arena operations.
///
/// All of these terminate the current writer operation; the arena does not
/// retry with smaller sizes or back off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A buffer of the requested size would exceed the type's maximum, or
    /// the pool has no free slot and the active buffer cannot grow.
    CapacityExceeded {
        /// The type being allocated.
        type_id: BufferTypeId,
        /// Elements needed in a single buffer.
        requested: u64,
        /// The type's effective per-buffer maximum.
        max_elems: u32,
    },
    /// No free buffer slot is left to give a type its own active buffer.
    BufferIdsExhausted {
        /// Size of the buffer pool.
        num_buffers: u32,
        /// Number of registered types at the time of failure.
        types: u32,
    },
    /// A `BufferTypeId` that is not registered in the arena.
    UnknownType {
        /// The unrecognised type.
        type_id: BufferTypeId,
    },
    /// A fixed-size type was given an entry of the wrong length.
    EntrySizeMismatch {
        /// The type being allocated.
        type_id: BufferTypeId,
        /// The type's fixed entry length.
        expected: u32,
        /// The length supplied.
        actual: usize,
    },
    /// Configuration or type registration parameters are invalid.
    InvalidConfig {
        /// Human-readable description of what is wrong.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                type_id,
                requested,
                max_elems,
            } => {
                write!(
                    f,
                    "capacity exceeded for type {type_id}: requested {requested} elements, max {max_elems} per buffer"
                )
            }
            Self::BufferIdsExhausted { num_buffers, types } => {
                write!(
                    f,
                    "buffer ids exhausted: {num_buffers} buffers, {types} registered types"
                )
            }
            Self::UnknownType { type_id } => {
                write!(f, "unknown buffer type: {type_id}")
            }
            Self::EntrySizeMismatch {
                type_id,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "type {type_id} stores {expected}-element entries, got {actual}"
                )
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid arena config: {reason}")
            }
        }
    }
}

impl Error for ArenaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_key_numbers() {
        let err = ArenaError::CapacityExceeded {
            type_id: BufferTypeId(2),
            requested: 5000,
            max_elems: 4096,
        };
        let msg = err.to_string();
        assert!(msg.contains("type 2"));
        assert!(msg.contains("5000"));
        assert!(msg.contains("4096"));

        let err = ArenaError::EntrySizeMismatch {
            type_id: BufferTypeId(0),
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "type 0 stores 4-element entries, got 3");
    }

    #[test]
    fn error_is_std_error() {
        fn takes_error(_: &dyn Error) {}
        takes_error(&ArenaError::UnknownType {
            type_id: BufferTypeId(9),
        });
    }
}
