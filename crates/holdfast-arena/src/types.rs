//! Registered buffer types: `BufferTypeId` -> descriptor, sizing, active buffer.
//!
//! The [`TypeTable`] is keyed by type name and uses `IndexMap` so that a
//! type's id is simply its registration index: lookups by id are O(1)
//! positional accesses and iteration order is deterministic.

use indexmap::map::Entry;
use indexmap::IndexMap;

use holdfast_core::{BufferId, BufferType, BufferTypeId, Element, EntrySize};

use crate::error::ArenaError;

/// Sizing parameters captured from a descriptor at registration.
///
/// Stored separately from the descriptor so the hot allocation path reads
/// plain fields instead of making virtual calls.
#[derive(Clone, Debug)]
pub struct TypeMeta {
    /// Human-readable name (for diagnostics).
    pub name: String,
    /// Entry size of the type.
    pub entry_size: EntrySize,
    /// Smallest buffer allocated, in elements.
    pub min_elems: u32,
    /// Largest buffer allocated, in elements, after clamping to the arena's
    /// per-buffer limit.
    pub max_elems: u32,
    /// Capacity multiplier between consecutive buffers.
    pub grow_factor: u32,
}

impl TypeMeta {
    /// Capacity for the next buffer of this type.
    ///
    /// `max(min_elems, needed, prev_capacity * grow_factor)`, clamped to
    /// `max_elems`. Returns `None` if `needed` alone exceeds the maximum.
    pub fn next_capacity(&self, needed: u64, prev_capacity: u32) -> Option<u32> {
        if needed > u64::from(self.max_elems) {
            return None;
        }
        let grown = u64::from(prev_capacity) * u64::from(self.grow_factor);
        let wanted = u64::from(self.min_elems).max(needed).max(grown);
        Some(wanted.min(u64::from(self.max_elems)) as u32)
    }
}

/// A single registered type.
pub struct TypeEntry<T: Element> {
    /// Construct and destruct hooks.
    pub(crate) descriptor: Box<dyn BufferType<T>>,
    /// Sizing captured at registration.
    pub meta: TypeMeta,
    /// The buffer this type currently bump-allocates from.
    pub(crate) active: BufferId,
}

impl<T: Element> TypeEntry<T> {
    /// The buffer this type currently bump-allocates from.
    pub fn active_buffer(&self) -> BufferId {
        self.active
    }
}

/// All registered types in registration order.
pub struct TypeTable<T: Element> {
    entries: IndexMap<String, TypeEntry<T>>,
}

impl<T: Element> TypeTable<T> {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Register a descriptor, clamping its maximum to `max_elems_per_buffer`.
    ///
    /// The entry's active buffer is a placeholder until the arena activates
    /// one. Rejects duplicate names and descriptors whose fixed entries do
    /// not fit the clamped maximum.
    pub(crate) fn register(
        &mut self,
        descriptor: Box<dyn BufferType<T>>,
        max_elems_per_buffer: u32,
    ) -> Result<BufferTypeId, ArenaError> {
        let name = descriptor.name().to_string();
        let max_elems = descriptor.max_elems().min(max_elems_per_buffer);
        let entry_size = descriptor.entry_size();
        if max_elems == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: format!("buffer type '{name}' has a zero element maximum"),
            });
        }
        if let EntrySize::Fixed(n) = entry_size {
            if n == 0 || n > max_elems {
                return Err(ArenaError::InvalidConfig {
                    reason: format!(
                        "buffer type '{name}': fixed entry size {n} does not fit max_elems {max_elems}"
                    ),
                });
            }
        }
        let meta = TypeMeta {
            name: name.clone(),
            entry_size,
            min_elems: descriptor.min_elems().min(max_elems),
            max_elems,
            grow_factor: descriptor.grow_factor().max(1),
        };
        let id = BufferTypeId(self.entries.len() as u32);
        match self.entries.entry(name) {
            Entry::Occupied(e) => Err(ArenaError::InvalidConfig {
                reason: format!("buffer type '{}' is already registered", e.key()),
            }),
            Entry::Vacant(e) => {
                e.insert(TypeEntry {
                    descriptor,
                    meta,
                    active: BufferId(0),
                });
                Ok(id)
            }
        }
    }
}

impl<T: Element> TypeTable<T> {
    /// Look up a type's entry.
    #[inline]
    pub fn get(&self, type_id: BufferTypeId) -> Result<&TypeEntry<T>, ArenaError> {
        self.entries
            .get_index(type_id.index())
            .map(|(_, entry)| entry)
            .ok_or(ArenaError::UnknownType { type_id })
    }

    /// Look up a type's entry mutably.
    #[inline]
    pub(crate) fn get_mut(
        &mut self,
        type_id: BufferTypeId,
    ) -> Result<&mut TypeEntry<T>, ArenaError> {
        self.entries
            .get_index_mut(type_id.index())
            .map(|(_, entry)| entry)
            .ok_or(ArenaError::UnknownType { type_id })
    }

    /// Find a type by name.
    pub fn id_of(&self, name: &str) -> Option<BufferTypeId> {
        self.entries.get_index_of(name).map(|i| BufferTypeId(i as u32))
    }

    /// Iterate over all types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (BufferTypeId, &TypeEntry<T>)> {
        self.entries
            .values()
            .enumerate()
            .map(|(i, entry)| (BufferTypeId(i as u32), entry))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no type is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Element> Default for TypeTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfast_core::ArrayBufferType;

    fn table_with(types: Vec<ArrayBufferType>) -> TypeTable<u32> {
        let mut table = TypeTable::new();
        for t in types {
            table.register(Box::new(t), 1 << 20).unwrap();
        }
        table
    }

    #[test]
    fn ids_follow_registration_order() {
        let table = table_with(vec![
            ArrayBufferType::fixed("pairs", 2, 16, 1024),
            ArrayBufferType::variable("blobs", 64, 4096),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.id_of("pairs"), Some(BufferTypeId(0)));
        assert_eq!(table.id_of("blobs"), Some(BufferTypeId(1)));
        assert_eq!(table.get(BufferTypeId(1)).unwrap().meta.name, "blobs");

        let ids: Vec<_> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![BufferTypeId(0), BufferTypeId(1)]);
    }

    #[test]
    fn unknown_type_is_error() {
        let table = table_with(vec![]);
        assert!(table.is_empty());
        assert!(matches!(
            table.get(BufferTypeId(0)),
            Err(ArenaError::UnknownType { type_id: BufferTypeId(0) })
        ));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut table = table_with(vec![ArrayBufferType::variable("blobs", 64, 4096)]);
        let result = table.register(Box::new(ArrayBufferType::variable("blobs", 8, 64)), 1 << 20);
        assert!(matches!(result, Err(ArenaError::InvalidConfig { .. })));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn max_is_clamped_to_arena_limit() {
        let mut table = TypeTable::<u32>::new();
        let id = table
            .register(Box::new(ArrayBufferType::variable("big", 4096, 1 << 20)), 1024)
            .unwrap();
        let meta = &table.get(id).unwrap().meta;
        assert_eq!(meta.max_elems, 1024);
        assert_eq!(meta.min_elems, 1024);
    }

    #[test]
    fn fixed_entry_larger_than_clamped_max_rejected() {
        let mut table = TypeTable::<u32>::new();
        let result = table.register(Box::new(ArrayBufferType::fixed("wide", 64, 64, 4096)), 32);
        assert!(matches!(result, Err(ArenaError::InvalidConfig { .. })));
    }

    #[test]
    fn next_capacity_grows_geometrically() {
        let meta = TypeMeta {
            name: "t".into(),
            entry_size: EntrySize::Variable,
            min_elems: 16,
            max_elems: 100,
            grow_factor: 2,
        };
        assert_eq!(meta.next_capacity(0, 0), Some(16));
        assert_eq!(meta.next_capacity(20, 0), Some(20));
        assert_eq!(meta.next_capacity(1, 16), Some(32));
        assert_eq!(meta.next_capacity(1, 64), Some(100));
        assert_eq!(meta.next_capacity(101, 0), None);
    }
}
