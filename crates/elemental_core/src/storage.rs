//! Flat entity arenas with stable integer handles.
//!
//! Entities reference each other by handle, never by pointer, so cyclic
//! relations (tile ↔ city ↔ building ↔ player) are plain data. Arenas are
//! ordered by handle; iterating one is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Declare a `u32` newtype handle.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Create a handle from its raw value.
            #[must_use]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            /// Raw handle value.
            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }
    };
}

pub(crate) use entity_id;

/// Handle-keyed entity storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<K: Ord, T> {
    entries: BTreeMap<K, T>,
    next_id: u32,
}

impl<K, T> Default for Arena<K, T>
where
    K: Copy + Ord + From<u32>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> Arena<K, T>
where
    K: Copy + Ord + From<u32>,
{
    /// Create an empty arena. Handles start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Handle the next insert will receive.
    #[must_use]
    pub fn next_id(&self) -> K {
        K::from(self.next_id)
    }

    /// Insert a value built from its own handle.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        let id = K::from(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, build(id));
        id
    }

    /// Remove an entry.
    pub fn remove(&mut self, id: K) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, id: K) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Look up an entry mutably.
    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    /// Whether the handle is live.
    #[must_use]
    pub fn contains(&self, id: K) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live handles in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<K> {
        self.entries.keys().copied().collect()
    }

    /// Iterate in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &T)> {
        self.entries.iter()
    }

    /// Iterate mutably in handle order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut T)> {
        self.entries.iter_mut()
    }

    /// Iterate values in handle order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Iterate values mutably in handle order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    /// Drop every entry matching `dead`, returning the removed handles.
    pub fn reap(&mut self, mut dead: impl FnMut(&T) -> bool) -> Vec<K> {
        let ids: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, value)| dead(value))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.entries.remove(id);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    entity_id!(
        /// Test handle.
        ThingId
    );

    #[test]
    fn test_handles_are_stable() {
        let mut arena: Arena<ThingId, &str> = Arena::new();
        let a = arena.insert_with(|_| "a");
        let b = arena.insert_with(|_| "b");
        assert_eq!(a, ThingId(1));
        assert_eq!(b, ThingId(2));

        arena.remove(a);
        let c = arena.insert_with(|_| "c");
        assert_eq!(c, ThingId(3), "handles are never reused");
        assert_eq!(arena.sorted_ids(), vec![b, c]);
    }

    #[test]
    fn test_insert_with_sees_own_id() {
        let mut arena: Arena<ThingId, ThingId> = Arena::new();
        let id = arena.insert_with(|id| id);
        assert_eq!(arena.get(id), Some(&id));
    }

    #[test]
    fn test_reap() {
        let mut arena: Arena<ThingId, i32> = Arena::new();
        for v in [1, -1, 2, -2] {
            arena.insert_with(|_| v);
        }
        let removed = arena.reap(|v| *v < 0);
        assert_eq!(removed, vec![ThingId(2), ThingId(4)]);
        assert_eq!(arena.len(), 2);
    }
}
