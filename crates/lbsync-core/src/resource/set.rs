// # Identity Set
//
// An ordered-irrelevant collection of configuration records keyed by their
// identity hash. Inserting a record whose hash is already present replaces
// that slot, which is what lets the host diff additions, removals and
// in-place changes without caring about declaration order.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::hash::Identity;

/// Set of records keyed by [`Identity::identity_hash`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySet<T> {
    slots: BTreeMap<u32, T>,
}

impl<T> Default for IdentitySet<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<T: Identity> IdentitySet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the record previously occupying its slot
    pub fn insert(&mut self, record: T) -> Option<T> {
        self.slots.insert(record.identity_hash(), record)
    }

    /// Remove the record in the given slot
    pub fn remove(&mut self, hash: u32) -> Option<T> {
        self.slots.remove(&hash)
    }

    /// Remove every record with the given name
    ///
    /// Names are unique per kind in a valid aggregate, so this removes at most
    /// one record in practice.
    pub fn remove_named(&mut self, name: &str) -> Vec<T> {
        let hashes: Vec<u32> = self
            .slots
            .iter()
            .filter(|(_, record)| record.name() == name)
            .map(|(hash, _)| *hash)
            .collect();

        hashes
            .into_iter()
            .filter_map(|hash| self.slots.remove(&hash))
            .collect()
    }

    /// Replace the slot matching `record` and any record sharing its name
    ///
    /// Returns the records that were displaced.
    pub fn replace(&mut self, record: T) -> Vec<T> {
        let mut displaced = self.remove_named(record.name());
        if let Some(previous) = self.slots.remove(&record.identity_hash()) {
            displaced.push(previous);
        }
        self.insert(record);
        displaced
    }

    /// Look up a record by identity hash
    pub fn get(&self, hash: u32) -> Option<&T> {
        self.slots.get(&hash)
    }

    /// Look up a record by name
    pub fn find_by_name(&self, name: &str) -> Option<&T> {
        self.slots.values().find(|record| record.name() == name)
    }

    /// Whether the slot for `record` is occupied
    pub fn contains(&self, record: &T) -> bool {
        self.slots.contains_key(&record.identity_hash())
    }

    /// Identity hashes in ascending order
    pub fn hashes(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.keys().copied()
    }
}

impl<T> IdentitySet<T> {
    /// Iterate over the records in hash order
    pub fn iter(&self) -> btree_map::Values<'_, u32, T> {
        self.slots.values()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T: Identity> FromIterator<T> for IdentitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T: Identity> Extend<T> for IdentitySet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl<'a, T> IntoIterator for &'a IdentitySet<T> {
    type Item = &'a T;
    type IntoIter = btree_map::Values<'a, u32, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.values()
    }
}

impl<T> IntoIterator for IdentitySet<T> {
    type Item = T;
    type IntoIter = btree_map::IntoValues<u32, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_values()
    }
}

impl<T: Serialize> Serialize for IdentitySet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.slots.values())
    }
}

impl<'de, T> Deserialize<'de> for IdentitySet<T>
where
    T: Deserialize<'de> + Identity,
{
    /// Records that would share a slot are rejected rather than collapsed
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut set = Self::new();
        for record in Vec::<T>::deserialize(deserializer)? {
            let name = record.name().to_string();
            if set.insert(record).is_some() {
                return Err(D::Error::custom(format!(
                    "duplicate {} `{}`: records share every identifying field",
                    T::KIND,
                    name
                )));
            }
        }
        Ok(set)
    }
}
