//! Owned collections.
//!
//! An owned collection is an ordered, deduplicated list of item references
//! scoped to one identity. One implementation, [`OwnedCollection`], serves all
//! three kinds; the entry type decides the shape (quantity, view timestamp) and
//! the kind decides placement:
//!
//! - unbounded kinds (cart, wishlist) append new items and keep their position
//!   on repeated adds
//! - bounded kinds (recently viewed) move an item to the front on every add and
//!   evict from the tail past capacity
//!
//! Every mutation returns the [`Change`]s needed to mirror it in remote
//! persistence. Changes are always full-state replaces so they can be applied
//! in any order without the client rejecting stale ones.

mod entry;
mod store;

pub use entry::{CartLine, Entry, SavedItem, ViewedItem};
pub use store::CollectionStore;
pub(crate) use store::{Session, SyncContext};

use std::collections::HashSet;

use carryover_core::{ItemId, ItemRecord};

/// A remote write implied by a collection mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Create or overwrite this record.
    Upsert(ItemRecord),
    /// Remove this item.
    Delete(ItemId),
    /// Remove every item.
    Clear,
}

/// A mutation requested by the UI, kept so it can be replayed after a merge.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mutation<E> {
    Add(E),
    Update(E),
    Remove(ItemId),
    Clear,
}

/// Ordered, deduplicated entries of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedCollection<E> {
    entries: Vec<E>,
}

impl<E> Default for OwnedCollection<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Entry> OwnedCollection<E> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from persisted records.
    ///
    /// Duplicates keep their first occurrence. Bounded kinds are sorted newest
    /// first before deduplication and then capped; the IDs that did not fit
    /// are returned so they can be deleted from the source.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = ItemRecord>) -> (Self, Vec<ItemId>) {
        let mut entries: Vec<E> = records.into_iter().map(E::from_record).collect();

        if E::KIND.capacity().is_some() {
            entries.sort_by(|a, b| b.recency().cmp(&a.recency()));
        }

        let mut seen = HashSet::new();
        entries.retain(|entry| seen.insert(entry.item_id()));

        let mut collection = Self { entries };
        let evicted = collection.evict_overflow();
        (collection, evicted)
    }

    /// Entries in display order.
    #[must_use]
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.position(item_id).is_some()
    }

    #[must_use]
    pub fn get(&self, item_id: ItemId) -> Option<&E> {
        self.entries.iter().find(|e| e.item_id() == item_id)
    }

    /// Persisted form of every entry, in display order.
    #[must_use]
    pub fn records(&self) -> Vec<ItemRecord> {
        self.entries.iter().map(Entry::to_record).collect()
    }

    /// Add an entry, or fold it into the existing entry for the same item.
    pub fn insert(&mut self, entry: E) -> Vec<Change> {
        if E::KIND.capacity().is_some() {
            return self.insert_front(entry);
        }

        match self.entries.iter_mut().find(|e| e.item_id() == entry.item_id()) {
            Some(existing) => {
                if existing.absorb(entry) {
                    vec![Change::Upsert(existing.to_record())]
                } else {
                    Vec::new()
                }
            }
            None => {
                let change = Change::Upsert(entry.to_record());
                self.entries.push(entry);
                vec![change]
            }
        }
    }

    /// Overwrite the entry for the same item in place. Absent items are ignored.
    pub fn update(&mut self, entry: E) -> Vec<Change> {
        match self.entries.iter_mut().find(|e| e.item_id() == entry.item_id()) {
            Some(existing) if *existing != entry => {
                *existing = entry;
                vec![Change::Upsert(existing.to_record())]
            }
            _ => Vec::new(),
        }
    }

    /// Remove the entry for an item. Absent items are ignored.
    pub fn remove(&mut self, item_id: ItemId) -> Vec<Change> {
        match self.position(item_id) {
            Some(index) => {
                self.entries.remove(index);
                vec![Change::Delete(item_id)]
            }
            None => Vec::new(),
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) -> Vec<Change> {
        self.entries.clear();
        vec![Change::Clear]
    }

    pub(crate) fn apply(&mut self, mutation: Mutation<E>) -> Vec<Change> {
        match mutation {
            Mutation::Add(entry) => self.insert(entry),
            Mutation::Update(entry) => self.update(entry),
            Mutation::Remove(item_id) => self.remove(item_id),
            Mutation::Clear => self.clear(),
        }
    }

    fn position(&self, item_id: ItemId) -> Option<usize> {
        self.entries.iter().position(|e| e.item_id() == item_id)
    }

    /// Move-to-front insert for bounded kinds.
    fn insert_front(&mut self, entry: E) -> Vec<Change> {
        let entry = match self.position(entry.item_id()) {
            Some(index) => {
                let mut existing = self.entries.remove(index);
                existing.absorb(entry);
                existing
            }
            None => entry,
        };

        let mut changes = vec![Change::Upsert(entry.to_record())];
        self.entries.insert(0, entry);
        changes.extend(self.evict_overflow().into_iter().map(Change::Delete));
        changes
    }

    /// Drop tail entries past capacity, returning their IDs.
    fn evict_overflow(&mut self) -> Vec<ItemId> {
        let Some(capacity) = E::KIND.capacity() else {
            return Vec::new();
        };

        if self.entries.len() <= capacity {
            return Vec::new();
        }

        self.entries
            .split_off(capacity)
            .iter()
            .map(Entry::item_id)
            .collect()
    }
}
