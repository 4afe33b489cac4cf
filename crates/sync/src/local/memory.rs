//! In-process local store.

use std::collections::HashMap;

use carryover_core::{CollectionKind, ItemRecord};
use parking_lot::Mutex;

use super::{LocalError, LocalStore, bounded};

/// Local store kept in memory, for tests and embedding.
pub struct MemoryLocalStore {
    collections: Mutex<HashMap<CollectionKind, Vec<ItemRecord>>>,
    capacity: usize,
}

impl MemoryLocalStore {
    /// Create an empty store bounded to `capacity` records per kind.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Copy of a saved collection.
    #[must_use]
    pub fn snapshot(&self, kind: CollectionKind) -> Vec<ItemRecord> {
        self.collections
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new(100)
    }
}

impl LocalStore for MemoryLocalStore {
    fn load(&self, kind: CollectionKind) -> Result<Vec<ItemRecord>, LocalError> {
        Ok(self.snapshot(kind))
    }

    fn save(&self, kind: CollectionKind, records: &[ItemRecord]) -> Result<(), LocalError> {
        let kept = bounded(kind, records, self.capacity).to_vec();
        self.collections.lock().insert(kind, kept);
        Ok(())
    }

    fn clear(&self, kind: CollectionKind) -> Result<(), LocalError> {
        self.collections.lock().remove(&kind);
        Ok(())
    }
}
