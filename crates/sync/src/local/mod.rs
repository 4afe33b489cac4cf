//! Local (device) persistence adapters.
//!
//! Local persistence only carries guest activity until the next login. It is
//! synchronous, survives restarts, and is shared by every process using the
//! same directory; concurrent writers are not coordinated and the last save
//! wins.

mod file;
mod memory;

pub use file::FileLocalStore;
pub use memory::MemoryLocalStore;

use carryover_core::{CollectionKind, ItemRecord};
use thiserror::Error;

/// Errors that can occur when reading or writing local persistence.
#[derive(Debug, Error)]
pub enum LocalError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Atomic replace of the stored document failed.
    #[error("Persist error: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Device-local storage for guest collections.
pub trait LocalStore: Send + Sync {
    /// Load the saved collection. A collection never saved loads as empty.
    ///
    /// # Errors
    ///
    /// Returns error if the stored collection cannot be read.
    fn load(&self, kind: CollectionKind) -> Result<Vec<ItemRecord>, LocalError>;

    /// Replace the saved collection.
    ///
    /// # Errors
    ///
    /// Returns error if the collection cannot be written.
    fn save(&self, kind: CollectionKind, records: &[ItemRecord]) -> Result<(), LocalError>;

    /// Forget the saved collection.
    ///
    /// # Errors
    ///
    /// Returns error if the stored collection cannot be removed.
    fn clear(&self, kind: CollectionKind) -> Result<(), LocalError>;
}

/// Keep at most `capacity` records, dropping the oldest.
///
/// Append-ordered kinds hold their newest records at the tail; recency-ordered
/// kinds hold them at the head.
pub(crate) fn bounded(
    kind: CollectionKind,
    records: &[ItemRecord],
    capacity: usize,
) -> &[ItemRecord] {
    let capacity = kind.capacity().map_or(capacity, |cap| cap.min(capacity));
    if records.len() <= capacity {
        return records;
    }

    let kept = match kind.capacity() {
        Some(_) => records.get(..capacity),
        None => records.get(records.len() - capacity..),
    };
    kept.unwrap_or(records)
}
