//! File-backed local store.
//!
//! Each collection kind is one JSON document, `{dir}/{kind}.json`:
//!
//! ```json
//! { "version": 1, "items": [{ "item_id": 12, "quantity": 2 }] }
//! ```
//!
//! Documents are written to a temporary file in the same directory and then
//! renamed over the old one, so a crash mid-write never leaves a torn file.

use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use carryover_core::{CollectionKind, ItemRecord};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{LocalError, LocalStore, bounded};
use crate::config::LocalConfig;

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    items: Vec<ItemRecord>,
}

/// Local store writing one JSON document per collection kind.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    dir: PathBuf,
    capacity: usize,
}

impl FileLocalStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity,
        }
    }

    /// Create a store from configuration.
    #[must_use]
    pub fn from_config(config: &LocalConfig) -> Self {
        Self::new(config.dir.clone(), config.capacity)
    }

    /// Directory holding the documents.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, kind: CollectionKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.as_str()))
    }
}

impl LocalStore for FileLocalStore {
    fn load(&self, kind: CollectionKind) -> Result<Vec<ItemRecord>, LocalError> {
        let file = match fs::File::open(self.path(kind)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let document: Document = serde_json::from_reader(BufReader::new(file))?;
        if document.version != DOCUMENT_VERSION {
            warn!(
                kind = %kind,
                version = document.version,
                "Unknown local document version, reading anyway"
            );
        }

        Ok(document.items)
    }

    fn save(&self, kind: CollectionKind, records: &[ItemRecord]) -> Result<(), LocalError> {
        fs::create_dir_all(&self.dir)?;

        let kept = bounded(kind, records, self.capacity);
        if kept.len() < records.len() {
            debug!(
                kind = %kind,
                dropped = records.len() - kept.len(),
                "Local collection over capacity, dropping oldest entries"
            );
        }

        let document = Document {
            version: DOCUMENT_VERSION,
            items: kept.to_vec(),
        };

        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &document)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(self.path(kind))?;

        Ok(())
    }

    fn clear(&self, kind: CollectionKind) -> Result<(), LocalError> {
        match fs::remove_file(self.path(kind)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use carryover_core::{ItemId, Quantity};
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path(), 10);
        assert!(store.load(CollectionKind::Cart).unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path().join("nested"), 10);
        let records = vec![
            ItemRecord::with_quantity(ItemId::new(1), Quantity::new(3).unwrap()),
            ItemRecord::with_quantity(ItemId::new(2), Quantity::ONE),
        ];

        store.save(CollectionKind::Cart, &records).unwrap();
        assert_eq!(store.load(CollectionKind::Cart).unwrap(), records);

        // Another store over the same directory sees the same data.
        let reopened = FileLocalStore::new(dir.path().join("nested"), 10);
        assert_eq!(reopened.load(CollectionKind::Cart).unwrap(), records);
    }

    #[test]
    fn test_kinds_are_separate_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path(), 10);
        let viewed = vec![ItemRecord::viewed(ItemId::new(5), Utc::now())];

        store.save(CollectionKind::RecentlyViewed, &viewed).unwrap();
        assert!(dir.path().join("recently_viewed.json").exists());
        assert!(store.load(CollectionKind::Wishlist).unwrap().is_empty());
    }

    #[test]
    fn test_clear_removes_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path(), 10);
        store
            .save(CollectionKind::Wishlist, &[ItemRecord::bare(ItemId::new(1))])
            .unwrap();

        store.clear(CollectionKind::Wishlist).unwrap();
        assert!(store.load(CollectionKind::Wishlist).unwrap().is_empty());
        // Clearing twice is fine.
        store.clear(CollectionKind::Wishlist).unwrap();
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path(), 10);
        fs::write(dir.path().join("cart.json"), "not json").unwrap();

        assert!(matches!(
            store.load(CollectionKind::Cart),
            Err(LocalError::Serialization(_))
        ));
    }
}
