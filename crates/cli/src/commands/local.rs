//! Local guest collection commands.
//!
//! # Environment Variables
//!
//! - `CARRYOVER_LOCAL_DIR` - Directory holding guest collections (default: .carryover)

use carryover_core::CollectionKind;
use carryover_sync::config::LocalConfig;
use carryover_sync::local::{FileLocalStore, LocalStore};
use tracing::info;

use super::{describe, kinds};

fn open() -> Result<FileLocalStore, Box<dyn std::error::Error>> {
    let config = LocalConfig::from_env()?;
    let store = FileLocalStore::from_config(&config);
    info!(dir = %store.dir().display(), "Using local directory");
    Ok(store)
}

/// Log guest collections.
///
/// # Errors
///
/// Returns an error if a collection cannot be read.
pub fn list(kind: Option<CollectionKind>) -> Result<(), Box<dyn std::error::Error>> {
    let store = open()?;

    for kind in kinds(kind) {
        let records = store.load(kind)?;
        info!("{kind}: {} item(s)", records.len());
        for record in &records {
            info!("  {}", describe(record));
        }
    }

    Ok(())
}

/// Forget guest collections.
///
/// # Errors
///
/// Returns an error if a collection cannot be removed.
pub fn clear(kind: Option<CollectionKind>) -> Result<(), Box<dyn std::error::Error>> {
    let store = open()?;

    for kind in kinds(kind) {
        store.clear(kind)?;
        info!("Cleared local {kind}");
    }

    Ok(())
}
