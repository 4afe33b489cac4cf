//! CLI subcommands.

pub mod local;
pub mod merge;
pub mod remote;

use carryover_core::{CollectionKind, ItemRecord};

/// One-line description of a stored record.
pub fn describe(record: &ItemRecord) -> String {
    let mut line = format!("item {}", record.item_id);
    if let Some(quantity) = record.quantity {
        line.push_str(&format!(" x{quantity}"));
    }
    if let Some(viewed_at) = record.viewed_at {
        line.push_str(&format!(" (viewed {})", viewed_at.to_rfc3339()));
    }
    line
}

/// The given kind, or every kind.
pub fn kinds(kind: Option<CollectionKind>) -> Vec<CollectionKind> {
    kind.map_or_else(|| CollectionKind::ALL.to_vec(), |kind| vec![kind])
}
