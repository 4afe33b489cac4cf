//! Entry shapes for the three owned collections.

use carryover_core::{CollectionKind, ItemId, ItemRecord, Quantity};
use chrono::{DateTime, Utc};

/// An entry of an owned collection.
///
/// The collection logic is written once against this trait and instantiated
/// for [`CartLine`], [`SavedItem`] and [`ViewedItem`].
pub trait Entry: Clone + std::fmt::Debug + PartialEq + Send + Sync + 'static {
    /// The collection this entry shape belongs to.
    const KIND: CollectionKind;

    /// The referenced catalog item.
    fn item_id(&self) -> ItemId;

    /// Fold a repeated `add` of the same item into this entry.
    ///
    /// Returns `true` if the entry changed and must be persisted again.
    fn absorb(&mut self, incoming: Self) -> bool;

    /// Ordering key for recency-ordered kinds. Newer sorts first.
    fn recency(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Persisted form.
    fn to_record(&self) -> ItemRecord;

    /// Rebuild an entry from its persisted form, filling absent fields.
    fn from_record(record: ItemRecord) -> Self;
}

/// A cart line: an item and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: Quantity,
}

impl CartLine {
    #[must_use]
    pub const fn new(item_id: ItemId, quantity: Quantity) -> Self {
        Self { item_id, quantity }
    }
}

impl Entry for CartLine {
    const KIND: CollectionKind = CollectionKind::Cart;

    fn item_id(&self) -> ItemId {
        self.item_id
    }

    fn absorb(&mut self, incoming: Self) -> bool {
        self.quantity = self.quantity.saturating_add(incoming.quantity);
        true
    }

    fn to_record(&self) -> ItemRecord {
        ItemRecord::with_quantity(self.item_id, self.quantity)
    }

    fn from_record(record: ItemRecord) -> Self {
        Self::new(record.item_id, record.quantity.unwrap_or_default())
    }
}

/// A wishlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedItem {
    pub item_id: ItemId,
}

impl SavedItem {
    #[must_use]
    pub const fn new(item_id: ItemId) -> Self {
        Self { item_id }
    }
}

impl Entry for SavedItem {
    const KIND: CollectionKind = CollectionKind::Wishlist;

    fn item_id(&self) -> ItemId {
        self.item_id
    }

    fn absorb(&mut self, _incoming: Self) -> bool {
        false
    }

    fn to_record(&self) -> ItemRecord {
        ItemRecord::bare(self.item_id)
    }

    fn from_record(record: ItemRecord) -> Self {
        Self::new(record.item_id)
    }
}

/// A recently-viewed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewedItem {
    pub item_id: ItemId,
    pub viewed_at: DateTime<Utc>,
}

impl ViewedItem {
    #[must_use]
    pub const fn new(item_id: ItemId, viewed_at: DateTime<Utc>) -> Self {
        Self { item_id, viewed_at }
    }
}

impl Entry for ViewedItem {
    const KIND: CollectionKind = CollectionKind::RecentlyViewed;

    fn item_id(&self) -> ItemId {
        self.item_id
    }

    fn absorb(&mut self, incoming: Self) -> bool {
        self.viewed_at = self.viewed_at.max(incoming.viewed_at);
        true
    }

    fn recency(&self) -> Option<DateTime<Utc>> {
        Some(self.viewed_at)
    }

    fn to_record(&self) -> ItemRecord {
        ItemRecord::viewed(self.item_id, self.viewed_at)
    }

    // Records written before the backend stamped them sort as oldest.
    fn from_record(record: ItemRecord) -> Self {
        Self::new(
            record.item_id,
            record.viewed_at.unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }
}
