//! Catalog lookup and display views.
//!
//! Collections persist only item references. Display attributes are joined in
//! at read time through a [`Catalog`], which must answer synchronously; the
//! [`CatalogCache`] keeps recently resolved attributes in a `moka` cache that
//! the storefront fills as it fetches products.
//!
//! Items that no longer resolve (deleted products) are filtered from views and
//! left in persistence untouched.

use std::time::Duration;

use carryover_core::{ItemAttributes, ItemId, Price};
use moka::sync::Cache;
use tracing::{debug, warn};

use crate::collection::{CartLine, Entry};
use crate::config::CatalogConfig;
use crate::error::{Result, SyncError};

/// Synchronous source of item display attributes.
pub trait Catalog: Send + Sync {
    /// Attributes for an item, or `None` if it no longer exists.
    fn resolve(&self, item_id: ItemId) -> Option<ItemAttributes>;

    /// Like [`Catalog::resolve`], treating a miss as an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CatalogLookupMiss`] if the item does not resolve.
    fn lookup(&self, item_id: ItemId) -> Result<ItemAttributes> {
        self.resolve(item_id)
            .ok_or(SyncError::CatalogLookupMiss(item_id))
    }
}

/// Catalog backed by a bounded, expiring in-memory cache.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<ItemId, ItemAttributes>,
}

impl CatalogCache {
    /// Create a cache holding up to `capacity` items for `ttl` each.
    #[must_use]
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    #[must_use]
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.capacity, config.ttl)
    }

    /// Cache attributes under their own ID.
    pub fn insert(&self, item: ItemAttributes) {
        self.cache.insert(item.id, item);
    }

    /// Cache a batch of attributes.
    pub fn extend(&self, items: impl IntoIterator<Item = ItemAttributes>) {
        for item in items {
            self.insert(item);
        }
    }

    /// Forget an item, e.g. after it was deleted from the catalog.
    pub fn invalidate(&self, item_id: ItemId) {
        self.cache.invalidate(&item_id);
    }
}

impl Catalog for CatalogCache {
    fn resolve(&self, item_id: ItemId) -> Option<ItemAttributes> {
        self.cache.get(&item_id)
    }
}

/// A collection entry joined with its display attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView<E> {
    pub entry: E,
    pub item: ItemAttributes,
}

/// A cart line ready for display.
pub type CartLineView = ItemView<CartLine>;

impl CartLineView {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.item.price.times(self.entry.quantity)
    }
}

/// Join entries with their attributes, dropping entries that do not resolve.
pub fn resolve_list<E: Entry>(catalog: &dyn Catalog, entries: &[E]) -> Vec<ItemView<E>> {
    entries
        .iter()
        .filter_map(|entry| match catalog.lookup(entry.item_id()) {
            Ok(item) => Some(ItemView {
                entry: entry.clone(),
                item,
            }),
            Err(e) => {
                e.report();
                None
            }
        })
        .collect()
}

/// Resolved cart with totals.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub lines: Vec<CartLineView>,
    /// Sum of line totals. `None` for an empty cart.
    pub subtotal: Option<Price>,
    /// Total units across all lines.
    pub item_count: u32,
}

impl CartSummary {
    /// Resolve a cart and compute its totals.
    ///
    /// The subtotal is in the currency of the first line; lines priced in a
    /// different currency are shown but left out of the subtotal.
    #[must_use]
    pub fn resolve(catalog: &dyn Catalog, lines: &[CartLine]) -> Self {
        let lines = resolve_list(catalog, lines);

        let item_count = lines
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.entry.quantity.get()));

        let subtotal = lines.first().map(|first| {
            let currency = first.item.price.currency_code;
            lines.iter().fold(Price::zero(currency), |total, line| {
                let line_total = line.line_total();
                if line_total.currency_code == currency {
                    Price::new(total.amount + line_total.amount, currency)
                } else {
                    warn!(
                        item_id = %line.item.id,
                        "Cart line currency differs from cart currency, excluded from subtotal"
                    );
                    total
                }
            })
        });

        debug!(lines = lines.len(), item_count, "Resolved cart");

        Self {
            lines,
            subtotal,
            item_count,
        }
    }
}
