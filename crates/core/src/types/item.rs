//! Item attributes and the persisted item record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ItemId;
use super::price::Price;
use super::quantity::Quantity;

/// Display attributes for a catalog entry.
///
/// Owned collections never persist these; they are re-resolved through the
/// catalog every time a collection is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttributes {
    /// Catalog ID.
    pub id: ItemId,
    /// URL handle (e.g., "pineapple-tee").
    pub handle: String,
    /// Product title.
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Primary image URL.
    pub image_url: Option<String>,
    /// Whether the item can currently be purchased.
    pub available: bool,
}

/// One entry of an owned collection as stored by a persistence adapter.
///
/// Cart records carry a quantity and recently-viewed records carry the time
/// of the view; wishlist records carry only the item ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item_id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
}

impl ItemRecord {
    /// A record holding only an item ID.
    #[must_use]
    pub const fn bare(item_id: ItemId) -> Self {
        Self {
            item_id,
            quantity: None,
            viewed_at: None,
        }
    }

    /// A cart record.
    #[must_use]
    pub const fn with_quantity(item_id: ItemId, quantity: Quantity) -> Self {
        Self {
            item_id,
            quantity: Some(quantity),
            viewed_at: None,
        }
    }

    /// A recently-viewed record.
    #[must_use]
    pub const fn viewed(item_id: ItemId, viewed_at: DateTime<Utc>) -> Self {
        Self {
            item_id,
            quantity: None,
            viewed_at: Some(viewed_at),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_record_omits_optional_fields() {
        let json = serde_json::to_string(&ItemRecord::bare(ItemId::new(4))).unwrap();
        assert_eq!(json, r#"{"item_id":4}"#);
    }

    #[test]
    fn test_cart_record_json() {
        let record = ItemRecord::with_quantity(ItemId::new(4), Quantity::new(2).unwrap());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"item_id":4,"quantity":2}"#);

        let parsed: ItemRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_record_with_zero_quantity_is_rejected() {
        let result = serde_json::from_str::<ItemRecord>(r#"{"item_id":4,"quantity":0}"#);
        assert!(result.is_err());
    }
}
