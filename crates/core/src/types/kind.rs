//! Collection kinds.

use serde::{Deserialize, Serialize};

/// Maximum number of entries kept in the recently-viewed list.
pub const RECENTLY_VIEWED_CAPACITY: usize = 5;

/// Error returned when parsing an unknown collection kind.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid collection kind: {0} (expected cart, wishlist or recently_viewed)")]
pub struct UnknownKindError(pub String);

/// The three owned collections a visitor accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Items with a quantity, in insertion order.
    Cart,
    /// Saved items, in insertion order.
    Wishlist,
    /// Viewed items, most recent first, capacity-bounded.
    RecentlyViewed,
}

impl CollectionKind {
    /// Every collection kind, in the order merges report them.
    pub const ALL: [Self; 3] = [Self::Cart, Self::Wishlist, Self::RecentlyViewed];

    /// Stable identifier used in URLs, file names and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
            Self::RecentlyViewed => "recently_viewed",
        }
    }

    /// Upper bound on the number of entries, if the kind is bounded.
    ///
    /// Bounded kinds insert at the front and evict from the tail.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        match self {
            Self::Cart | Self::Wishlist => None,
            Self::RecentlyViewed => Some(RECENTLY_VIEWED_CAPACITY),
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CollectionKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "wishlist" => Ok(Self::Wishlist),
            "recently_viewed" | "recently-viewed" => Ok(Self::RecentlyViewed),
            _ => Err(UnknownKindError(s.to_owned())),
        }
    }
}
