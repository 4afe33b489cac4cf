//! Remote persistence adapters.
//!
//! # Architecture
//!
//! - The remote store is the source of truth once an account is attached
//! - Every operation is keyed by (collection kind, user, item) and idempotent
//! - Writes are full-state replaces (upsert of quantity/presence, delete,
//!   clear), never deltas, so a late write can overwrite an earlier one safely
//!
//! # Implementations
//!
//! - [`HttpRemoteStore`] - REST-like JSON API over `reqwest`
//! - [`MemoryRemoteStore`] - in-process store with failure injection, for
//!   tests and demos

mod http;
mod memory;

pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;

use async_trait::async_trait;
use carryover_core::{CollectionKind, ItemId, ItemRecord, UserId};
use thiserror::Error;

/// Errors that can occur when talking to remote persistence.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// URL could not be built.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Remote store is unreachable.
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

/// Per-user durable storage for owned collections.
///
/// `list` returns records in whatever order the backend keeps them; callers
/// re-sort recency-ordered kinds by `viewed_at`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every record of a user's collection.
    async fn list(&self, kind: CollectionKind, user: UserId)
    -> Result<Vec<ItemRecord>, RemoteError>;

    /// Create or overwrite the record for `record.item_id`.
    async fn upsert(
        &self,
        kind: CollectionKind,
        user: UserId,
        record: &ItemRecord,
    ) -> Result<(), RemoteError>;

    /// Delete one record. Deleting a missing record succeeds.
    async fn delete(
        &self,
        kind: CollectionKind,
        user: UserId,
        item: ItemId,
    ) -> Result<(), RemoteError>;

    /// Delete every record of a user's collection.
    async fn clear(&self, kind: CollectionKind, user: UserId) -> Result<(), RemoteError>;
}
