//! Unified error handling with Sentry integration.
//!
//! Provides the `SyncError` type shared by the collection stores and the sync
//! coordinator. Background failures (remote writes, local persistence) are
//! never returned to the caller; they are reported through [`SyncError::report`],
//! which logs them and captures them to Sentry.

use carryover_core::{CollectionKind, ItemId, QuantityError, UserId};
use thiserror::Error;

use crate::local::LocalError;
use crate::remote::RemoteError;

/// Error type for the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A cart quantity below 1 was requested.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// A remote persistence write failed.
    #[error("Remote write failed for {kind}: {source}")]
    RemoteWriteFailed {
        kind: CollectionKind,
        #[source]
        source: RemoteError,
    },

    /// A remote persistence read failed.
    #[error("Remote read failed for {kind}: {source}")]
    RemoteReadFailed {
        kind: CollectionKind,
        #[source]
        source: RemoteError,
    },

    /// Local persistence could not be read or written.
    #[error("Local persistence failed for {kind}: {source}")]
    LocalPersistence {
        kind: CollectionKind,
        #[source]
        source: LocalError,
    },

    /// An item no longer resolves in the catalog.
    #[error("Catalog lookup miss: {0}")]
    CatalogLookupMiss(ItemId),

    /// The session changed while a merge was in flight.
    #[error("Merge for {kind} superseded by a session change")]
    MergeCancelled { kind: CollectionKind },
}

impl SyncError {
    /// Log the error and, for infrastructure failures, capture it to Sentry.
    ///
    /// Call this wherever a failure is swallowed instead of propagated.
    pub fn report(&self) {
        match self {
            Self::RemoteWriteFailed { kind, .. }
            | Self::RemoteReadFailed { kind, .. }
            | Self::LocalPersistence { kind, .. } => {
                let event_id = sentry::capture_error(self);
                tracing::warn!(
                    error = %self,
                    kind = %kind,
                    sentry_event_id = %event_id,
                    "Sync error"
                );
            }
            Self::InvalidQuantity(_) | Self::CatalogLookupMiss(_) | Self::MergeCancelled { .. } => {
                tracing::debug!(error = %self, "Sync error");
            }
        }
    }

    /// Whether this error represents a user-visible validation failure.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::InvalidQuantity(_))
    }
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Set the Sentry user context when an account attaches.
pub fn set_sentry_user(user_id: UserId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context when the account detaches.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for sync activity.
///
/// Breadcrumbs appear in Sentry error reports to show the session transitions
/// and merges leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("session", "Account attached", Some(&[("user_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
