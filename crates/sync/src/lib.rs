//! Carryover sync engine.
//!
//! Keeps a storefront's cart, wishlist and recently-viewed list in memory and
//! carries guest activity into an account on login.
//!
//! # Architecture
//!
//! - [`collection`] - One generic owned collection, instantiated per kind, and
//!   the identity-aware store that routes its mutations
//! - [`coordinator`] - Login merge, logout reset and session following
//! - [`remote`] / [`local`] - Persistence adapters (HTTP and file, plus
//!   in-memory versions for tests)
//! - [`catalog`] - Synchronous catalog lookup and display views
//! - [`session`] - Identity transition emitter
//!
//! Mutations update memory synchronously. Account mutations are written
//! remotely in the background and are never rolled back on failure.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod collection;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod local;
pub mod notify;
pub mod remote;
pub mod session;
mod writer;

pub use catalog::{CartLineView, CartSummary, Catalog, CatalogCache, ItemView, resolve_list};
pub use collection::{CartLine, CollectionStore, Entry, SavedItem, ViewedItem};
pub use config::SyncConfig;
pub use coordinator::{MergeOutcome, MergeReport, SYNCED_MESSAGE, SyncCoordinator};
pub use error::{Result, SyncError};
pub use notify::{Notifier, NotifyLevel, TracingNotifier};
pub use session::SessionBoundary;
