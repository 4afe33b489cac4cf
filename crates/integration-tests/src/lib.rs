//! Integration tests for Carryover.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p carryover-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `merge` - Login merge properties (remote wins, local fills gaps, idempotency)
//! - `session` - Logout, account switching, cancellation and the session runner
//! - `collections` - Mutation routing, eviction and quantity validation
//! - `persistence` - File-backed guest state across restarts
//!
//! Every test drives a real [`SyncCoordinator`] over the in-memory adapters,
//! so no network or database is needed.

use std::sync::Arc;

use carryover_core::{ItemId, ItemRecord};
use carryover_sync::local::{LocalStore, MemoryLocalStore};
use carryover_sync::remote::{MemoryRemoteStore, RemoteStore};
use carryover_sync::{Entry, Notifier, NotifyLevel, SyncCoordinator};
use parking_lot::Mutex;

/// Notifier that remembers every message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, NotifyLevel)>>,
}

impl RecordingNotifier {
    /// Messages received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<(String, NotifyLevel)> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        self.messages.lock().push((message.to_string(), level));
    }
}

/// A coordinator wired to in-memory adapters the test can inspect.
pub struct Harness {
    pub remote: Arc<MemoryRemoteStore>,
    pub local: Arc<MemoryLocalStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub coordinator: SyncCoordinator,
}

impl Harness {
    /// Build a guest coordinator. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let remote = Arc::new(MemoryRemoteStore::new());
        let local = Arc::new(MemoryLocalStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = SyncCoordinator::new(
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            Arc::clone(&local) as Arc<dyn LocalStore>,
            Some(Arc::clone(&notifier) as Arc<dyn Notifier>),
        );

        Self {
            remote,
            local,
            notifier,
            coordinator,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw item IDs of entries, in order.
#[must_use]
pub fn ids<E: Entry>(entries: &[E]) -> Vec<i32> {
    entries.iter().map(|e| e.item_id().as_i32()).collect()
}

/// Raw item IDs of records, sorted, for order-insensitive comparison.
#[must_use]
pub fn sorted_ids(records: &[ItemRecord]) -> Vec<i32> {
    let mut ids: Vec<i32> = records.iter().map(|r| r.item_id.as_i32()).collect();
    ids.sort_unstable();
    ids
}

/// Shorthand for an item ID.
#[must_use]
pub const fn item(id: i32) -> ItemId {
    ItemId::new(id)
}
