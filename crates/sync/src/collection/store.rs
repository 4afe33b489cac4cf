//! Identity-aware collection store.
//!
//! A [`CollectionStore`] owns the in-memory collection of one kind and routes
//! every mutation to the persistence side matching the current identity:
//! guest mutations are saved to local persistence synchronously, account
//! mutations are queued on the background remote writer.
//!
//! While a login merge is in flight the store holds a merge window. Mutations
//! made inside the window are applied to memory immediately and remembered;
//! when the merge installs the canonical remote result they are replayed on
//! top of it and only then written remotely.
//!
//! Lock order is session first, then store state. Session transitions take the
//! session lock for writing and clear every store while holding it, so no
//! mutation can observe a new identity together with the previous identity's
//! items.

use std::sync::Arc;

use carryover_core::{CollectionKind, Identity, ItemId, ItemRecord, Quantity};
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{CartLine, Change, Entry, Mutation, OwnedCollection, SavedItem, ViewedItem};
use crate::error::{Result, SyncError};
use crate::local::LocalStore;
use crate::writer::{PendingWrite, RemoteWriter};

/// Identity snapshot shared by every store of one coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Session {
    pub identity: Identity,
    /// Bumped on every identity transition.
    pub generation: u64,
}

/// State shared between the coordinator and its stores.
pub(crate) struct SyncContext {
    pub session: RwLock<Session>,
    pub writer: RemoteWriter,
    pub local: Arc<dyn LocalStore>,
}

struct MergeWindow<E> {
    generation: u64,
    /// Collection as it was when the window opened.
    base: OwnedCollection<E>,
    deferred: Vec<Mutation<E>>,
}

struct StoreState<E> {
    items: OwnedCollection<E>,
    window: Option<MergeWindow<E>>,
}

struct StoreInner<E> {
    state: RwLock<StoreState<E>>,
    merge_lock: Mutex<()>,
    context: Arc<SyncContext>,
}

/// In-memory owned collection of one kind, bound to the current identity.
///
/// Cloning is cheap and every clone sees the same collection.
pub struct CollectionStore<E> {
    inner: Arc<StoreInner<E>>,
}

impl<E> Clone for CollectionStore<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entry> CollectionStore<E> {
    pub(crate) fn new(context: Arc<SyncContext>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState {
                    items: OwnedCollection::new(),
                    window: None,
                }),
                merge_lock: Mutex::new(()),
                context,
            }),
        }
    }

    /// The collection kind this store holds.
    #[must_use]
    pub const fn kind(&self) -> CollectionKind {
        E::KIND
    }

    /// Entries in display order.
    #[must_use]
    pub fn list(&self) -> Vec<E> {
        self.inner.state.read().items.entries().to_vec()
    }

    /// Persisted form of the entries in display order.
    #[must_use]
    pub fn records(&self) -> Vec<ItemRecord> {
        self.inner.state.read().items.records()
    }

    #[must_use]
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.inner.state.read().items.contains(item_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.read().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.read().items.is_empty()
    }

    /// Whether a login merge for this kind has not installed its result yet.
    #[must_use]
    pub fn is_merging(&self) -> bool {
        self.inner.state.read().window.is_some()
    }

    /// Drop an item. Removing an absent item is a no-op.
    pub fn remove(&self, item_id: ItemId) -> Vec<E> {
        self.mutate(Mutation::Remove(item_id))
    }

    /// Empty the collection.
    pub fn clear(&self) -> Vec<E> {
        self.mutate(Mutation::Clear)
    }

    fn mutate(&self, mutation: Mutation<E>) -> Vec<E> {
        let session = self.inner.context.session.read();
        let mut state = self.inner.state.write();
        let StoreState { items, window } = &mut *state;

        if let Some(window) = window {
            items.apply(mutation.clone());
            window.deferred.push(mutation);
            debug!(kind = %E::KIND, "Mutation deferred until merge completes");
            return items.entries().to_vec();
        }

        let changes = items.apply(mutation);
        self.dispatch(session.identity, items, changes);
        items.entries().to_vec()
    }

    /// Route changes to the persistence side of `identity`.
    ///
    /// Must be called with the session and state locks held so that writes are
    /// issued in the same order as the memory updates.
    fn dispatch(&self, identity: Identity, items: &OwnedCollection<E>, changes: Vec<Change>) {
        if changes.is_empty() {
            return;
        }

        match identity {
            Identity::Account(user) => {
                for change in changes {
                    self.inner.context.writer.enqueue(PendingWrite {
                        kind: E::KIND,
                        user,
                        change,
                    });
                }
            }
            Identity::Guest => {
                if let Err(source) = self.inner.context.local.save(E::KIND, &items.records()) {
                    SyncError::LocalPersistence {
                        kind: E::KIND,
                        source,
                    }
                    .report();
                }
            }
        }
    }

    /// Serialize merges of this kind.
    pub(crate) async fn lock_merge(&self) -> MutexGuard<'_, ()> {
        self.inner.merge_lock.lock().await
    }

    /// Load guest state from local persistence without writing anything back.
    pub(crate) fn restore(&self, records: Vec<ItemRecord>) {
        let (items, _) = OwnedCollection::from_records(records);
        self.inner.state.write().items = items;
    }

    /// Forget the in-memory collection and any open merge window.
    ///
    /// Callers hold the session write lock.
    pub(crate) fn reset(&self, open_window: Option<u64>) {
        let mut state = self.inner.state.write();
        state.items = OwnedCollection::new();
        state.window = open_window.map(|generation| MergeWindow {
            generation,
            base: OwnedCollection::new(),
            deferred: Vec::new(),
        });
    }

    /// Open a merge window for `generation` unless one is already open.
    pub(crate) fn open_window(&self, generation: u64) {
        let session = self.inner.context.session.read();
        if session.generation != generation {
            return;
        }

        let mut state = self.inner.state.write();
        if state.window.is_none() {
            let base = state.items.clone();
            state.window = Some(MergeWindow {
                generation,
                base,
                deferred: Vec::new(),
            });
        }
    }

    /// Install the canonical remote result of a merge.
    ///
    /// Returns `false` without touching anything if the session moved on.
    /// Overflow of capped kinds is deleted remotely, and mutations deferred
    /// during the merge are replayed and written.
    pub(crate) fn install(&self, generation: u64, records: Vec<ItemRecord>) -> bool {
        let session = self.inner.context.session.read();
        if session.generation != generation {
            return false;
        }
        let Identity::Account(user) = session.identity else {
            return false;
        };

        let mut state = self.inner.state.write();
        let deferred = match state.window.take() {
            Some(window) if window.generation == generation => window.deferred,
            other => {
                state.window = other;
                return false;
            }
        };

        let (items, evicted) = OwnedCollection::from_records(records);
        state.items = items;

        let overflow: Vec<Change> = evicted.into_iter().map(Change::Delete).collect();
        if !overflow.is_empty() {
            debug!(kind = %E::KIND, user = %user, evicted = overflow.len(), "Trimming remote overflow");
        }
        self.dispatch(session.identity, &state.items, overflow);

        for mutation in deferred {
            let changes = state.items.apply(mutation);
            self.dispatch(session.identity, &state.items, changes);
        }

        true
    }

    /// Close a merge window that could not install a remote result.
    ///
    /// Memory falls back to the collection as it was when the window opened
    /// (empty after a login) plus the mutations made during the window, which
    /// are written remotely.
    pub(crate) fn abort_window(&self, generation: u64) {
        let session = self.inner.context.session.read();
        if session.generation != generation {
            return;
        }

        let mut state = self.inner.state.write();
        let (base, deferred) = match state.window.take() {
            Some(window) if window.generation == generation => (window.base, window.deferred),
            other => {
                state.window = other;
                return;
            }
        };

        state.items = base;
        for mutation in deferred {
            let changes = state.items.apply(mutation);
            self.dispatch(session.identity, &state.items, changes);
        }
    }
}

impl CollectionStore<CartLine> {
    /// Add units of an item, accumulating onto an existing line.
    pub fn add(&self, item_id: ItemId, quantity: Quantity) -> Vec<CartLine> {
        self.mutate(Mutation::Add(CartLine::new(item_id, quantity)))
    }

    /// Set the quantity of an existing line.
    ///
    /// Absent items are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidQuantity`] if `quantity` is below 1; the
    /// collection is left unchanged and nothing is persisted.
    pub fn set_quantity(&self, item_id: ItemId, quantity: i64) -> Result<Vec<CartLine>> {
        let quantity = Quantity::new(quantity)?;
        Ok(self.mutate(Mutation::Update(CartLine::new(item_id, quantity))))
    }

    /// Quantity of an item, if it is in the cart.
    #[must_use]
    pub fn quantity_of(&self, item_id: ItemId) -> Option<Quantity> {
        self.inner
            .state
            .read()
            .items
            .get(item_id)
            .map(|line| line.quantity)
    }
}

impl CollectionStore<SavedItem> {
    /// Save an item. Saving an item twice is a no-op.
    pub fn add(&self, item_id: ItemId) -> Vec<SavedItem> {
        self.mutate(Mutation::Add(SavedItem::new(item_id)))
    }
}

impl CollectionStore<ViewedItem> {
    /// Record a view, moving the item to the front.
    pub fn record_view(&self, item_id: ItemId) -> Vec<ViewedItem> {
        // Views recorded within one clock tick must still sort in call order.
        let latest = self
            .inner
            .state
            .read()
            .items
            .entries()
            .first()
            .map(|entry| entry.viewed_at);
        let now = Utc::now();
        let viewed_at = match latest {
            Some(latest) if latest >= now => latest + Duration::milliseconds(1),
            _ => now,
        };

        self.mutate(Mutation::Add(ViewedItem::new(item_id, viewed_at)))
    }
}
