//! Sync coordinator.
//!
//! Owns the three collection stores and drives them through identity
//! transitions:
//!
//! - **Login** clears memory, opens a merge window on every store and merges
//!   each kind concurrently: guest items missing remotely are upserted, items
//!   already present remotely keep the remote value, and the re-fetched remote
//!   collection becomes the in-memory collection.
//! - **Logout** clears memory immediately. Remote and local persistence are
//!   left untouched.
//! - **Switching accounts** is a logout followed by a login.
//!
//! Every transition bumps a session generation. A merge re-checks the
//! generation before each write and before installing its result, so a merge
//! overtaken by a logout or another login has no effect on memory.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use carryover_core::{CollectionKind, Identity, ItemId, UserId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::collection::{
    CartLine, CollectionStore, Entry, OwnedCollection, SavedItem, Session, SyncContext, ViewedItem,
};
use crate::error::{SyncError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::local::LocalStore;
use crate::notify::{Notifier, NotifyLevel};
use crate::remote::RemoteStore;
use crate::writer::RemoteWriter;

/// Message shown once after guest items were carried into an account.
pub const SYNCED_MESSAGE: &str = "Your saved items were synced with your account";

/// How the merge of one collection kind ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The canonical remote collection was installed.
    Merged {
        /// Guest items written to the account.
        merged: usize,
        /// Guest items whose write failed; local persistence was kept.
        failed_writes: usize,
    },
    /// The remote collection could not be fetched; memory holds no remote data.
    ReadFailed,
    /// The session changed before the merge finished.
    Cancelled,
    /// No merge was needed (the account was already attached).
    Skipped,
}

impl MergeOutcome {
    /// Guest items written to the account.
    #[must_use]
    pub const fn merged(&self) -> usize {
        match self {
            Self::Merged { merged, .. } => *merged,
            _ => 0,
        }
    }

    /// Whether local persistence can be considered fully carried over.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(
            self,
            Self::Merged {
                failed_writes: 0,
                ..
            }
        )
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merged {
                merged,
                failed_writes,
            } => write!(f, "merged {merged}, {failed_writes} failed"),
            Self::ReadFailed => f.write_str("remote read failed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Result of merging all three kinds for one login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub user_id: UserId,
    pub cart: MergeOutcome,
    pub wishlist: MergeOutcome,
    pub recently_viewed: MergeOutcome,
}

impl MergeReport {
    const fn uniform(user_id: UserId, outcome: MergeOutcome) -> Self {
        Self {
            user_id,
            cart: outcome,
            wishlist: outcome,
            recently_viewed: outcome,
        }
    }

    /// Outcome for one kind.
    #[must_use]
    pub const fn outcome(&self, kind: CollectionKind) -> MergeOutcome {
        match kind {
            CollectionKind::Cart => self.cart,
            CollectionKind::Wishlist => self.wishlist,
            CollectionKind::RecentlyViewed => self.recently_viewed,
        }
    }

    /// Guest items written to the account across all kinds.
    #[must_use]
    pub fn merged(&self) -> usize {
        CollectionKind::ALL
            .iter()
            .map(|kind| self.outcome(*kind).merged())
            .sum()
    }

    /// Whether every kind merged without failures.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        CollectionKind::ALL
            .iter()
            .all(|kind| self.outcome(*kind).is_complete())
    }
}

struct CoordinatorInner {
    context: Arc<SyncContext>,
    remote: Arc<dyn RemoteStore>,
    notifier: Option<Arc<dyn Notifier>>,
    cart: CollectionStore<CartLine>,
    wishlist: CollectionStore<SavedItem>,
    recently_viewed: CollectionStore<ViewedItem>,
}

/// Entry point of the sync engine.
///
/// Cloning is cheap and every clone drives the same collections.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SyncCoordinator {
    /// Create a coordinator starting as a guest with empty collections.
    ///
    /// Spawns the background remote writer, so this must be called inside a
    /// Tokio runtime.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: Arc<dyn LocalStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let context = Arc::new(SyncContext {
            session: parking_lot::RwLock::new(Session::default()),
            writer: RemoteWriter::spawn(Arc::clone(&remote)),
            local,
        });

        Self {
            inner: Arc::new(CoordinatorInner {
                cart: CollectionStore::new(Arc::clone(&context)),
                wishlist: CollectionStore::new(Arc::clone(&context)),
                recently_viewed: CollectionStore::new(Arc::clone(&context)),
                context,
                remote,
                notifier,
            }),
        }
    }

    /// Currently attached identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.inner.context.session.read().identity
    }

    #[must_use]
    pub fn cart(&self) -> &CollectionStore<CartLine> {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &CollectionStore<SavedItem> {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn recently_viewed(&self) -> &CollectionStore<ViewedItem> {
        &self.inner.recently_viewed
    }

    /// Load guest collections retained by local persistence.
    ///
    /// Called once at startup. Does nothing while an account is attached.
    pub fn restore_guest(&self) {
        let session = self.inner.context.session.read();
        if !session.identity.is_guest() {
            return;
        }

        self.restore_kind(&self.inner.cart);
        self.restore_kind(&self.inner.wishlist);
        self.restore_kind(&self.inner.recently_viewed);
    }

    fn restore_kind<E: Entry>(&self, store: &CollectionStore<E>) {
        match self.inner.context.local.load(E::KIND) {
            Ok(records) => {
                debug!(kind = %E::KIND, count = records.len(), "Restored guest collection");
                store.restore(records);
            }
            Err(source) => SyncError::LocalPersistence {
                kind: E::KIND,
                source,
            }
            .report(),
        }
    }

    /// Attach an account and merge guest state into it.
    ///
    /// Logging in as the account already attached is redundant and returns a
    /// report of skipped merges. Logging in as a different account logs the
    /// current one out first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn login(&self, user_id: UserId) -> MergeReport {
        match self.attach(user_id) {
            Some(generation) => self.merge_all(user_id, generation).await,
            None => {
                debug!("Account already attached, skipping merge");
                MergeReport::uniform(user_id, MergeOutcome::Skipped)
            }
        }
    }

    /// Detach the account, clearing every in-memory collection.
    ///
    /// Remote persistence keeps the account's collections for its next login,
    /// and local persistence is not read back.
    pub fn logout(&self) {
        let mut session = self.inner.context.session.write();
        if session.identity.is_guest() {
            return;
        }
        self.detach_locked(&mut session);
        drop(session);

        clear_sentry_user();
        add_breadcrumb("session", "Account detached", None);
        info!("Logged out");
    }

    /// Re-run the merge for the attached account without clearing memory.
    ///
    /// Retries a merge that failed to read remote state or to write some guest
    /// items. Returns `None` for a guest session.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Option<MergeReport> {
        let session = *self.inner.context.session.read();
        let user_id = session.identity.user_id()?;
        Some(self.merge_all(user_id, session.generation).await)
    }

    /// Wait until every remote write queued so far has settled.
    pub async fn flush(&self) {
        self.inner.context.writer.flush().await;
    }

    /// Number of background remote writes that have failed.
    #[must_use]
    pub fn failed_writes(&self) -> usize {
        self.inner.context.writer.failures()
    }

    /// Apply one identity transition.
    ///
    /// A login returns the handle of the spawned merge so that a following
    /// logout is not held up by it.
    pub fn apply_session(&self, identity: Identity) -> Option<JoinHandle<MergeReport>> {
        match identity {
            Identity::Guest => {
                self.logout();
                None
            }
            Identity::Account(user_id) => {
                let generation = self.attach(user_id)?;
                let coordinator = self.clone();
                Some(tokio::spawn(async move {
                    coordinator.merge_all(user_id, generation).await
                }))
            }
        }
    }

    /// Follow a session boundary until its sender is dropped.
    ///
    /// The identity current at call time is applied first. Returns once the
    /// last spawned merge has settled.
    ///
    /// A [`SessionBoundary`](crate::SessionBoundary) never publishes the same
    /// identity twice in a row, so a change notification carrying the account
    /// already applied means a logout and login were collapsed into one value.
    /// That is handled as a logout followed by a fresh login.
    pub async fn run(&self, mut session: watch::Receiver<Identity>) {
        let mut pending: Option<JoinHandle<MergeReport>> = None;
        let mut applied: Option<Identity> = None;

        loop {
            let identity = *session.borrow_and_update();
            if applied == Some(identity) && !identity.is_guest() {
                debug!("Collapsed logout observed, re-attaching");
                self.logout();
            }
            applied = Some(identity);

            if let Some(handle) = self.apply_session(identity) {
                pending = Some(handle);
            }

            if session.changed().await.is_err() {
                break;
            }
        }

        if let Some(handle) = pending {
            if let Err(e) = handle.await {
                error!(error = %e, "Merge task failed");
            }
        }
        debug!("Session boundary closed");
    }

    /// Move to `Account(user_id)`, returning the new generation.
    ///
    /// `None` if that account is already attached.
    fn attach(&self, user_id: UserId) -> Option<u64> {
        let mut session = self.inner.context.session.write();
        match session.identity {
            Identity::Account(current) if current == user_id => return None,
            Identity::Account(previous) => {
                info!(previous = %previous, "Switching accounts");
                self.detach_locked(&mut session);
            }
            Identity::Guest => {}
        }

        session.generation += 1;
        session.identity = Identity::Account(user_id);
        let generation = session.generation;
        self.inner.cart.reset(Some(generation));
        self.inner.wishlist.reset(Some(generation));
        self.inner.recently_viewed.reset(Some(generation));
        drop(session);

        set_sentry_user(user_id);
        let user = user_id.to_string();
        add_breadcrumb("session", "Account attached", Some(&[("user_id", &user)]));
        info!(user_id = %user_id, generation, "Logged in");
        Some(generation)
    }

    fn detach_locked(&self, session: &mut Session) {
        session.generation += 1;
        session.identity = Identity::Guest;
        self.inner.cart.reset(None);
        self.inner.wishlist.reset(None);
        self.inner.recently_viewed.reset(None);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.context.session.read().generation == generation
    }

    #[instrument(skip(self), fields(merge_id = %Uuid::new_v4()))]
    async fn merge_all(&self, user_id: UserId, generation: u64) -> MergeReport {
        // Remote reads must observe every write queued before this merge.
        self.inner.context.writer.flush().await;

        let (cart, wishlist, recently_viewed) = tokio::join!(
            self.merge_kind(&self.inner.cart, user_id, generation),
            self.merge_kind(&self.inner.wishlist, user_id, generation),
            self.merge_kind(&self.inner.recently_viewed, user_id, generation),
        );
        let report = MergeReport {
            user_id,
            cart,
            wishlist,
            recently_viewed,
        };

        let merged = report.merged();
        if merged > 0 && self.is_current(generation) {
            if let Some(notifier) = &self.inner.notifier {
                notifier.notify(SYNCED_MESSAGE, NotifyLevel::Success);
            }
        }

        let merged_text = merged.to_string();
        add_breadcrumb("merge", "Merge finished", Some(&[("merged", &merged_text)]));
        info!(
            cart = %report.cart,
            wishlist = %report.wishlist,
            recently_viewed = %report.recently_viewed,
            "Merge finished"
        );
        report
    }

    /// Merge one kind: union of remote and local, remote wins on conflict.
    async fn merge_kind<E: Entry>(
        &self,
        store: &CollectionStore<E>,
        user_id: UserId,
        generation: u64,
    ) -> MergeOutcome {
        let kind = E::KIND;
        let _merge = store.lock_merge().await;
        if !self.is_current(generation) {
            return MergeOutcome::Cancelled;
        }
        store.open_window(generation);

        let remote = match self.inner.remote.list(kind, user_id).await {
            Ok(records) => records,
            Err(source) => {
                SyncError::RemoteReadFailed { kind, source }.report();
                store.abort_window(generation);
                return MergeOutcome::ReadFailed;
            }
        };
        let present: HashSet<ItemId> = remote.iter().map(|record| record.item_id).collect();

        let (local, local_loaded) = match self.inner.context.local.load(kind) {
            Ok(records) => (records, true),
            Err(source) => {
                SyncError::LocalPersistence { kind, source }.report();
                (Vec::new(), false)
            }
        };
        let (local, _) = OwnedCollection::<E>::from_records(local);

        let mut merged = 0;
        let mut failed_writes = 0;
        for entry in local.entries() {
            if present.contains(&entry.item_id()) {
                continue;
            }
            if !self.is_current(generation) {
                SyncError::MergeCancelled { kind }.report();
                return MergeOutcome::Cancelled;
            }

            match self
                .inner
                .remote
                .upsert(kind, user_id, &entry.to_record())
                .await
            {
                Ok(()) => merged += 1,
                Err(source) => {
                    failed_writes += 1;
                    SyncError::RemoteWriteFailed { kind, source }.report();
                }
            }
        }

        let canonical = match self.inner.remote.list(kind, user_id).await {
            Ok(records) => records,
            Err(source) => {
                SyncError::RemoteReadFailed { kind, source }.report();
                store.abort_window(generation);
                return MergeOutcome::ReadFailed;
            }
        };

        if !store.install(generation, canonical) {
            SyncError::MergeCancelled { kind }.report();
            return MergeOutcome::Cancelled;
        }

        if failed_writes == 0 && local_loaded {
            self.discard_local(kind, generation);
        }

        debug!(kind = %kind, merged, failed_writes, "Merged collection");
        MergeOutcome::Merged {
            merged,
            failed_writes,
        }
    }

    /// Clear carried-over guest state unless a new guest session started.
    fn discard_local(&self, kind: CollectionKind, generation: u64) {
        let session = self.inner.context.session.read();
        if session.generation != generation {
            return;
        }
        if let Err(source) = self.inner.context.local.clear(kind) {
            SyncError::LocalPersistence { kind, source }.report();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use carryover_core::{ItemRecord, Quantity};
    use parking_lot::Mutex;

    use super::*;
    use crate::local::MemoryLocalStore;
    use crate::remote::MemoryRemoteStore;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, NotifyLevel)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, level: NotifyLevel) {
            self.messages.lock().push((message.to_string(), level));
        }
    }

    struct Fixture {
        remote: Arc<MemoryRemoteStore>,
        local: Arc<MemoryLocalStore>,
        notifier: Arc<RecordingNotifier>,
        coordinator: SyncCoordinator,
    }

    fn fixture() -> Fixture {
        let remote = Arc::new(MemoryRemoteStore::new());
        let local = Arc::new(MemoryLocalStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = SyncCoordinator::new(
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            Arc::clone(&local) as Arc<dyn LocalStore>,
            Some(Arc::clone(&notifier) as Arc<dyn Notifier>),
        );
        Fixture {
            remote,
            local,
            notifier,
            coordinator,
        }
    }

    const USER: UserId = UserId::new(42);

    fn id(n: i32) -> ItemId {
        ItemId::new(n)
    }

    #[tokio::test]
    async fn test_login_with_empty_guest_state_does_not_notify() {
        let fx = fixture();
        let report = fx.coordinator.login(USER).await;

        assert_eq!(report.merged(), 0);
        assert!(report.is_complete());
        assert!(fx.notifier.messages.lock().is_empty());
        assert_eq!(fx.coordinator.identity(), Identity::Account(USER));
    }

    #[tokio::test]
    async fn test_login_notifies_once_across_kinds() {
        let fx = fixture();
        fx.coordinator.cart().add(id(1), Quantity::ONE);
        fx.coordinator.wishlist().add(id(2));

        let report = fx.coordinator.login(USER).await;

        assert_eq!(report.merged(), 2);
        let messages = fx.notifier.messages.lock();
        assert_eq!(
            messages.as_slice(),
            &[(SYNCED_MESSAGE.to_string(), NotifyLevel::Success)]
        );
    }

    #[tokio::test]
    async fn test_redundant_login_is_skipped() {
        let fx = fixture();
        fx.coordinator.login(USER).await;
        let lists = fx.remote.list_count();

        let report = fx.coordinator.login(USER).await;
        assert_eq!(report.cart, MergeOutcome::Skipped);
        assert_eq!(fx.remote.list_count(), lists);
    }

    #[tokio::test]
    async fn test_merge_clears_local_on_success() {
        let fx = fixture();
        fx.coordinator.wishlist().add(id(5));
        assert_eq!(fx.local.snapshot(CollectionKind::Wishlist).len(), 1);

        fx.coordinator.login(USER).await;
        assert!(fx.local.snapshot(CollectionKind::Wishlist).is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_local() {
        let fx = fixture();
        fx.coordinator.cart().add(id(5), Quantity::ONE);
        fx.remote.set_fail_writes(true);

        let report = fx.coordinator.login(USER).await;

        assert_eq!(
            report.cart,
            MergeOutcome::Merged {
                merged: 0,
                failed_writes: 1
            }
        );
        assert!(!report.is_complete());
        assert_eq!(fx.local.snapshot(CollectionKind::Cart).len(), 1);
        assert!(fx.coordinator.cart().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_retries_failed_read() {
        let fx = fixture();
        fx.remote.seed(
            CollectionKind::Cart,
            USER,
            vec![ItemRecord::with_quantity(id(3), Quantity::ONE)],
        );
        fx.coordinator.cart().add(id(4), Quantity::ONE);
        fx.remote.set_fail_reads(true);

        let report = fx.coordinator.login(USER).await;
        assert_eq!(report.cart, MergeOutcome::ReadFailed);
        assert!(fx.coordinator.cart().is_empty());
        assert_eq!(fx.local.snapshot(CollectionKind::Cart).len(), 1);

        fx.remote.set_fail_reads(false);
        let report = fx.coordinator.refresh().await.unwrap();
        assert_eq!(report.cart.merged(), 1);
        assert_eq!(fx.coordinator.cart().len(), 2);
        assert!(fx.local.snapshot(CollectionKind::Cart).is_empty());
    }

    #[tokio::test]
    async fn test_refresh_as_guest_is_none() {
        let fx = fixture();
        assert!(fx.coordinator.refresh().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_memory_only() {
        let fx = fixture();
        fx.coordinator.login(USER).await;
        fx.coordinator.wishlist().add(id(8));
        fx.coordinator.flush().await;

        fx.coordinator.logout();

        assert!(fx.coordinator.wishlist().is_empty());
        assert_eq!(fx.coordinator.identity(), Identity::Guest);
        assert_eq!(fx.remote.snapshot(CollectionKind::Wishlist, USER).len(), 1);
        assert!(fx.local.snapshot(CollectionKind::Wishlist).is_empty());
    }

    #[tokio::test]
    async fn test_restore_guest_loads_local() {
        let fx = fixture();
        fx.local
            .save(CollectionKind::Wishlist, &[ItemRecord::bare(id(6))])
            .unwrap();

        fx.coordinator.restore_guest();
        assert!(fx.coordinator.wishlist().contains(id(6)));
    }
}
