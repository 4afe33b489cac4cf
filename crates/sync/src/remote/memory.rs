//! In-process remote store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use carryover_core::{CollectionKind, ItemId, ItemRecord, UserId};
use chrono::Utc;
use parking_lot::Mutex;

use super::{RemoteError, RemoteStore};

/// Remote store kept in memory.
///
/// Behaves like the HTTP backend: upserts overwrite by item ID, recently-viewed
/// records without a timestamp are stamped with the server clock, and list
/// order is storage order rather than recency order.
///
/// Reads and writes can be made to fail or to stall, which is how tests
/// exercise the merge failure and cancellation paths.
#[derive(Default)]
pub struct MemoryRemoteStore {
    collections: Mutex<HashMap<(CollectionKind, UserId), Vec<ItemRecord>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    read_delay: Mutex<Option<Duration>>,
    lists: AtomicUsize,
    upserts: AtomicUsize,
    deletes: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryRemoteStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a user's collection without counting it as a write.
    pub fn seed(&self, kind: CollectionKind, user: UserId, records: Vec<ItemRecord>) {
        self.collections.lock().insert((kind, user), records);
    }

    /// Copy of a user's collection in storage order.
    #[must_use]
    pub fn snapshot(&self, kind: CollectionKind, user: UserId) -> Vec<ItemRecord> {
        self.collections
            .lock()
            .get(&(kind, user))
            .cloned()
            .unwrap_or_default()
    }

    /// Make every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every subsequent read.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock() = delay;
    }

    /// Number of `list` calls served.
    #[must_use]
    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Number of successful `upsert` calls.
    #[must_use]
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Number of successful `delete` calls.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Number of successful `clear` calls.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), RemoteError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn list(
        &self,
        kind: CollectionKind,
        user: UserId,
    ) -> Result<Vec<ItemRecord>, RemoteError> {
        let delay = *self.read_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("reads disabled".to_string()));
        }

        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot(kind, user))
    }

    async fn upsert(
        &self,
        kind: CollectionKind,
        user: UserId,
        record: &ItemRecord,
    ) -> Result<(), RemoteError> {
        self.check_writable()?;

        let mut record = record.clone();
        if kind == CollectionKind::RecentlyViewed && record.viewed_at.is_none() {
            record.viewed_at = Some(Utc::now());
        }

        let mut collections = self.collections.lock();
        let records = collections.entry((kind, user)).or_default();
        match records.iter_mut().find(|r| r.item_id == record.item_id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }

        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(
        &self,
        kind: CollectionKind,
        user: UserId,
        item: ItemId,
    ) -> Result<(), RemoteError> {
        self.check_writable()?;

        if let Some(records) = self.collections.lock().get_mut(&(kind, user)) {
            records.retain(|r| r.item_id != item);
        }

        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self, kind: CollectionKind, user: UserId) -> Result<(), RemoteError> {
        self.check_writable()?;

        self.collections.lock().remove(&(kind, user));

        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
