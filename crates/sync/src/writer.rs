//! Background remote writer.
//!
//! Account mutations never wait on the network. Each one becomes a
//! [`PendingWrite`] on an unbounded channel drained by a single task, so writes
//! reach the remote store in issuance order. A failed write is reported and
//! dropped; the optimistic in-memory state is not rolled back.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use carryover_core::{CollectionKind, UserId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::collection::Change;
use crate::error::SyncError;
use crate::remote::{RemoteError, RemoteStore};

/// A remote write waiting to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingWrite {
    pub kind: CollectionKind,
    pub user: UserId,
    pub change: Change,
}

enum Command {
    Write(PendingWrite),
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task.
#[derive(Clone)]
pub(crate) struct RemoteWriter {
    tx: mpsc::UnboundedSender<Command>,
    failures: Arc<AtomicUsize>,
}

impl RemoteWriter {
    /// Spawn the writer task on the current Tokio runtime.
    pub fn spawn(remote: Arc<dyn RemoteStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run(remote, rx, Arc::clone(&failures)));
        Self { tx, failures }
    }

    /// Queue a write. Never blocks.
    pub fn enqueue(&self, write: PendingWrite) {
        if self.tx.send(Command::Write(write)).is_err() {
            warn!("Remote writer stopped, dropping write");
        }
    }

    /// Wait until every write queued before this call has settled.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Number of writes that failed since the writer started.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

async fn run(
    remote: Arc<dyn RemoteStore>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    failures: Arc<AtomicUsize>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Write(write) => {
                let kind = write.kind;
                if let Err(source) = execute(remote.as_ref(), write).await {
                    failures.fetch_add(1, Ordering::Relaxed);
                    SyncError::RemoteWriteFailed { kind, source }.report();
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Remote writer shut down");
}

async fn execute(remote: &dyn RemoteStore, write: PendingWrite) -> Result<(), RemoteError> {
    let PendingWrite { kind, user, change } = write;
    match change {
        Change::Upsert(record) => remote.upsert(kind, user, &record).await,
        Change::Delete(item_id) => remote.delete(kind, user, item_id).await,
        Change::Clear => remote.clear(kind, user).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use carryover_core::{ItemId, ItemRecord, Quantity};

    use super::*;
    use crate::remote::MemoryRemoteStore;

    fn write(user: UserId, change: Change) -> PendingWrite {
        PendingWrite {
            kind: CollectionKind::Cart,
            user,
            change,
        }
    }

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let writer = RemoteWriter::spawn(Arc::clone(&remote) as Arc<dyn RemoteStore>);
        let user = UserId::new(1);

        for quantity in 1..=3 {
            writer.enqueue(write(
                user,
                Change::Upsert(ItemRecord::with_quantity(
                    ItemId::new(8),
                    Quantity::new(quantity).unwrap(),
                )),
            ));
        }
        writer.flush().await;

        assert_eq!(
            remote.snapshot(CollectionKind::Cart, user),
            vec![ItemRecord::with_quantity(
                ItemId::new(8),
                Quantity::new(3).unwrap()
            )]
        );
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_retried() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_fail_writes(true);
        let writer = RemoteWriter::spawn(Arc::clone(&remote) as Arc<dyn RemoteStore>);

        writer.enqueue(write(UserId::new(1), Change::Clear));
        writer.enqueue(write(UserId::new(1), Change::Delete(ItemId::new(2))));
        writer.flush().await;

        assert_eq!(writer.failures(), 2);
        assert_eq!(remote.clear_count(), 0);
    }
}
