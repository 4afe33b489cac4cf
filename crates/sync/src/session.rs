//! Session boundary emitter.
//!
//! Publishes the current [`Identity`] on a `tokio::sync::watch` channel. The
//! coordinator's [`run`](crate::SyncCoordinator::run) loop subscribes to it.
//!
//! A watch channel only keeps the latest value, so a receiver that falls behind
//! may observe `Account(A)` followed directly by `Account(B)`. The coordinator
//! always detaches the previous account before attaching another one, so the
//! collapsed transition is still processed as `A -> Guest -> B`.

use carryover_core::{Identity, UserId};
use tokio::sync::watch;
use tracing::info;

/// Source of identity transitions.
#[derive(Debug, Clone)]
pub struct SessionBoundary {
    tx: watch::Sender<Identity>,
}

impl Default for SessionBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBoundary {
    /// Create an emitter starting as a guest.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Identity::Guest);
        Self { tx }
    }

    /// Identity most recently published.
    #[must_use]
    pub fn current(&self) -> Identity {
        *self.tx.borrow()
    }

    /// Receive every subsequent transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Identity> {
        self.tx.subscribe()
    }

    /// Publish a login.
    ///
    /// Switching from one account to another publishes an intermediate guest
    /// state. Logging in as the already attached account publishes nothing.
    pub fn attach(&self, user_id: UserId) {
        match self.current() {
            Identity::Account(current) if current == user_id => return,
            Identity::Account(_) => self.detach(),
            Identity::Guest => {}
        }

        info!(user_id = %user_id, "Session attached");
        self.tx.send_replace(Identity::Account(user_id));
    }

    /// Publish a logout. A guest session publishes nothing.
    pub fn detach(&self) {
        if self.current().is_guest() {
            return;
        }

        info!("Session detached");
        self.tx.send_replace(Identity::Guest);
    }
}
