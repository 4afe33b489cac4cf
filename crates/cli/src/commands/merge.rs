//! Guest-to-account merge command.
//!
//! Runs the same merge a login runs, taking the guest side from the local
//! directory. Useful for retrying a merge that failed at login; guest data is
//! only removed once every item reached the account.

use std::sync::Arc;

use carryover_core::{CollectionKind, UserId};
use carryover_sync::config::SyncConfig;
use carryover_sync::local::{FileLocalStore, LocalStore};
use carryover_sync::remote::{HttpRemoteStore, RemoteStore};
use carryover_sync::{Notifier, SyncCoordinator, TracingNotifier};
use tracing::{info, warn};

/// Merge local guest collections into `user`.
///
/// # Errors
///
/// Returns an error if configuration is invalid or any kind did not merge
/// completely.
pub async fn run(user: UserId) -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::from_env()?;

    let remote: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::new(&config.remote)?);
    let local: Arc<dyn LocalStore> = Arc::new(FileLocalStore::from_config(&config.local));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let coordinator = SyncCoordinator::new(remote, local, Some(notifier));
    coordinator.restore_guest();

    info!(
        cart = coordinator.cart().len(),
        wishlist = coordinator.wishlist().len(),
        recently_viewed = coordinator.recently_viewed().len(),
        "Loaded guest collections"
    );

    let report = coordinator.login(user).await;
    coordinator.flush().await;

    for kind in CollectionKind::ALL {
        info!("  {kind}: {}", report.outcome(kind));
    }
    info!(
        cart = coordinator.cart().len(),
        wishlist = coordinator.wishlist().len(),
        recently_viewed = coordinator.recently_viewed().len(),
        "Account collections after merge"
    );

    if !report.is_complete() {
        warn!("Guest data kept for the kinds that did not merge");
        return Err("merge incomplete".into());
    }

    Ok(())
}
