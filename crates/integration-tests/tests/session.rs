//! Integration tests for identity transitions.
//!
//! Covers logout, account switching, cancellation of an in-flight merge,
//! mutations made while a merge is running, and the session runner.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use carryover_core::{CollectionKind, Identity, ItemRecord, Quantity, UserId};
use carryover_integration_tests::{Harness, ids, item, sorted_ids};
use carryover_sync::{MergeOutcome, SessionBoundary};

const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_clears_memory_and_keeps_remote() {
    let h = Harness::new();
    h.coordinator.login(ALICE).await;
    h.coordinator.cart().add(item(1), Quantity::ONE);
    h.coordinator.wishlist().add(item(2));
    h.coordinator.recently_viewed().record_view(item(3));
    h.coordinator.flush().await;

    h.coordinator.logout();

    assert_eq!(h.coordinator.identity(), Identity::Guest);
    assert!(h.coordinator.cart().is_empty());
    assert!(h.coordinator.wishlist().is_empty());
    assert!(h.coordinator.recently_viewed().is_empty());
    assert_eq!(h.remote.clear_count(), 0);
    assert_eq!(h.remote.delete_count(), 0);

    // Remote was never cleared, so the same account gets everything back.
    h.coordinator.login(ALICE).await;
    assert!(h.coordinator.cart().contains(item(1)));
    assert!(h.coordinator.wishlist().contains(item(2)));
    assert_eq!(ids(&h.coordinator.recently_viewed().list()), vec![3]);
}

#[tokio::test]
async fn test_relogin_restores_items_still_queued_at_logout() {
    let h = Harness::new();
    h.coordinator.login(ALICE).await;
    h.coordinator.wishlist().add(item(9));
    // No flush: the write may still be queued when the session ends.
    h.coordinator.logout();

    h.coordinator.login(ALICE).await;
    h.coordinator.flush().await;

    assert_eq!(ids(&h.coordinator.wishlist().list()), vec![9]);
    assert_eq!(
        sorted_ids(&h.remote.snapshot(CollectionKind::Wishlist, ALICE)),
        vec![9]
    );
}

#[tokio::test]
async fn test_refresh_keeps_items_still_queued() {
    let h = Harness::new();
    h.coordinator.login(ALICE).await;
    h.coordinator.cart().add(item(9), Quantity::ONE);

    let report = h.coordinator.refresh().await.unwrap();
    h.coordinator.flush().await;

    assert!(report.is_complete());
    assert_eq!(h.coordinator.cart().quantity_of(item(9)), Some(Quantity::ONE));
    assert_eq!(
        sorted_ids(&h.remote.snapshot(CollectionKind::Cart, ALICE)),
        vec![9]
    );
}

#[tokio::test]
async fn test_logout_does_not_repopulate_from_local() {
    let h = Harness::new();
    h.coordinator.wishlist().add(item(5));
    h.remote.set_fail_writes(true);
    // The failed write keeps guest data locally.
    h.coordinator.login(ALICE).await;
    assert_eq!(h.local.snapshot(CollectionKind::Wishlist).len(), 1);

    h.coordinator.logout();
    assert!(h.coordinator.wishlist().is_empty());
}

#[tokio::test]
async fn test_guest_activity_after_logout_goes_local() {
    let h = Harness::new();
    h.coordinator.login(ALICE).await;
    h.coordinator.logout();

    h.coordinator.wishlist().add(item(9));
    h.coordinator.flush().await;

    assert_eq!(
        h.local.snapshot(CollectionKind::Wishlist),
        vec![ItemRecord::bare(item(9))]
    );
    assert!(h.remote.snapshot(CollectionKind::Wishlist, ALICE).is_empty());
}

// =============================================================================
// Account Switching
// =============================================================================

#[tokio::test]
async fn test_switch_accounts_never_leaks_items() {
    let h = Harness::new();
    h.remote.seed(
        CollectionKind::Wishlist,
        ALICE,
        vec![ItemRecord::bare(item(1))],
    );
    h.remote.seed(CollectionKind::Wishlist, BOB, vec![ItemRecord::bare(item(2))]);

    h.coordinator.login(ALICE).await;
    h.coordinator.wishlist().add(item(3));
    h.coordinator.login(BOB).await;
    h.coordinator.flush().await;

    assert_eq!(h.coordinator.identity(), Identity::Account(BOB));
    assert_eq!(ids(&h.coordinator.wishlist().list()), vec![2]);
    assert_eq!(
        sorted_ids(&h.remote.snapshot(CollectionKind::Wishlist, ALICE)),
        vec![1, 3]
    );
    assert_eq!(
        sorted_ids(&h.remote.snapshot(CollectionKind::Wishlist, BOB)),
        vec![2]
    );
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_logout_cancels_in_flight_merge() {
    let h = Harness::new();
    h.remote.seed(
        CollectionKind::Cart,
        ALICE,
        vec![ItemRecord::with_quantity(item(1), Quantity::ONE)],
    );
    h.coordinator.cart().add(item(2), Quantity::ONE);
    h.remote.set_read_delay(Some(Duration::from_millis(50)));

    let merge = h.coordinator.apply_session(Identity::Account(ALICE)).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.coordinator.logout();

    let report = merge.await.unwrap();

    assert_eq!(report.cart, MergeOutcome::Cancelled);
    assert!(h.coordinator.cart().is_empty());
    assert_eq!(h.coordinator.identity(), Identity::Guest);
    // Nothing from the guest session reached the account, and it is kept for
    // the next login.
    assert_eq!(
        sorted_ids(&h.remote.snapshot(CollectionKind::Cart, ALICE)),
        vec![1]
    );
    assert_eq!(h.local.snapshot(CollectionKind::Cart).len(), 1);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_switch_cancels_previous_merge() {
    let h = Harness::new();
    h.remote.seed(CollectionKind::Wishlist, ALICE, vec![ItemRecord::bare(item(1))]);
    h.remote.seed(CollectionKind::Wishlist, BOB, vec![ItemRecord::bare(item(2))]);
    h.remote.set_read_delay(Some(Duration::from_millis(30)));

    let first = h.coordinator.apply_session(Identity::Account(ALICE)).unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h.coordinator.apply_session(Identity::Account(BOB)).unwrap();

    assert_eq!(first.await.unwrap().wishlist, MergeOutcome::Cancelled);
    assert!(matches!(
        second.await.unwrap().wishlist,
        MergeOutcome::Merged { .. }
    ));
    assert_eq!(ids(&h.coordinator.wishlist().list()), vec![2]);
}

// =============================================================================
// Mutations During a Merge
// =============================================================================

#[tokio::test]
async fn test_mutation_during_merge_is_replayed() {
    let h = Harness::new();
    h.remote.seed(
        CollectionKind::Cart,
        ALICE,
        vec![ItemRecord::with_quantity(item(1), Quantity::new(2).unwrap())],
    );
    h.remote.set_read_delay(Some(Duration::from_millis(30)));

    let merge = h.coordinator.apply_session(Identity::Account(ALICE)).unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert!(h.coordinator.cart().is_merging());
    h.coordinator.cart().add(item(9), Quantity::ONE);
    // Visible immediately even though the merge has not finished.
    assert!(h.coordinator.cart().contains(item(9)));

    merge.await.unwrap();
    h.coordinator.flush().await;

    assert!(!h.coordinator.cart().is_merging());
    assert_eq!(
        h.coordinator.cart().quantity_of(item(1)),
        Some(Quantity::new(2).unwrap())
    );
    assert!(h.coordinator.cart().contains(item(9)));
    assert_eq!(
        sorted_ids(&h.remote.snapshot(CollectionKind::Cart, ALICE)),
        vec![1, 9]
    );
}

#[tokio::test]
async fn test_remote_read_failure_leaves_collection_empty() {
    let h = Harness::new();
    h.coordinator.cart().add(item(4), Quantity::ONE);
    h.remote.set_fail_reads(true);

    let report = h.coordinator.login(ALICE).await;

    assert_eq!(report.cart, MergeOutcome::ReadFailed);
    assert_eq!(h.coordinator.identity(), Identity::Account(ALICE));
    assert!(h.coordinator.cart().is_empty());
    assert!(!h.coordinator.cart().is_merging());
    assert_eq!(h.local.snapshot(CollectionKind::Cart).len(), 1);
}

// =============================================================================
// Session Runner
// =============================================================================

#[tokio::test]
async fn test_run_follows_session_boundary() {
    let h = Harness::new();
    h.remote.seed(CollectionKind::Wishlist, ALICE, vec![ItemRecord::bare(item(1))]);
    h.coordinator.wishlist().add(item(2));

    let boundary = SessionBoundary::new();
    let coordinator = h.coordinator.clone();
    let rx = boundary.subscribe();
    let runner = tokio::spawn(async move { coordinator.run(rx).await });

    boundary.attach(ALICE);
    drop(boundary);
    runner.await.unwrap();

    assert_eq!(h.coordinator.identity(), Identity::Account(ALICE));
    assert_eq!(
        sorted_ids(&h.coordinator.wishlist().records()),
        vec![1, 2]
    );
}

#[tokio::test]
async fn test_run_ends_as_guest_after_detach() {
    let h = Harness::new();
    let boundary = SessionBoundary::new();
    let coordinator = h.coordinator.clone();
    let rx = boundary.subscribe();
    let runner = tokio::spawn(async move { coordinator.run(rx).await });

    boundary.attach(ALICE);
    tokio::task::yield_now().await;
    boundary.detach();
    drop(boundary);
    runner.await.unwrap();

    assert_eq!(h.coordinator.identity(), Identity::Guest);
    assert!(h.coordinator.cart().is_empty());
}

#[tokio::test]
async fn test_run_treats_collapsed_logout_login_as_fresh_login() {
    let h = Harness::new();
    let boundary = SessionBoundary::new();
    let coordinator = h.coordinator.clone();
    let rx = boundary.subscribe();
    let runner = tokio::spawn(async move { coordinator.run(rx).await });

    boundary.attach(ALICE);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.coordinator.identity(), Identity::Account(ALICE));
    h.coordinator.wishlist().add(item(5));
    let lists = h.remote.list_count();

    // Both transitions land before the runner wakes, so it only sees ALICE.
    boundary.detach();
    boundary.attach(ALICE);
    drop(boundary);
    runner.await.unwrap();

    assert_eq!(h.coordinator.identity(), Identity::Account(ALICE));
    // A fresh merge ran: two reads for each of the three kinds.
    assert_eq!(h.remote.list_count(), lists + 6);
    assert_eq!(ids(&h.coordinator.wishlist().list()), vec![5]);
}
