//! Session gate driving the notification store.

mod common;

use tokio::sync::watch;

use simguardian_core::types::id::UserId;
use simguardian_realtime::notification::StoreState;
use simguardian_realtime::{NotificationStore, SessionBinding, SessionGate};

use common::{FlakySource, WAIT, config, row, wait_for_snapshot};

#[tokio::test]
async fn test_binding_follows_sign_in_and_sign_out() {
    let source = FlakySource::new();
    let alice = UserId::new();
    let bob = UserId::new();
    source.inner.insert(row(alice, 0)).await;
    source.inner.insert(row(bob, 0)).await;
    source.inner.insert(row(bob, 10)).await;

    let (store, _task) = NotificationStore::spawn(source.clone(), &config());
    let mut changes = store.subscribe_changes();
    let gate = SessionGate::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let binding = SessionBinding::new(gate.clone(), store.clone()).spawn(shutdown_rx);

    gate.sign_in(alice);
    let snapshot = wait_for_snapshot(&mut changes, |s| s.owner() == Some(alice)).await;
    assert_eq!(snapshot.unread_count, 1);

    gate.sign_in(bob);
    let snapshot = wait_for_snapshot(&mut changes, |s| s.owner() == Some(bob)).await;
    assert_eq!(snapshot.notifications.len(), 2);
    assert!(snapshot.notifications.iter().all(|n| n.owner == bob));
    assert_eq!(source.inner.subscriber_count(), 1);

    gate.sign_out();
    let snapshot = wait_for_snapshot(&mut changes, |s| s.state == StoreState::Uninitialized).await;
    assert!(snapshot.notifications.is_empty());
    assert_eq!(source.inner.subscriber_count(), 0);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(WAIT, binding).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_binding_initializes_identity_present_at_start() {
    let source = FlakySource::new();
    let alice = UserId::new();
    source.inner.insert(row(alice, 0)).await;

    let (store, _task) = NotificationStore::spawn(source.clone(), &config());
    let mut changes = store.subscribe_changes();
    let gate = SessionGate::new();
    gate.sign_in(alice);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let binding = SessionBinding::new(gate.clone(), store.clone()).spawn(shutdown_rx);
    wait_for_snapshot(&mut changes, |s| s.owner() == Some(alice)).await;

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(WAIT, binding).await.unwrap().unwrap();
    assert!(!store.snapshot().is_active());
    assert_eq!(source.inner.subscriber_count(), 0);
}

#[tokio::test]
async fn test_failed_initialize_is_logged_not_retried() {
    let source = FlakySource::new();
    let alice = UserId::new();
    source.set_fail_fetch(true);

    let (store, _task) = NotificationStore::spawn(source.clone(), &config());
    let gate = SessionGate::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let binding = SessionBinding::new(gate.clone(), store.clone()).spawn(shutdown_rx);

    gate.sign_in(alice);
    tokio::time::timeout(WAIT, async {
        while source.fetch_calls.load(std::sync::atomic::Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(WAIT, binding).await.unwrap().unwrap();

    assert_eq!(source.fetch_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(!store.snapshot().is_active());
    assert_eq!(source.inner.subscriber_count(), 0);
}
