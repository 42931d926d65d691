//! Property tests for the store task under random command sequences and
//! intermittent source failures.

mod common;

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use uuid::Uuid;

use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_entity::notification::{Notification, NotificationCategory};
use simguardian_realtime::NotificationStore;
use simguardian_realtime::notification::NotificationSnapshot;

use common::{FlakySource, config};

#[derive(Debug, Clone)]
enum Op {
    Initialize { signed_in: bool },
    Teardown,
    Refresh,
    Insert { slot: usize },
    MarkRead { slot: usize },
    MarkAllRead,
    Dismiss { slot: usize },
    FailPersist(bool),
    FailFetch(bool),
}

const SLOTS: usize = 8;

fn owner() -> UserId {
    UserId::from_uuid(Uuid::from_u128(42))
}

fn slot_id(slot: usize) -> NotificationId {
    NotificationId::from_uuid(Uuid::from_u128(slot as u128 + 1))
}

fn record(slot: usize) -> Notification {
    Notification {
        id: slot_id(slot),
        owner: owner(),
        title: format!("slot {slot}"),
        message: "body".to_string(),
        category: NotificationCategory::Info,
        related_to: None,
        related_id: None,
        is_read: false,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
            + Duration::seconds(slot as i64 * 10),
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => any::<bool>().prop_map(|signed_in| Op::Initialize { signed_in }),
        1 => Just(Op::Teardown),
        2 => Just(Op::Refresh),
        4 => (0..SLOTS).prop_map(|slot| Op::Insert { slot }),
        3 => (0..SLOTS).prop_map(|slot| Op::MarkRead { slot }),
        1 => Just(Op::MarkAllRead),
        1 => (0..SLOTS).prop_map(|slot| Op::Dismiss { slot }),
        1 => any::<bool>().prop_map(Op::FailPersist),
        1 => any::<bool>().prop_map(Op::FailFetch),
    ]
}

fn check_snapshot(
    snapshot: &NotificationSnapshot,
    read_locally: &HashSet<NotificationId>,
) -> Result<(), TestCaseError> {
    let scanned = snapshot.notifications.iter().filter(|n| !n.is_read).count();
    prop_assert_eq!(snapshot.unread_count, scanned);
    prop_assert!(
        snapshot
            .notifications
            .windows(2)
            .all(|w| w[0].order_key() > w[1].order_key())
    );
    if !snapshot.is_active() {
        prop_assert!(snapshot.notifications.is_empty());
    }
    for n in &snapshot.notifications {
        if read_locally.contains(&n.id) {
            prop_assert!(n.is_read, "{} was read in this session but shows unread", n.id);
        }
    }
    Ok(())
}

async fn replay(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let source = FlakySource::new();
    let (store, task) = NotificationStore::spawn(source.clone(), &config());
    // Ids marked read since the last (re)initialize.
    let mut read_locally: HashSet<NotificationId> = HashSet::new();

    for op in ops {
        match op {
            Op::Initialize { signed_in } => {
                read_locally.clear();
                let _ = store.initialize(signed_in.then(owner)).await;
            }
            Op::Teardown => {
                read_locally.clear();
                let _ = store.teardown().await;
            }
            Op::Refresh => {
                let _ = store.refresh().await;
            }
            Op::Insert { slot } => {
                if source.inner.get(slot_id(slot)).await.is_none() {
                    let row = record(slot);
                    source.inner.insert(row.clone()).await;
                    let _ = store.handle_insert_event(row).await;
                }
            }
            Op::MarkRead { slot } => {
                if store.mark_read(slot_id(slot)).await.is_ok() {
                    read_locally.insert(slot_id(slot));
                }
            }
            Op::MarkAllRead => {
                let _ = store.mark_all_read().await;
                read_locally.extend(store.snapshot().notifications.iter().map(|n| n.id));
            }
            Op::Dismiss { slot } => {
                if store.dismiss(slot_id(slot)).await.is_ok() {
                    read_locally.remove(&slot_id(slot));
                }
            }
            Op::FailPersist(fail) => source.set_fail_persist(fail),
            Op::FailFetch(fail) => source.set_fail_fetch(fail),
        }
        check_snapshot(&store.snapshot(), &read_locally)?;
    }

    store.shutdown().await.unwrap();
    task.await.unwrap();
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

    #[test]
    fn store_invariants_hold_under_flaky_source(ops in prop::collection::vec(op_strategy(), 0..48)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(replay(ops))?;
    }
}
