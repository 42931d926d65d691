//! Shared fixtures for notification store integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{broadcast, watch};

use simguardian_core::config::NotificationStoreConfig;
use simguardian_core::error::AppError;
use simguardian_core::result::AppResult;
use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_entity::notification::{NewNotification, Notification, NotificationCategory};
use simguardian_realtime::notification::{NotificationSnapshot, StoreEvent};
use simguardian_realtime::source::{EventSource, InsertSubscription, MemoryEventSource};

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Fixed reference time.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Unread row owned by `owner`, created `offset_secs` after [`t0`].
pub fn row(owner: UserId, offset_secs: i64) -> Notification {
    NewNotification::new(
        owner,
        NotificationCategory::Info,
        format!("n@{offset_secs}"),
        "Your number was checked",
    )
    .into_notification(
        NotificationId::new(),
        t0() + chrono::Duration::seconds(offset_secs),
    )
}

/// Alert row owned by `owner`.
pub fn alert(owner: UserId, offset_secs: i64) -> Notification {
    let mut n = row(owner, offset_secs);
    n.category = NotificationCategory::Alert;
    n.title = "Fraud alert".to_string();
    n.message = "SIM swap attempt detected".to_string();
    n
}

pub fn config() -> NotificationStoreConfig {
    NotificationStoreConfig {
        persist_drain_seconds: 2,
        ..NotificationStoreConfig::default()
    }
}

/// A memory source with failure switches and call counters.
#[derive(Debug, Default)]
pub struct FlakySource {
    pub inner: MemoryEventSource,
    pub fail_fetch: AtomicBool,
    pub fail_persist: AtomicBool,
    pub fetch_calls: AtomicUsize,
    pub single_writes: AtomicUsize,
    pub batch_writes: AtomicUsize,
    pub batches: Mutex<Vec<Vec<NotificationId>>>,
}

impl FlakySource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    pub fn write_calls(&self) -> usize {
        self.single_writes.load(Ordering::SeqCst) + self.batch_writes.load(Ordering::SeqCst)
    }

    fn check(&self, flag: &AtomicBool, what: &str) -> AppResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(AppError::unavailable(format!("{what} failed: source offline")));
        }
        Ok(())
    }
}

#[async_trait]
impl EventSource for FlakySource {
    async fn fetch_notifications(&self, owner: UserId) -> AppResult<Vec<Notification>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_fetch, "fetch")?;
        self.inner.fetch_notifications(owner).await
    }

    async fn update_read_flag(&self, id: NotificationId, value: bool) -> AppResult<()> {
        self.single_writes.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_persist, "update")?;
        self.inner.update_read_flag(id, value).await
    }

    async fn update_read_flags(&self, ids: &[NotificationId], value: bool) -> AppResult<()> {
        self.batch_writes.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(ids.to_vec());
        self.check(&self.fail_persist, "batch update")?;
        self.inner.update_read_flags(ids, value).await
    }

    async fn subscribe_inserts(&self, owner: UserId) -> AppResult<InsertSubscription> {
        self.inner.subscribe_inserts(owner).await
    }
}

/// Wait until a published snapshot satisfies `pred`.
pub async fn wait_for_snapshot(
    rx: &mut watch::Receiver<Arc<NotificationSnapshot>>,
    pred: impl FnMut(&Arc<NotificationSnapshot>) -> bool,
) -> Arc<NotificationSnapshot> {
    let snapshot = tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("store stopped");
    Arc::clone(&snapshot)
}

/// Wait for the first store event matching `pred`, skipping others.
pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<StoreEvent>,
    mut pred: impl FnMut(&StoreEvent) -> bool,
) -> StoreEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = rx.recv().await.expect("event stream closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for store event")
}
