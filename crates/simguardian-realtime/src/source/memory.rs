//! In-memory event source for single-node deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use simguardian_core::result::AppResult;
use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_entity::notification::{NewNotification, Notification};

use super::{EventSource, InsertSubscription, SubscriptionHandle};

#[derive(Debug)]
struct Subscriber {
    owner: UserId,
    tx: mpsc::Sender<Notification>,
    handle: SubscriptionHandle,
}

/// Process-local notification table with insert fan-out.
#[derive(Debug)]
pub struct MemoryEventSource {
    /// Notification id → row
    rows: RwLock<HashMap<NotificationId, Notification>>,
    /// Subscription id → subscriber
    subscribers: DashMap<u64, Subscriber>,
    next_subscription: AtomicU64,
    /// Buffer size for subscription channels
    buffer_size: usize,
}

impl MemoryEventSource {
    /// Create an empty source.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            subscribers: DashMap::new(),
            next_subscription: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Create a row with a fresh id and the current time, then announce it.
    pub async fn create(&self, new: NewNotification) -> Notification {
        let row = new.into_notification(NotificationId::new(), Utc::now());
        self.insert(row.clone()).await;
        row
    }

    /// Store `row` as-is (replacing any row with the same id) and announce it.
    ///
    /// Calling this twice with the same row models at-least-once delivery.
    pub async fn insert(&self, row: Notification) {
        self.rows.write().await.insert(row.id, row.clone());
        self.publish(&row).await;
    }

    /// Current stored copy of a row.
    pub async fn get(&self, id: NotificationId) -> Option<Notification> {
        self.rows.read().await.get(&id).cloned()
    }

    /// Number of subscriptions that have not been cancelled or dropped.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|s| s.handle.is_active() && !s.tx.is_closed())
            .count()
    }

    /// Deliver `row` to every live subscriber of its owner, waiting for
    /// buffer space instead of dropping the event.
    async fn publish(&self, row: &Notification) {
        self.subscribers
            .retain(|_, s| s.handle.is_active() && !s.tx.is_closed());

        // Clone out of the map so no shard lock is held across an await.
        let targets: Vec<(mpsc::Sender<Notification>, SubscriptionHandle)> = self
            .subscribers
            .iter()
            .filter(|s| s.owner == row.owner)
            .map(|s| (s.tx.clone(), s.handle.clone()))
            .collect();

        for (tx, handle) in targets {
            tokio::select! {
                _ = handle.cancelled() => {
                    debug!(subscription = handle.id(), "Subscriber cancelled during delivery");
                }
                sent = tx.send(row.clone()) => {
                    if sent.is_err() {
                        debug!(subscription = handle.id(), "Subscriber went away");
                    }
                }
            }
        }
    }
}

impl Default for MemoryEventSource {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn fetch_notifications(&self, owner: UserId) -> AppResult<Vec<Notification>> {
        let rows = self.rows.read().await;
        let mut owned: Vec<Notification> =
            rows.values().filter(|r| r.owner == owner).cloned().collect();
        owned.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
        Ok(owned)
    }

    async fn update_read_flag(&self, id: NotificationId, value: bool) -> AppResult<()> {
        match self.rows.write().await.get_mut(&id) {
            Some(row) => row.is_read = value,
            None => debug!(notification_id = %id, "Read flag update for unknown row ignored"),
        }
        Ok(())
    }

    async fn update_read_flags(&self, ids: &[NotificationId], value: bool) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        for id in ids {
            if let Some(row) = rows.get_mut(id) {
                row.is_read = value;
            }
        }
        Ok(())
    }

    async fn subscribe_inserts(&self, owner: UserId) -> AppResult<InsertSubscription> {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let handle = SubscriptionHandle::new(id);
        self.subscribers.insert(
            id,
            Subscriber {
                owner,
                tx,
                handle: handle.clone(),
            },
        );
        debug!(subscription = id, owner = %owner, "Memory subscription opened");
        Ok(InsertSubscription { handle, events: rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simguardian_entity::notification::NotificationCategory;

    fn new_for(owner: UserId, title: &str) -> NewNotification {
        NewNotification::new(owner, NotificationCategory::Info, title, "body")
    }

    #[tokio::test]
    async fn test_subscription_is_scoped_to_owner() {
        let source = MemoryEventSource::new(8);
        let alice = UserId::new();
        let bob = UserId::new();
        let mut sub = source.subscribe_inserts(alice).await.unwrap();

        source.create(new_for(bob, "for bob")).await;
        let mine = source.create(new_for(alice, "for alice")).await;

        let got = sub.events.recv().await.unwrap();
        assert_eq!(got.id, mine.id);
        assert!(sub.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let source = MemoryEventSource::new(8);
        let alice = UserId::new();
        let mut sub = source.subscribe_inserts(alice).await.unwrap();
        assert_eq!(source.subscriber_count(), 1);

        sub.handle.unsubscribe();
        source.create(new_for(alice, "late")).await;

        assert_eq!(source.subscriber_count(), 0);
        assert!(sub.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_full_buffer_waits_instead_of_dropping() {
        let source = std::sync::Arc::new(MemoryEventSource::new(1));
        let alice = UserId::new();
        let mut sub = source.subscribe_inserts(alice).await.unwrap();

        let writer = {
            let source = std::sync::Arc::clone(&source);
            tokio::spawn(async move {
                let mut ids = Vec::new();
                for i in 0..3 {
                    ids.push(source.create(new_for(alice, &format!("burst {i}"))).await.id);
                }
                ids
            })
        };

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(sub.events.recv().await.unwrap().id);
        }
        assert_eq!(received, writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_is_newest_first_and_flags_persist() {
        let source = MemoryEventSource::new(8);
        let alice = UserId::new();
        let first = source.create(new_for(alice, "first")).await;
        let second = new_for(alice, "second").into_notification(
            NotificationId::new(),
            first.created_at + chrono::Duration::seconds(5),
        );
        source.insert(second.clone()).await;

        source.update_read_flags(&[first.id], true).await.unwrap();

        let rows = source.fetch_notifications(alice).await.unwrap();
        assert_eq!(rows[0].id, second.id);
        assert!(rows[1].is_read);
    }
}
