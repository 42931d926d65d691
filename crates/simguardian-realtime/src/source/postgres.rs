//! PostgreSQL event source backed by the `notifications` table.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use simguardian_core::config::NotificationStoreConfig;
use simguardian_core::error::{AppError, ErrorKind};
use simguardian_core::result::AppResult;
use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_database::listener::NotificationListener;
use simguardian_database::repositories::NotificationRepository;
use simguardian_entity::notification::Notification;

use super::{EventSource, InsertSubscription, SubscriptionHandle};

/// Reads and writes through [`NotificationRepository`] and listens for
/// insert announcements on the trigger's `NOTIFY` channel.
#[derive(Debug)]
pub struct PgEventSource {
    pool: PgPool,
    repo: NotificationRepository,
    /// Buffer size for subscription channels
    buffer_size: usize,
    next_subscription: AtomicU64,
}

impl PgEventSource {
    /// Create a source over an existing pool.
    pub fn new(pool: PgPool, config: &NotificationStoreConfig) -> Self {
        Self {
            repo: NotificationRepository::new(pool.clone()),
            pool,
            buffer_size: config.event_buffer.max(1),
            next_subscription: AtomicU64::new(1),
        }
    }
}

/// Re-tag storage failures so the store sees them as source outages.
fn unavailable(err: AppError) -> AppError {
    if err.kind == ErrorKind::Unavailable {
        return err;
    }
    AppError {
        kind: ErrorKind::Unavailable,
        message: format!("Notification source unavailable: {}", err.message),
        source: err.source,
    }
}

#[async_trait]
impl EventSource for PgEventSource {
    async fn fetch_notifications(&self, owner: UserId) -> AppResult<Vec<Notification>> {
        self.repo.find_by_owner(owner).await.map_err(unavailable)
    }

    async fn update_read_flag(&self, id: NotificationId, value: bool) -> AppResult<()> {
        let matched = self.repo.set_read(id, value).await.map_err(unavailable)?;
        if !matched {
            debug!(notification_id = %id, "Read flag update matched no row");
        }
        Ok(())
    }

    async fn update_read_flags(&self, ids: &[NotificationId], value: bool) -> AppResult<()> {
        let updated = self
            .repo
            .set_read_many(ids, value)
            .await
            .map_err(unavailable)?;
        debug!(requested = ids.len(), updated, "Batched read flag update");
        Ok(())
    }

    async fn subscribe_inserts(&self, owner: UserId) -> AppResult<InsertSubscription> {
        let mut listener = NotificationListener::connect(&self.pool)
            .await
            .map_err(unavailable)?;

        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let handle = SubscriptionHandle::new(id);
        let (tx, rx) = mpsc::channel(self.buffer_size);

        let task_handle = handle.clone();
        let repo = self.repo.clone();
        tokio::spawn(async move {
            loop {
                let announcement = tokio::select! {
                    _ = task_handle.cancelled() => break,
                    received = listener.recv() => match received {
                        Ok(a) if a.owner == owner => a,
                        Ok(_) => continue,
                        Err(e) => {
                            warn!(subscription = id, error = %e, "Insert listener stopped");
                            break;
                        }
                    },
                };

                let row = match repo.find_by_id(announcement.id).await {
                    Ok(Some(row)) => row,
                    Ok(None) => {
                        debug!(notification_id = %announcement.id, "Announced row is gone");
                        continue;
                    }
                    Err(e) => {
                        warn!(
                            subscription = id,
                            notification_id = %announcement.id,
                            error = %e,
                            "Failed to load announced row"
                        );
                        continue;
                    }
                };

                tokio::select! {
                    _ = task_handle.cancelled() => break,
                    sent = tx.send(row) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(subscription = id, "Postgres subscription closed");
        });

        debug!(subscription = id, owner = %owner, "Postgres subscription opened");
        Ok(InsertSubscription { handle, events: rx })
    }
}
