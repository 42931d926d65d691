//! Store task: the only writer of the notification list.
//!
//! Commands from [`NotificationStore`](super::store::NotificationStore)
//! handles and rows from the active insert subscription are both consumed
//! here, one at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use simguardian_core::error::AppError;
use simguardian_core::result::AppResult;
use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_entity::notification::Notification;

use crate::source::{EventSource, InsertSubscription};

use super::formatter::Toast;
use super::list::NotificationList;
use super::snapshot::{NotificationSnapshot, StoreEvent, StoreState};

/// Requests accepted by the store task.
pub(crate) enum Command {
    Initialize {
        owner: Option<UserId>,
        reply: oneshot::Sender<AppResult<usize>>,
    },
    Teardown {
        reply: oneshot::Sender<bool>,
    },
    Refresh {
        reply: oneshot::Sender<AppResult<usize>>,
    },
    Insert {
        record: Notification,
        reply: oneshot::Sender<bool>,
    },
    MarkRead {
        id: NotificationId,
        reply: oneshot::Sender<AppResult<bool>>,
    },
    MarkAllRead {
        reply: oneshot::Sender<usize>,
    },
    Dismiss {
        id: NotificationId,
        reply: oneshot::Sender<AppResult<Notification>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Binding between the store and one identity.
struct ActiveSession {
    owner: UserId,
    generation: u64,
    /// `None` once the source closed the channel.
    subscription: Option<InsertSubscription>,
}

pub(crate) struct StoreActor {
    source: Arc<dyn EventSource>,
    list: NotificationList,
    active: Option<ActiveSession>,
    generation: u64,
    snapshots: watch::Sender<Arc<NotificationSnapshot>>,
    events: broadcast::Sender<StoreEvent>,
    /// In-flight read-flag writes
    persistence: TaskTracker,
    drain_timeout: Duration,
}

impl StoreActor {
    pub(crate) fn new(
        source: Arc<dyn EventSource>,
        snapshots: watch::Sender<Arc<NotificationSnapshot>>,
        events: broadcast::Sender<StoreEvent>,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            source,
            list: NotificationList::new(),
            active: None,
            generation: 0,
            snapshots,
            events,
            persistence: TaskTracker::new(),
            drain_timeout,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => {
                        debug!("All store handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                inserted = next_insert(&mut self.active) => match inserted {
                    Some(record) => {
                        self.merge(record);
                    }
                    None => self.subscription_closed(),
                },
            }
        }
        debug!("Notification store stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Initialize { owner, reply } => {
                let _ = reply.send(self.initialize(owner).await);
            }
            Command::Teardown { reply } => {
                let _ = reply.send(self.teardown());
            }
            Command::Refresh { reply } => {
                let _ = reply.send(self.refresh().await);
            }
            Command::Insert { record, reply } => {
                let _ = reply.send(self.merge(record));
            }
            Command::MarkRead { id, reply } => {
                let _ = reply.send(self.mark_read(id));
            }
            Command::MarkAllRead { reply } => {
                let _ = reply.send(self.mark_all_read());
            }
            Command::Dismiss { id, reply } => {
                let _ = reply.send(self.dismiss(id));
            }
            // Intercepted by `run`.
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn initialize(&mut self, owner: Option<UserId>) -> AppResult<usize> {
        self.teardown();

        let Some(owner) = owner else {
            return Err(AppError::identity_missing(
                "Cannot load notifications without a signed-in identity",
            ));
        };

        // Subscribe first so inserts racing the fetch are buffered, not lost.
        let subscription = self.source.subscribe_inserts(owner).await?;
        let rows = match self.source.fetch_notifications(owner).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(owner = %owner, error = %e, "Initial notification fetch failed");
                subscription.close();
                return Err(e);
            }
        };

        let rows: Vec<Notification> = rows.into_iter().filter(|r| r.owner == owner).collect();
        self.list = NotificationList::from_records(rows);
        self.generation += 1;
        self.active = Some(ActiveSession {
            owner,
            generation: self.generation,
            subscription: Some(subscription),
        });
        self.publish();

        info!(
            owner = %owner,
            generation = self.generation,
            total = self.list.len(),
            unread = self.list.unread_count(),
            "Notification store initialized"
        );
        Ok(self.list.unread_count())
    }

    fn teardown(&mut self) -> bool {
        let Some(session) = self.active.take() else {
            return false;
        };
        if let Some(subscription) = session.subscription {
            subscription.close();
        }
        self.list.clear();
        self.publish();
        info!(
            owner = %session.owner,
            generation = session.generation,
            "Notification store torn down"
        );
        true
    }

    async fn refresh(&mut self) -> AppResult<usize> {
        let owner = self.active_owner()?;
        let rows = self.source.fetch_notifications(owner).await.map_err(|e| {
            warn!(owner = %owner, error = %e, "Notification refresh failed, keeping current list");
            e
        })?;

        // A teardown cannot interleave here, the actor is busy with this command.
        let rows: Vec<Notification> = rows.into_iter().filter(|r| r.owner == owner).collect();
        self.list = self.list.refreshed(rows);
        self.publish();
        debug!(owner = %owner, total = self.list.len(), "Notifications refreshed");
        Ok(self.list.unread_count())
    }

    fn merge(&mut self, record: Notification) -> bool {
        let Some(session) = &self.active else {
            debug!(notification_id = %record.id, "Insert dropped, store is uninitialized");
            return false;
        };
        if record.owner != session.owner {
            debug!(
                notification_id = %record.id,
                "Insert dropped, owner does not match the active identity"
            );
            return false;
        }
        if !self.list.merge(record.clone()) {
            debug!(notification_id = %record.id, "Duplicate insert ignored");
            return false;
        }

        self.publish();
        let toast = Toast::for_notification(&record);
        let _ = self.events.send(StoreEvent::Arrived {
            notification: record,
            toast,
        });
        true
    }

    fn mark_read(&mut self, id: NotificationId) -> AppResult<bool> {
        let flipped = self.list.mark_read(id)?;
        if flipped {
            self.publish();
            self.persist(vec![id]);
        }
        Ok(flipped)
    }

    fn mark_all_read(&mut self) -> usize {
        let flipped = self.list.mark_all_read();
        if flipped.is_empty() {
            return 0;
        }
        let count = flipped.len();
        self.publish();
        self.persist(flipped);
        count
    }

    fn dismiss(&mut self, id: NotificationId) -> AppResult<Notification> {
        let removed = self.list.dismiss(id)?;
        self.publish();
        Ok(removed)
    }

    fn subscription_closed(&mut self) {
        let Some(session) = self.active.as_mut() else {
            return;
        };
        session.subscription = None;
        warn!(
            owner = %session.owner,
            generation = session.generation,
            "Insert subscription closed, live updates paused"
        );
        let _ = self.events.send(StoreEvent::SubscriptionIdle {
            owner: session.owner,
            generation: session.generation,
        });
    }

    async fn shutdown(&mut self) {
        self.teardown();
        self.persistence.close();
        if tokio::time::timeout(self.drain_timeout, self.persistence.wait())
            .await
            .is_err()
        {
            warn!(
                pending = self.persistence.len(),
                "Gave up waiting for read-state persistence"
            );
        }
    }

    /// Write read flags in the background. Never rolls back the local flip.
    fn persist(&self, ids: Vec<NotificationId>) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        self.persistence.spawn(async move {
            let result = match ids.as_slice() {
                [id] => source.update_read_flag(*id, true).await,
                _ => source.update_read_flags(&ids, true).await,
            };
            match result {
                Ok(()) => {
                    debug!(count = ids.len(), "Read state persisted");
                    let _ = events.send(StoreEvent::Persisted { ids });
                }
                Err(error) => {
                    warn!(
                        count = ids.len(),
                        error = %error,
                        "Failed to persist read state, local flag kept"
                    );
                    let _ = events.send(StoreEvent::PersistFailed { ids, error });
                }
            }
        });
    }

    fn active_owner(&self) -> AppResult<UserId> {
        self.active.as_ref().map(|s| s.owner).ok_or_else(|| {
            AppError::identity_missing("Notification store has no active identity")
        })
    }

    fn publish(&self) {
        let snapshot = match &self.active {
            Some(session) => NotificationSnapshot {
                state: StoreState::Active {
                    owner: session.owner,
                },
                generation: session.generation,
                notifications: self.list.records().to_vec(),
                unread_count: self.list.unread_count(),
            },
            None => NotificationSnapshot::uninitialized(self.generation),
        };
        self.snapshots.send_replace(Arc::new(snapshot));
    }
}

/// Next row from the active subscription. Pending forever when there is none;
/// `None` means the source closed the channel.
async fn next_insert(active: &mut Option<ActiveSession>) -> Option<Notification> {
    match active.as_mut().and_then(|s| s.subscription.as_mut()) {
        Some(subscription) => subscription.events.recv().await,
        None => std::future::pending().await,
    }
}
