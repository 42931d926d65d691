//! Cloneable handle to the notification store task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use simguardian_core::config::NotificationStoreConfig;
use simguardian_core::error::AppError;
use simguardian_core::result::AppResult;
use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_entity::notification::Notification;

use crate::source::EventSource;

use super::actor::{Command, StoreActor};
use super::snapshot::{NotificationSnapshot, StoreEvent};

/// Local view of one identity's notifications and its unread counter.
///
/// All mutations are serialized through a single background task. Reads go
/// through [`snapshot`](Self::snapshot) and never wait on that task.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<NotificationSnapshot>>,
    events: broadcast::Sender<StoreEvent>,
}

impl NotificationStore {
    /// Start the store task over `source`.
    ///
    /// The store begins uninitialized. The task runs until
    /// [`shutdown`](Self::shutdown) or until every handle is dropped.
    pub fn spawn(
        source: Arc<dyn EventSource>,
        config: &NotificationStoreConfig,
    ) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(config.command_buffer.max(1));
        let (snapshots_tx, snapshots_rx) =
            watch::channel(Arc::new(NotificationSnapshot::uninitialized(0)));
        let (events_tx, _) = broadcast::channel(config.announcement_buffer.max(1));

        let actor = StoreActor::new(
            source,
            snapshots_tx,
            events_tx.clone(),
            Duration::from_secs(config.persist_drain_seconds),
        );
        let task = tokio::spawn(actor.run(commands_rx));
        debug!("Notification store started");

        (
            Self {
                commands: commands_tx,
                snapshots: snapshots_rx,
                events: events_tx,
            },
            task,
        )
    }

    /// Bind the store to `owner`: subscribe, fetch, and publish the list.
    ///
    /// Any previous binding is torn down first. Returns the unread count.
    /// `None` fails with `IdentityMissing` and leaves the store empty.
    pub async fn initialize(&self, owner: Option<UserId>) -> AppResult<usize> {
        self.request(|reply| Command::Initialize { owner, reply })
            .await?
    }

    /// Close the subscription and clear the list. Returns `false` if the
    /// store was already uninitialized.
    pub async fn teardown(&self) -> AppResult<bool> {
        self.request(|reply| Command::Teardown { reply }).await
    }

    /// Re-fetch the active identity's notifications, replacing the list.
    ///
    /// On failure the current list is kept.
    pub async fn refresh(&self) -> AppResult<usize> {
        self.request(|reply| Command::Refresh { reply }).await?
    }

    /// Merge an inserted row. Returns `true` if it was added.
    pub async fn handle_insert_event(&self, record: Notification) -> AppResult<bool> {
        self.request(|reply| Command::Insert { record, reply }).await
    }

    /// Mark one notification read. Returns `true` if it was unread.
    pub async fn mark_read(&self, id: NotificationId) -> AppResult<bool> {
        self.request(|reply| Command::MarkRead { id, reply }).await?
    }

    /// Mark every unread notification read. Returns how many flipped.
    pub async fn mark_all_read(&self) -> AppResult<usize> {
        self.request(|reply| Command::MarkAllRead { reply }).await
    }

    /// Hide a notification locally. The source keeps the row.
    pub async fn dismiss(&self, id: NotificationId) -> AppResult<Notification> {
        self.request(|reply| Command::Dismiss { id, reply }).await?
    }

    /// Tear down and stop the task, waiting for in-flight read-state writes.
    pub async fn shutdown(&self) -> AppResult<()> {
        match self.request(|reply| Command::Shutdown { reply }).await {
            Ok(()) => Ok(()),
            Err(_) if self.commands.is_closed() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<NotificationSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Current unread count.
    pub fn unread_count(&self) -> usize {
        self.snapshots.borrow().unread_count
    }

    /// Receiver that observes every snapshot published from now on.
    pub fn subscribe_changes(&self) -> watch::Receiver<Arc<NotificationSnapshot>> {
        let mut rx = self.snapshots.clone();
        rx.borrow_and_update();
        rx
    }

    /// Receiver for arrival, persistence, and subscription events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> AppResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())
    }
}

fn stopped() -> AppError {
    AppError::internal("Notification store has stopped")
}
