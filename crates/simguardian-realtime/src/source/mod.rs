//! Event source boundary: bulk reads, read-flag writes, and insert subscriptions.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use simguardian_core::result::AppResult;
use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_entity::notification::Notification;

pub use memory::MemoryEventSource;
pub use postgres::PgEventSource;

/// Row store backing the notification store.
///
/// Implementations report I/O failures as `ErrorKind::Unavailable`.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Fetch every notification owned by `owner`.
    async fn fetch_notifications(&self, owner: UserId) -> AppResult<Vec<Notification>>;

    /// Persist the read flag of one notification.
    async fn update_read_flag(&self, id: NotificationId, value: bool) -> AppResult<()>;

    /// Persist the read flag of several notifications as one logical write.
    async fn update_read_flags(&self, ids: &[NotificationId], value: bool) -> AppResult<()> {
        for id in ids {
            self.update_read_flag(*id, value).await?;
        }
        Ok(())
    }

    /// Open a subscription delivering rows inserted for `owner` from now on.
    ///
    /// Delivery is at-least-once; the same row may arrive more than once.
    async fn subscribe_inserts(&self, owner: UserId) -> AppResult<InsertSubscription>;
}

/// Cancellable registration for insert events.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: u64,
    token: CancellationToken,
}

impl SubscriptionHandle {
    /// Create a handle with a fresh cancellation token.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    /// Source-assigned subscription number.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop delivery. Idempotent.
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    /// Whether delivery is still wanted.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves once `unsubscribe` has been called.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// An open insert subscription: the handle plus the receiving end of its channel.
#[derive(Debug)]
pub struct InsertSubscription {
    /// Handle used to cancel delivery.
    pub handle: SubscriptionHandle,
    /// Inserted rows, in source delivery order.
    pub events: mpsc::Receiver<Notification>,
}

impl InsertSubscription {
    /// Cancel delivery and discard anything still buffered.
    pub fn close(mut self) {
        self.handle.unsubscribe();
        self.events.close();
    }
}
