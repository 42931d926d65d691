//! Read-only views and events published by the notification store.

use serde::Serialize;

use simguardian_core::error::AppError;
use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_entity::notification::{Notification, NotificationCategory};

use super::formatter::Toast;

/// Lifecycle state of a store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StoreState {
    /// No identity bound; the list is empty and nothing is subscribed.
    Uninitialized,
    /// Bound to `owner` with an open insert subscription.
    Active {
        /// Identity whose notifications are shown.
        owner: UserId,
    },
}

/// Point-in-time copy of the store, published after every mutation.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationSnapshot {
    /// Lifecycle state.
    pub state: StoreState,
    /// Incremented on every successful initialize.
    pub generation: u64,
    /// Notifications, newest first.
    pub notifications: Vec<Notification>,
    /// Number of unread entries in `notifications`.
    pub unread_count: usize,
}

impl NotificationSnapshot {
    /// Empty snapshot for an unbound store.
    pub fn uninitialized(generation: u64) -> Self {
        Self {
            state: StoreState::Uninitialized,
            generation,
            notifications: Vec::new(),
            unread_count: 0,
        }
    }

    /// The bound identity, if any.
    pub fn owner(&self) -> Option<UserId> {
        match self.state {
            StoreState::Active { owner } => Some(owner),
            StoreState::Uninitialized => None,
        }
    }

    /// Whether an identity is bound.
    pub fn is_active(&self) -> bool {
        matches!(self.state, StoreState::Active { .. })
    }

    /// Look up a notification by id.
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Unread notifications, newest first.
    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().filter(|n| n.is_unread())
    }

    /// Notifications of one category, newest first.
    pub fn by_category(
        &self,
        category: NotificationCategory,
    ) -> impl Iterator<Item = &Notification> {
        self.notifications
            .iter()
            .filter(move |n| n.category == category)
    }
}

/// Out-of-band events for the presentation layer.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A live insert was merged; show a toast.
    Arrived {
        /// The merged record.
        notification: Notification,
        /// Ready-to-render toast.
        toast: Toast,
    },
    /// Read flags were persisted.
    Persisted {
        /// Affected notifications.
        ids: Vec<NotificationId>,
    },
    /// Persisting read flags failed. The local flip is kept.
    PersistFailed {
        /// Affected notifications.
        ids: Vec<NotificationId>,
        /// Source error.
        error: AppError,
    },
    /// The insert subscription closed; no further live events will arrive
    /// until the store is re-initialized.
    SubscriptionIdle {
        /// Identity the subscription belonged to.
        owner: UserId,
        /// Generation of the closed subscription.
        generation: u64,
    },
}
