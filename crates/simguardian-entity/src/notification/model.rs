//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use simguardian_core::types::id::{NotificationId, UserId};

use super::category::NotificationCategory;

/// A notification delivered to a user, one row of the `notifications` table.
///
/// Every field except `is_read` is fixed at creation. The JSON shape matches
/// `row_to_json` output so insert events can be decoded directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The identity this notification belongs to.
    #[serde(rename = "user_id")]
    #[sqlx(rename = "user_id")]
    pub owner: UserId,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Presentation category.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub category: NotificationCategory,
    /// Kind of domain object that triggered this notification (e.g. `scam_report`).
    #[serde(default)]
    pub related_to: Option<String>,
    /// Identifier of the triggering domain object.
    #[serde(default)]
    pub related_id: Option<String>,
    /// Whether the user has read this notification.
    #[serde(default)]
    pub is_read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check if the notification has not been read yet.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }

    /// Key that orders notifications newest first when compared descending.
    ///
    /// The id breaks ties between equal timestamps so the order is total.
    pub fn order_key(&self) -> (DateTime<Utc>, NotificationId) {
        (self.created_at, self.id)
    }
}

/// Fields supplied when creating a notification; the source assigns the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    /// Recipient identity.
    pub owner: UserId,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Presentation category.
    pub category: NotificationCategory,
    /// Kind of domain object that triggered this notification.
    pub related_to: Option<String>,
    /// Identifier of the triggering domain object.
    pub related_id: Option<String>,
}

impl NewNotification {
    /// Create a notification request with no related object.
    pub fn new(
        owner: UserId,
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            title: title.into(),
            message: message.into(),
            category,
            related_to: None,
            related_id: None,
        }
    }

    /// Attach the domain object that triggered this notification.
    pub fn related(mut self, related_to: impl Into<String>, related_id: impl Into<String>) -> Self {
        self.related_to = Some(related_to.into());
        self.related_id = Some(related_id.into());
        self
    }

    /// Materialize the row with source-assigned id and timestamp.
    pub fn into_notification(self, id: NotificationId, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id,
            owner: self.owner,
            title: self.title,
            message: self.message,
            category: self.category,
            related_to: self.related_to,
            related_id: self.related_id,
            is_read: false,
            created_at,
        }
    }
}
