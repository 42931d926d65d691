//! `LISTEN/NOTIFY` consumer for inserted notification rows.

use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tracing::{debug, warn};

use simguardian_core::error::{AppError, ErrorKind};
use simguardian_core::result::AppResult;
use simguardian_core::types::id::{NotificationId, UserId};

/// Channel the `notifications` insert trigger announces on.
///
/// Must match the name used in the trigger migration.
pub const INSERT_CHANNEL: &str = "notifications_inserted";

/// Key of a freshly inserted row, as announced by the insert trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InsertAnnouncement {
    /// Inserted notification.
    pub id: NotificationId,
    /// Owner of the inserted notification.
    #[serde(rename = "user_id")]
    pub owner: UserId,
}

/// Receives announcements from the `notifications` insert trigger.
///
/// Holds one dedicated connection outside the pool's accounting.
pub struct NotificationListener {
    listener: PgListener,
}

impl std::fmt::Debug for NotificationListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationListener")
            .field("channel", &INSERT_CHANNEL)
            .finish_non_exhaustive()
    }
}

impl NotificationListener {
    /// Open a listener connection and subscribe to [`INSERT_CHANNEL`].
    pub async fn connect(pool: &PgPool) -> AppResult<Self> {
        let mut listener = PgListener::connect_with(pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to open listener connection", e)
        })?;
        listener.listen(INSERT_CHANNEL).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to LISTEN on '{INSERT_CHANNEL}'"),
                e,
            )
        })?;
        debug!(channel = INSERT_CHANNEL, "Listening for inserted notifications");
        Ok(Self { listener })
    }

    /// Wait for the next insert announcement.
    ///
    /// Payloads that do not decode are logged and skipped. A dropped
    /// connection is re-established by sqlx before the next wait.
    pub async fn recv(&mut self) -> AppResult<InsertAnnouncement> {
        loop {
            let note = self.listener.recv().await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Listener on '{INSERT_CHANNEL}' failed"),
                    e,
                )
            })?;
            match decode_payload(note.payload()) {
                Ok(announcement) => return Ok(announcement),
                Err(e) => warn!(
                    channel = INSERT_CHANNEL,
                    error = %e,
                    "Skipping undecodable notification payload"
                ),
            }
        }
    }
}

/// Decode an insert trigger payload.
pub fn decode_payload(payload: &str) -> AppResult<InsertAnnouncement> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIGGER_MIGRATION: &str =
        include_str!("../../../migrations/20240601000000_notify_inserted_ids.sql");

    #[test]
    fn test_decode_payload() {
        let payload = r#"{"id":"6f9619ff-8b86-d011-b42d-00cf4fc964ff","user_id":"0b7e7dee-87ac-4a2b-9a0e-0c3f4f1f9b21"}"#;
        let announcement = decode_payload(payload).expect("decode");
        assert_eq!(
            announcement.id.to_string(),
            "6f9619ff-8b86-d011-b42d-00cf4fc964ff"
        );
        assert_eq!(
            announcement.owner.to_string(),
            "0b7e7dee-87ac-4a2b-9a0e-0c3f4f1f9b21"
        );
    }

    #[test]
    fn test_decode_rejects_missing_owner() {
        let err = decode_payload(r#"{"id":"6f9619ff-8b86-d011-b42d-00cf4fc964ff"}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[test]
    fn test_trigger_announces_keys_on_insert_channel() {
        assert!(TRIGGER_MIGRATION.contains(&format!("'{INSERT_CHANNEL}'")));
        assert!(TRIGGER_MIGRATION.contains("json_build_object('id', NEW.id, 'user_id', NEW.user_id)"));
        assert!(!TRIGGER_MIGRATION.contains("row_to_json"));
    }
}
