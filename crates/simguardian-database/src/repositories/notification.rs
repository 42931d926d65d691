//! Notification repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use simguardian_core::error::{AppError, ErrorKind};
use simguardian_core::result::AppResult;
use simguardian_core::types::id::{NotificationId, UserId};
use simguardian_entity::notification::Notification;

/// Repository for the `notifications` table.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List every notification owned by a user, newest first.
    pub async fn find_by_owner(&self, owner: UserId) -> AppResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, title, message, type, related_to, related_id, is_read, created_at \
             FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list notifications", e))
    }

    /// Load one notification by id.
    pub async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, title, message, type, related_to, related_id, is_read, created_at \
             FROM notifications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load notification", e))
    }

    /// Set the read flag of one notification. Returns `false` if no row matched.
    pub async fn set_read(&self, id: NotificationId, value: bool) -> AppResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = $2 WHERE id = $1")
            .bind(id)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the read flag of many notifications in one statement.
    pub async fn set_read_many(&self, ids: &[NotificationId], value: bool) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        let result = sqlx::query("UPDATE notifications SET is_read = $2 WHERE id = ANY($1)")
            .bind(&ids)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark all read", e))?;
        Ok(result.rows_affected())
    }
}
