//! Repository for the `notifications` table.

use sqlx::{PgPool, Postgres, QueryBuilder};
use taskboard_core::notification::NewNotification;
use taskboard_core::types::DbId;

use crate::models::notification::{NotificationRow, NotificationWithTaskRow};

/// Column list for `notifications` queries.
const COLUMNS: &str =
    "id, recipient_id, notification_type, task_id, message, is_read, read_at, created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a whole batch with a single multi-row `INSERT`, so either every
    /// recipient gets their row or none does.
    pub async fn create_many(
        pool: &PgPool,
        batch: &[NewNotification],
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO notifications (recipient_id, notification_type, task_id, message) ",
        );
        builder.push_values(batch, |mut row, n| {
            row.push_bind(n.recipient_id)
                .push_bind(n.notification_type.as_str())
                .push_bind(n.task_id)
                .push_bind(&n.message);
        });
        builder.push(format!(" RETURNING {COLUMNS}"));

        builder
            .build_query_as::<NotificationRow>()
            .fetch_all(pool)
            .await
    }

    /// One page of a recipient's notifications, newest first, each joined
    /// with a summary of its task. Deleted tasks join as `NULL`.
    pub async fn list_for_recipient(
        pool: &PgPool,
        recipient_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationWithTaskRow>, sqlx::Error> {
        sqlx::query_as::<_, NotificationWithTaskRow>(
            "SELECT n.id, n.recipient_id, n.notification_type, n.task_id, n.message, \
                    n.is_read, n.read_at, n.created_at, \
                    t.id AS task_ref_id, t.title AS task_title, t.status AS task_status \
             FROM notifications n \
             LEFT JOIN tasks t ON t.id = n.task_id \
             WHERE n.recipient_id = $1 \
             ORDER BY n.created_at DESC, n.id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_recipient(
        pool: &PgPool,
        recipient_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1")
            .bind(recipient_id)
            .fetch_one(pool)
            .await
    }

    /// Get the number of unread notifications for a recipient.
    pub async fn unread_count(pool: &PgPool, recipient_id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(recipient_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Mark a single notification as read.
    ///
    /// Already-read rows keep their original `read_at`. Returns `None` when
    /// the notification does not exist or belongs to another recipient.
    pub async fn mark_read(
        pool: &PgPool,
        recipient_id: DbId,
        notification_id: DbId,
    ) -> Result<Option<NotificationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 AND recipient_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(notification_id)
            .bind(recipient_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark all unread notifications as read for a recipient.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, recipient_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(recipient_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Remove every notification that references `task_id`.
    pub async fn delete_for_task(pool: &PgPool, task_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE task_id = $1")
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
