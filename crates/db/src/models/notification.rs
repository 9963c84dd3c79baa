//! Notification row models.

use sqlx::FromRow;
use taskboard_core::error::CoreError;
use taskboard_core::notification::{
    Notification, NotificationType, NotificationView, TaskSummary,
};
use taskboard_core::task::TaskStatus;
use taskboard_core::types::{DbId, Timestamp};

use super::corrupt;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: DbId,
    pub recipient_id: DbId,
    pub notification_type: String,
    pub task_id: Option<DbId>,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = CoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            notification_type: NotificationType::from_name(&row.notification_type)
                .map_err(|e| corrupt("notifications.notification_type", e))?,
            task_id: row.task_id,
            message: row.message,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

/// A notification joined with the task it references. The task columns are
/// all `NULL` when the task has since been deleted.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationWithTaskRow {
    #[sqlx(flatten)]
    pub notification: NotificationRow,
    pub task_ref_id: Option<DbId>,
    pub task_title: Option<String>,
    pub task_status: Option<String>,
}

impl TryFrom<NotificationWithTaskRow> for NotificationView {
    type Error = CoreError;

    fn try_from(row: NotificationWithTaskRow) -> Result<Self, Self::Error> {
        let task = match (row.task_ref_id, row.task_title, row.task_status) {
            (Some(id), Some(title), Some(status)) => Some(TaskSummary {
                id,
                title,
                status: TaskStatus::from_name(&status).map_err(|e| corrupt("tasks.status", e))?,
            }),
            _ => None,
        };
        Ok(NotificationView {
            notification: row.notification.try_into()?,
            task,
        })
    }
}
