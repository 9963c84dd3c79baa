//! Notification types and message composition.
//!
//! A notification is an advisory, per-recipient record of a task event. Its
//! message is rendered once at creation time and never recomputed.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::task::TaskStatus;
use crate::types::{DbId, Timestamp};

/// Kind of task event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskAssigned,
    TaskUpdated,
    TaskCompleted,
}

impl NotificationType {
    pub const ALL: [NotificationType; 3] =
        [Self::TaskAssigned, Self::TaskUpdated, Self::TaskCompleted];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskAssigned => "task_assigned",
            Self::TaskUpdated => "task_updated",
            Self::TaskCompleted => "task_completed",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown notification type '{name}'")))
    }

    /// Notification type emitted when a status update moves a task to `status`.
    pub fn for_status_update(status: TaskStatus) -> Self {
        if status.is_terminal() {
            Self::TaskCompleted
        } else {
            Self::TaskUpdated
        }
    }
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub notification_type: NotificationType,
    pub task_id: Option<DbId>,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Insert payload for one notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: DbId,
    pub notification_type: NotificationType,
    pub task_id: Option<DbId>,
    pub message: String,
}

/// Task fields joined onto a notification at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub id: DbId,
    pub title: String,
    pub status: TaskStatus,
}

/// A notification as listed for its recipient.
///
/// `task` is `None` when the notification has no task or the task has been
/// deleted and the cascade has not (yet) removed this row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub task: Option<TaskSummary>,
}

/* --------------------------------------------------------------------------
Messages
-------------------------------------------------------------------------- */

/// `<actor> assigned you a new task: "<title>"`
pub fn assigned_message(actor_name: &str, title: &str) -> String {
    format!("{actor_name} assigned you a new task: \"{title}\"")
}

/// `<actor> completed the task: "<title>"`
pub fn completed_message(actor_name: &str, title: &str) -> String {
    format!("{actor_name} completed the task: \"{title}\"")
}

/// `<actor> updated the task "<title>" to "<status>"`
pub fn updated_message(actor_name: &str, title: &str, status: TaskStatus) -> String {
    format!(
        "{actor_name} updated the task \"{title}\" to \"{}\"",
        status.label()
    )
}

/// Message for a status-update event, chosen by the new status.
pub fn status_update_message(actor_name: &str, title: &str, status: TaskStatus) -> String {
    match NotificationType::for_status_update(status) {
        NotificationType::TaskCompleted => completed_message(actor_name, title),
        _ => updated_message(actor_name, title, status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_match_wire_format() {
        for kind in NotificationType::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
            assert_eq!(NotificationType::from_name(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn done_maps_to_completed() {
        assert_eq!(
            NotificationType::for_status_update(TaskStatus::Done),
            NotificationType::TaskCompleted
        );
        assert_eq!(
            NotificationType::for_status_update(TaskStatus::InProgress),
            NotificationType::TaskUpdated
        );
        assert_eq!(
            NotificationType::for_status_update(TaskStatus::Todo),
            NotificationType::TaskUpdated
        );
    }

    #[test]
    fn messages_quote_title_and_status() {
        assert_eq!(
            assigned_message("Asha", "Quote for Site 4"),
            "Asha assigned you a new task: \"Quote for Site 4\""
        );
        assert_eq!(
            status_update_message("Ben", "Quote", TaskStatus::Done),
            "Ben completed the task: \"Quote\""
        );
        assert_eq!(
            status_update_message("Ben", "Quote", TaskStatus::InProgress),
            "Ben updated the task \"Quote\" to \"In Progress\""
        );
    }
}
