//! Recipient selection and batch construction for task notifications.
//!
//! Every task event fans out to one notification per distinct recipient.
//! The acting user is never a recipient of their own action.

use std::collections::HashSet;

use serde::Serialize;

use crate::notification::{
    assigned_message, status_update_message, NewNotification, NotificationType,
};
use crate::store::EmailMessage;
use crate::task::{Task, TaskStatus};
use crate::types::DbId;
use crate::user::UserRef;

/// Distinct recipients drawn from `primary` then `watchers`, excluding `actor`.
pub fn recipients(primary: DbId, watchers: &[DbId], actor: DbId) -> Vec<DbId> {
    let mut seen = HashSet::with_capacity(watchers.len() + 1);
    std::iter::once(primary)
        .chain(watchers.iter().copied())
        .filter(|id| *id != actor && seen.insert(*id))
        .collect()
}

/// `task_assigned` notifications for a newly created task: the assignee and
/// every watcher.
pub fn assignment_batch(task: &Task, actor: &UserRef) -> Vec<NewNotification> {
    let message = assigned_message(&actor.name, &task.title);
    recipients(task.assigned_to, &task.watchers, actor.id)
        .into_iter()
        .map(|recipient_id| NewNotification {
            recipient_id,
            notification_type: NotificationType::TaskAssigned,
            task_id: Some(task.id),
            message: message.clone(),
        })
        .collect()
}

/// Notifications for a status update: the assigner and every watcher.
pub fn status_update_batch(
    task: &Task,
    actor: &UserRef,
    status: TaskStatus,
) -> Vec<NewNotification> {
    let notification_type = NotificationType::for_status_update(status);
    let message = status_update_message(&actor.name, &task.title, status);
    recipients(task.assigned_by, &task.watchers, actor.id)
        .into_iter()
        .map(|recipient_id| NewNotification {
            recipient_id,
            notification_type,
            task_id: Some(task.id),
            message: message.clone(),
        })
        .collect()
}

/// Plain-text e-mail telling `assignee` about a task `actor` gave them.
pub fn assignment_email(task: &Task, actor: &UserRef, assignee: &UserRef) -> EmailMessage {
    let mut body = format!(
        "Hi {},\n\n{} assigned you a new task.\n\nTitle: {}\nPriority: {}\nDue: {}\n",
        assignee.name,
        actor.name,
        task.title,
        task.priority.as_str(),
        task.due_date.format("%Y-%m-%d %H:%M UTC"),
    );
    if let Some(description) = &task.description {
        body.push_str(&format!("\n{description}\n"));
    }

    EmailMessage {
        to: assignee.email.clone(),
        subject: format!("New task assigned: {}", task.title),
        body,
    }
}

/// Result of the best-effort notification side effect.
///
/// Fan-out is attempted once, in a single batch, after the task mutation has
/// been persisted. A failure here never rolls the mutation back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FanOut {
    /// The recipient set was empty.
    Skipped,
    Created { count: usize },
    Failed { attempted: usize, reason: String },
}

impl FanOut {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
