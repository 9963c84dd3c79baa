//! Task lifecycle orchestration.
//!
//! [`TaskLifecycleService`] validates task mutations, persists them through
//! a [`TaskStore`], and fans the resulting events out to recipients through a
//! [`NotificationStore`]. Notification fan-out is an at-most-once, unretried
//! side effect: it runs after the task write has committed and its failure
//! is reported in [`TaskOutcome::fan_out`] instead of failing the call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CoreError;
use crate::fanout::{assignment_batch, assignment_email, status_update_batch, FanOut};
use crate::notification::NewNotification;
use crate::page::Page;
use crate::store::{Mailer, NotificationStore, TaskStore, UserDirectory};
use crate::task::{
    referenced_users, status_locked_error, CreateStatusUpdate, CreateTask, NewTask, Task,
    TaskDetail, TaskFilter, TaskUpdate, TaskUpdateView, TaskView, UpdateTask,
};
use crate::types::DbId;
use crate::user::UserRef;

/// A task mutation together with the outcome of its notification fan-out.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task: TaskDetail,
    pub fan_out: FanOut,
}

/// Orchestrates task creation, edits, status updates, and deletion.
#[derive(Clone)]
pub struct TaskLifecycleService {
    tasks: Arc<dyn TaskStore>,
    notifications: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl TaskLifecycleService {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        notifications: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            tasks,
            notifications,
            users,
            mailer: None,
        }
    }

    /// Enable the assignment e-mail side channel.
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Create a task assigned by `actor_id` and notify the assignee and
    /// watchers.
    pub async fn create_task(
        &self,
        actor_id: DbId,
        input: CreateTask,
    ) -> Result<TaskOutcome, CoreError> {
        let (actor, new_task, users) = self.prepare_create(actor_id, input).await?;

        let task = self.tasks.insert(new_task).await?;
        tracing::info!(
            task_id = task.id,
            actor_id = actor.id,
            assigned_to = task.assigned_to,
            "Task created"
        );

        let fan_out = self.fan_out(task.id, assignment_batch(&task, &actor)).await;

        if task.assigned_to != actor.id {
            if let Some(assignee) = users.get(&task.assigned_to) {
                self.send_assignment_email(&task, &actor, assignee).await;
            }
        }

        let task = self.populate(task, Vec::new()).await?;
        Ok(TaskOutcome { task, fan_out })
    }

    /// Run every check `create_task` performs without writing anything.
    /// Lets callers reject a request before storing its uploads.
    pub async fn validate_create(
        &self,
        actor_id: DbId,
        input: &CreateTask,
    ) -> Result<(), CoreError> {
        self.prepare_create(actor_id, input.clone()).await.map(|_| ())
    }

    /// Run every check `post_status_update` performs without writing anything.
    pub async fn validate_status_update(
        &self,
        actor_id: DbId,
        task_id: DbId,
        input: &CreateStatusUpdate,
    ) -> Result<(), CoreError> {
        let actor = self.resolve_actor(actor_id).await?;
        input.clone().into_new_update(actor.id)?;
        match self.tasks.find(task_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("Task", task_id)),
        }
    }

    async fn prepare_create(
        &self,
        actor_id: DbId,
        input: CreateTask,
    ) -> Result<(UserRef, NewTask, HashMap<DbId, UserRef>), CoreError> {
        let actor = self.resolve_actor(actor_id).await?;
        let new_task = input.into_new_task(actor.id)?;

        let mut referenced = vec![new_task.assigned_to];
        referenced.extend(new_task.watchers.iter().copied());
        let users = self.ensure_users_exist(&referenced).await?;
        if let Some(lead_id) = new_task.lead_id {
            self.ensure_lead_exists(lead_id).await?;
        }
        Ok((actor, new_task, users))
    }

    /// Apply a partial edit. Never touches the timeline and never notifies.
    ///
    /// `status` is only accepted while the timeline is empty, so the stored
    /// status keeps mirroring the latest update.
    pub async fn update_task_fields(
        &self,
        actor_id: DbId,
        task_id: DbId,
        input: UpdateTask,
    ) -> Result<TaskDetail, CoreError> {
        let changes = input.into_changes()?;
        let existing = self
            .tasks
            .find(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Task", task_id))?;

        if changes.status.is_some() && !existing.updates.is_empty() {
            return Err(status_locked_error());
        }

        let mut referenced: Vec<DbId> = changes.assigned_to.into_iter().collect();
        if let Some(watchers) = &changes.watchers {
            referenced.extend(watchers.iter().copied());
        }
        self.ensure_users_exist(&referenced).await?;
        if let Some(Some(lead_id)) = changes.lead_id {
            self.ensure_lead_exists(lead_id).await?;
        }

        if changes.is_empty() {
            return self.populate(existing.task, existing.updates).await;
        }

        let task = self
            .tasks
            .update_fields(task_id, &changes)
            .await?
            .ok_or_else(|| CoreError::not_found("Task", task_id))?;

        if let Some(status) = changes.status.filter(|s| *s != existing.task.status) {
            tracing::warn!(
                task_id,
                actor_id,
                status = status.as_str(),
                timeline_skipped = true,
                "Task status corrected without a timeline entry"
            );
        } else {
            tracing::info!(task_id, actor_id, "Task fields updated");
        }

        self.populate(task, existing.updates).await
    }

    /// Append a status update authored by `actor_id` and notify the assigner
    /// and watchers.
    pub async fn post_status_update(
        &self,
        actor_id: DbId,
        task_id: DbId,
        input: CreateStatusUpdate,
    ) -> Result<TaskOutcome, CoreError> {
        let actor = self.resolve_actor(actor_id).await?;
        let update = input.into_new_update(actor.id)?;
        let status = update.status;

        let record = self
            .tasks
            .append_update(task_id, update)
            .await?
            .ok_or_else(|| CoreError::not_found("Task", task_id))?;
        tracing::info!(
            task_id,
            actor_id = actor.id,
            status = status.as_str(),
            timeline_len = record.updates.len(),
            "Task status updated"
        );

        let fan_out = self
            .fan_out(task_id, status_update_batch(&record.task, &actor, status))
            .await;

        let task = self.populate(record.task, record.updates).await?;
        Ok(TaskOutcome { task, fan_out })
    }

    /// Delete a task, then its notifications.
    ///
    /// The two deletes are separate writes. If the second fails the task is
    /// still gone and the orphaned notifications are tolerated by readers.
    pub async fn delete_task(&self, task_id: DbId) -> Result<(), CoreError> {
        if !self.tasks.delete(task_id).await? {
            return Err(CoreError::not_found("Task", task_id));
        }

        match self.notifications.delete_for_task(task_id).await {
            Ok(removed) => {
                tracing::info!(task_id, removed_notifications = removed, "Task deleted");
            }
            Err(e) => {
                tracing::error!(
                    task_id,
                    error = %e,
                    "Task deleted but its notifications could not be removed"
                );
            }
        }
        Ok(())
    }

    /// Fetch one task with its timeline in storage order.
    pub async fn get_task(&self, task_id: DbId) -> Result<TaskDetail, CoreError> {
        let record = self
            .tasks
            .find(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Task", task_id))?;
        self.populate(record.task, record.updates).await
    }

    /// The timeline of one task, newest first.
    pub async fn timeline(&self, task_id: DbId) -> Result<Vec<TaskUpdateView>, CoreError> {
        let mut updates = self.get_task(task_id).await?.updates;
        updates.reverse();
        Ok(updates)
    }

    /// Tasks the actor participates in.
    pub async fn list_tasks(
        &self,
        actor_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Page<TaskView>, CoreError> {
        let page = self.tasks.list_for_user(actor_id, filter).await?;

        let mut ids: Vec<DbId> = page
            .items
            .iter()
            .flat_map(|t| referenced_users(t, &[]))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        let users = self.user_map(&ids).await?;

        Ok(page.map(|task| task_view(task, &users)))
    }

    /* ----------------------------------------------------------------------
    Internals
    ---------------------------------------------------------------------- */

    async fn resolve_actor(&self, actor_id: DbId) -> Result<UserRef, CoreError> {
        self.users
            .find(actor_id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized(format!("Unknown user {actor_id}")))
    }

    async fn user_map(&self, ids: &[DbId]) -> Result<HashMap<DbId, UserRef>, CoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = self.users.find_many(ids).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    /// Resolve `ids`, failing on the first one that does not exist.
    async fn ensure_users_exist(
        &self,
        ids: &[DbId],
    ) -> Result<HashMap<DbId, UserRef>, CoreError> {
        let users = self.user_map(ids).await?;
        if let Some(missing) = ids.iter().find(|id| !users.contains_key(id)) {
            return Err(CoreError::not_found("User", *missing));
        }
        Ok(users)
    }

    async fn ensure_lead_exists(&self, lead_id: DbId) -> Result<(), CoreError> {
        if self.tasks.lead_exists(lead_id).await? {
            Ok(())
        } else {
            Err(CoreError::not_found("Lead", lead_id))
        }
    }

    /// Insert one batch of notifications, recording rather than raising
    /// failures.
    async fn fan_out(&self, task_id: DbId, batch: Vec<NewNotification>) -> FanOut {
        if batch.is_empty() {
            return FanOut::Skipped;
        }

        let attempted = batch.len();
        match self.notifications.insert_many(&batch).await {
            Ok(created) => {
                tracing::debug!(task_id, recipient_count = created.len(), "Notifications created");
                FanOut::Created {
                    count: created.len(),
                }
            }
            Err(e) => {
                tracing::error!(
                    task_id,
                    attempted,
                    error = %e,
                    fan_out = "failed",
                    "Notification fan-out failed; task mutation kept"
                );
                FanOut::Failed {
                    attempted,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn send_assignment_email(&self, task: &Task, actor: &UserRef, assignee: &UserRef) {
        let Some(mailer) = &self.mailer else {
            return;
        };
        if let Err(e) = mailer.send(assignment_email(task, actor, assignee)).await {
            tracing::warn!(
                task_id = task.id,
                to = %assignee.email,
                error = %e,
                "Assignment email failed"
            );
        }
    }

    async fn populate(
        &self,
        task: Task,
        updates: Vec<TaskUpdate>,
    ) -> Result<TaskDetail, CoreError> {
        let users = self.user_map(&referenced_users(&task, &updates)).await?;
        let updates = updates
            .into_iter()
            .map(|u| TaskUpdateView {
                id: u.id,
                status: u.status,
                remarks: u.remarks,
                files: u.files,
                updated_by: users.get(&u.updated_by).cloned(),
                created_at: u.created_at,
            })
            .collect();
        Ok(TaskDetail {
            task: task_view(task, &users),
            updates,
        })
    }
}

/// Resolve a task's user references; unknown users become `None` or are
/// dropped from the watcher list.
fn task_view(task: Task, users: &HashMap<DbId, UserRef>) -> TaskView {
    TaskView {
        id: task.id,
        title: task.title,
        description: task.description,
        due_date: task.due_date,
        assigned_to: users.get(&task.assigned_to).cloned(),
        assigned_by: users.get(&task.assigned_by).cloned(),
        watchers: task
            .watchers
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect(),
        status: task.status,
        priority: task.priority,
        lead_id: task.lead_id,
        assigned_date: task.assigned_date,
        files: task.files,
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}
