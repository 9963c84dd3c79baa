//! In-process implementation of the store traits.
//!
//! [`MemoryStore`] keeps users, leads, tasks, and notifications in ordered
//! maps behind a single `RwLock`. It mirrors the PostgreSQL backend's
//! semantics (referential checks, newest-first ordering, null-safe task
//! joins) and backs the service and HTTP test suites.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::notification::{NewNotification, Notification, NotificationView, TaskSummary};
use crate::page::{Page, PageRequest};
use crate::store::{NotificationStore, TaskStore, UserDirectory};
use crate::task::{
    status_locked_error, NewTask, NewTaskUpdate, Task, TaskChanges, TaskFilter, TaskUpdate,
    TaskWithUpdates,
};
use crate::types::DbId;
use crate::user::UserRef;

#[derive(Default)]
struct Inner {
    last_id: DbId,
    users: BTreeMap<DbId, UserRef>,
    leads: BTreeSet<DbId>,
    tasks: BTreeMap<DbId, TaskWithUpdates>,
    notifications: BTreeMap<DbId, Notification>,
}

impl Inner {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn require_user(&self, id: DbId) -> Result<(), CoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(CoreError::not_found("User", id))
        }
    }

    fn require_lead(&self, id: Option<DbId>) -> Result<(), CoreError> {
        match id {
            Some(id) if !self.leads.contains(&id) => Err(CoreError::not_found("Lead", id)),
            _ => Ok(()),
        }
    }
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return its reference.
    pub async fn add_user(&self, name: &str, email: &str) -> UserRef {
        let mut inner = self.inner.write().await;
        let user = UserRef {
            id: inner.next_id(),
            name: name.to_string(),
            email: email.to_string(),
        };
        inner.users.insert(user.id, user.clone());
        user
    }

    /// Remove a user without touching anything that references it.
    pub async fn remove_user(&self, id: DbId) -> bool {
        self.inner.write().await.users.remove(&id).is_some()
    }

    /// Register a lead and return its id.
    pub async fn add_lead(&self) -> DbId {
        let mut inner = self.inner.write().await;
        let id = inner.next_id();
        inner.leads.insert(id);
        id
    }
}

/// Newest first, ties broken by id.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, DbId)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert(&self, input: NewTask) -> Result<Task, CoreError> {
        let mut inner = self.inner.write().await;
        inner.require_user(input.assigned_to)?;
        inner.require_user(input.assigned_by)?;
        inner.require_lead(input.lead_id)?;

        let now = Utc::now();
        let task = Task {
            id: inner.next_id(),
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            assigned_to: input.assigned_to,
            assigned_by: input.assigned_by,
            watchers: input.watchers,
            status: input.status,
            priority: input.priority,
            lead_id: input.lead_id,
            assigned_date: now,
            files: input.files,
            created_at: now,
            updated_at: now,
        };
        inner.tasks.insert(
            task.id,
            TaskWithUpdates {
                task: task.clone(),
                updates: Vec::new(),
            },
        );
        Ok(task)
    }

    async fn find(&self, id: DbId) -> Result<Option<TaskWithUpdates>, CoreError> {
        Ok(self.inner.read().await.tasks.get(&id).cloned())
    }

    async fn update_fields(
        &self,
        id: DbId,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, CoreError> {
        let mut inner = self.inner.write().await;
        if let Some(assignee) = changes.assigned_to {
            inner.require_user(assignee)?;
        }
        inner.require_lead(changes.lead_id.flatten())?;

        let Some(record) = inner.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if changes.status.is_some() && !record.updates.is_empty() {
            return Err(status_locked_error());
        }
        let task = &mut record.task;
        if let Some(title) = &changes.title {
            task.title = title.clone();
        }
        if let Some(description) = &changes.description {
            task.description = Some(description.clone());
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = changes.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(watchers) = &changes.watchers {
            task.watchers = watchers.clone();
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(lead_id) = changes.lead_id {
            task.lead_id = lead_id;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn append_update(
        &self,
        id: DbId,
        update: NewTaskUpdate,
    ) -> Result<Option<TaskWithUpdates>, CoreError> {
        let mut inner = self.inner.write().await;
        if !inner.tasks.contains_key(&id) {
            return Ok(None);
        }
        inner.require_user(update.updated_by)?;

        let entry_id = inner.next_id();
        let now = Utc::now();
        let Some(record) = inner.tasks.get_mut(&id) else {
            return Ok(None);
        };
        record.updates.push(TaskUpdate {
            id: entry_id,
            task_id: id,
            status: update.status,
            remarks: update.remarks,
            files: update.files,
            updated_by: update.updated_by,
            created_at: now,
        });
        record.task.status = update.status;
        record.task.updated_at = now;
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.inner.write().await.tasks.remove(&id).is_some())
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Page<Task>, CoreError> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .map(|r| &r.task)
            .filter(|t| filter.scope.matches(t, user_id))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.priority.map_or(true, |p| t.priority == p))
            .cloned()
            .collect();
        newest_first(&mut tasks, |t| (t.created_at, t.id));
        Ok(Page::from_sorted(tasks, filter.page))
    }

    async fn lead_exists(&self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.inner.read().await.leads.contains(&id))
    }

    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_many(&self, batch: &[NewNotification]) -> Result<Vec<Notification>, CoreError> {
        let mut inner = self.inner.write().await;
        for item in batch {
            inner.require_user(item.recipient_id)?;
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(batch.len());
        for item in batch {
            let notification = Notification {
                id: inner.next_id(),
                recipient_id: item.recipient_id,
                notification_type: item.notification_type,
                task_id: item.task_id,
                message: item.message.clone(),
                is_read: false,
                read_at: None,
                created_at: now,
            };
            inner.notifications.insert(notification.id, notification.clone());
            created.push(notification);
        }
        Ok(created)
    }

    async fn list_for_recipient(
        &self,
        recipient_id: DbId,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, CoreError> {
        let inner = self.inner.read().await;
        let mut owned: Vec<&Notification> = inner
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id)
            .collect();
        newest_first(&mut owned, |n| (n.created_at, n.id));

        let views = owned
            .into_iter()
            .map(|n| NotificationView {
                notification: n.clone(),
                task: n
                    .task_id
                    .and_then(|id| inner.tasks.get(&id))
                    .map(|r| TaskSummary {
                        id: r.task.id,
                        title: r.task.title.clone(),
                        status: r.task.status,
                    }),
            })
            .collect();
        Ok(Page::from_sorted(views, page))
    }

    async fn unread_count(&self, recipient_id: DbId) -> Result<i64, CoreError> {
        let inner = self.inner.read().await;
        let count = inner
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count();
        Ok(count as i64)
    }

    async fn mark_read(
        &self,
        recipient_id: DbId,
        notification_id: DbId,
    ) -> Result<Option<Notification>, CoreError> {
        let mut inner = self.inner.write().await;
        let Some(n) = inner
            .notifications
            .get_mut(&notification_id)
            .filter(|n| n.recipient_id == recipient_id)
        else {
            return Ok(None);
        };
        if !n.is_read {
            n.is_read = true;
            n.read_at = Some(Utc::now());
        }
        Ok(Some(n.clone()))
    }

    async fn mark_all_read(&self, recipient_id: DbId) -> Result<u64, CoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut marked = 0;
        for n in inner
            .notifications
            .values_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(now);
            marked += 1;
        }
        Ok(marked)
    }

    async fn delete_for_task(&self, task_id: DbId) -> Result<u64, CoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|_, n| n.task_id != Some(task_id));
        Ok((before - inner.notifications.len()) as u64)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find(&self, id: DbId) -> Result<Option<UserRef>, CoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[DbId]) -> Result<Vec<UserRef>, CoreError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::notification::NotificationType;
    use crate::task::{FileRefs, TaskPriority, TaskStatus};

    fn note(recipient_id: DbId, task_id: Option<DbId>) -> NewNotification {
        NewNotification {
            recipient_id,
            notification_type: NotificationType::TaskUpdated,
            task_id,
            message: "something happened".to_string(),
        }
    }

    #[tokio::test]
    async fn mark_read_enforces_ownership() {
        let store = MemoryStore::new();
        let a = store.add_user("A", "a@example.com").await;
        let b = store.add_user("B", "b@example.com").await;
        let created = store.insert_many(&[note(b.id, None)]).await.unwrap();
        let id = created[0].id;

        assert_eq!(store.mark_read(a.id, id).await.unwrap(), None);
        assert_eq!(store.unread_count(b.id).await.unwrap(), 1);

        let read = store.mark_read(b.id, id).await.unwrap().unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        // Re-reading keeps the original read timestamp.
        let again = store.mark_read(b.id, id).await.unwrap().unwrap();
        assert_eq!(again.read_at, read.read_at);
    }

    #[tokio::test]
    async fn mark_all_read_is_idempotent() {
        let store = MemoryStore::new();
        let a = store.add_user("A", "a@example.com").await;
        let b = store.add_user("B", "b@example.com").await;
        store
            .insert_many(&[note(a.id, None), note(a.id, None), note(b.id, None)])
            .await
            .unwrap();

        assert_eq!(store.mark_all_read(a.id).await.unwrap(), 2);
        assert_eq!(store.unread_count(a.id).await.unwrap(), 0);
        assert_eq!(store.mark_all_read(a.id).await.unwrap(), 0);
        assert_eq!(store.unread_count(a.id).await.unwrap(), 0);
        assert_eq!(store.unread_count(b.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_many_rejects_unknown_recipient_as_a_batch() {
        let store = MemoryStore::new();
        let a = store.add_user("A", "a@example.com").await;
        let err = store
            .insert_many(&[note(a.id, None), note(999, None)])
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "User", id: 999 });
        assert_eq!(store.unread_count(a.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paginated() {
        let store = MemoryStore::new();
        let a = store.add_user("A", "a@example.com").await;
        for _ in 0..5 {
            store.insert_many(&[note(a.id, None)]).await.unwrap();
        }

        let first = store
            .list_for_recipient(a.id, PageRequest::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items.len(), 2);
        assert!(first.items[0].notification.id > first.items[1].notification.id);

        let last = store
            .list_for_recipient(a.id, PageRequest::new(Some(3), Some(2)))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
    }

    async fn seeded_task(store: &MemoryStore) -> (DbId, Task) {
        let user = store.add_user("A", "a@example.com").await;
        let task = store
            .insert(NewTask {
                title: "Fix the gate".to_string(),
                description: None,
                due_date: Utc::now(),
                assigned_to: user.id,
                assigned_by: user.id,
                watchers: Vec::new(),
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                lead_id: None,
                files: FileRefs::default(),
            })
            .await
            .unwrap();
        (user.id, task)
    }

    #[tokio::test]
    async fn status_edit_rejected_once_timeline_exists() {
        let store = MemoryStore::new();
        let (user, task) = seeded_task(&store).await;
        store
            .append_update(
                task.id,
                NewTaskUpdate {
                    status: TaskStatus::Done,
                    remarks: None,
                    files: FileRefs::default(),
                    updated_by: user,
                },
            )
            .await
            .unwrap();

        let status_edit = TaskChanges {
            status: Some(TaskStatus::Todo),
            ..Default::default()
        };
        let err = store.update_fields(task.id, &status_edit).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("status cannot be edited"));
        let record = TaskStore::find(&store, task.id).await.unwrap().unwrap();
        assert_eq!(record.task.status, TaskStatus::Done);

        let priority_edit = TaskChanges {
            priority: Some(TaskPriority::High),
            ..Default::default()
        };
        let updated = store.update_fields(task.id, &priority_edit).await.unwrap().unwrap();
        assert_eq!(updated.priority, TaskPriority::High);
        assert_eq!(updated.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn explicit_null_lead_unlinks() {
        let store = MemoryStore::new();
        let (_, task) = seeded_task(&store).await;
        let lead = store.add_lead().await;

        let link = TaskChanges {
            lead_id: Some(Some(lead)),
            ..Default::default()
        };
        let linked = store.update_fields(task.id, &link).await.unwrap().unwrap();
        assert_eq!(linked.lead_id, Some(lead));

        let reprioritize = TaskChanges {
            priority: Some(TaskPriority::Low),
            ..Default::default()
        };
        let untouched = store.update_fields(task.id, &reprioritize).await.unwrap().unwrap();
        assert_eq!(untouched.lead_id, Some(lead));

        let unlink = TaskChanges {
            lead_id: Some(None),
            ..Default::default()
        };
        let unlinked = store.update_fields(task.id, &unlink).await.unwrap().unwrap();
        assert_eq!(unlinked.lead_id, None);
    }
}
