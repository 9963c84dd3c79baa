//! Persistence and collaborator seams used by the task lifecycle.
//!
//! The traits are object-safe so the HTTP layer can hold `Arc<dyn ...>`
//! handles and swap the PostgreSQL backend for [`MemoryStore`] in tests.
//!
//! [`MemoryStore`]: crate::memory::MemoryStore

use async_trait::async_trait;

use crate::error::CoreError;
use crate::notification::{NewNotification, Notification, NotificationView};
use crate::page::{Page, PageRequest};
use crate::task::{NewTask, NewTaskUpdate, Task, TaskChanges, TaskFilter, TaskWithUpdates};
use crate::types::DbId;
use crate::user::UserRef;

/// Storage for tasks and their append-only timelines.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a task. `assigned_date` and timestamps are set by the store.
    async fn insert(&self, input: NewTask) -> Result<Task, CoreError>;

    /// Load a task and its timeline in insertion order.
    async fn find(&self, id: DbId) -> Result<Option<TaskWithUpdates>, CoreError>;

    /// Apply a partial update. Returns `None` when the task does not exist.
    async fn update_fields(
        &self,
        id: DbId,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, CoreError>;

    /// Append a timeline entry and overwrite the task status in one atomic
    /// write. Returns `None` when the task does not exist.
    async fn append_update(
        &self,
        id: DbId,
        update: NewTaskUpdate,
    ) -> Result<Option<TaskWithUpdates>, CoreError>;

    /// Delete a task and its timeline. Returns `false` if nothing was deleted.
    async fn delete(&self, id: DbId) -> Result<bool, CoreError>;

    /// Tasks `user_id` participates in, newest first.
    async fn list_for_user(
        &self,
        user_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Page<Task>, CoreError>;

    async fn lead_exists(&self, id: DbId) -> Result<bool, CoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), CoreError>;
}

/// Storage for per-recipient notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert all notifications as a single batch.
    async fn insert_many(&self, batch: &[NewNotification]) -> Result<Vec<Notification>, CoreError>;

    /// A recipient's notifications, newest first, regardless of read state.
    async fn list_for_recipient(
        &self,
        recipient_id: DbId,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, CoreError>;

    async fn unread_count(&self, recipient_id: DbId) -> Result<i64, CoreError>;

    /// Mark one notification read if it belongs to `recipient_id`.
    /// Returns `None` when it does not exist or is owned by someone else.
    async fn mark_read(
        &self,
        recipient_id: DbId,
        notification_id: DbId,
    ) -> Result<Option<Notification>, CoreError>;

    /// Mark every unread notification of `recipient_id` read. Returns how many
    /// changed.
    async fn mark_all_read(&self, recipient_id: DbId) -> Result<u64, CoreError>;

    /// Remove all notifications referencing `task_id`.
    async fn delete_for_task(&self, task_id: DbId) -> Result<u64, CoreError>;
}

/// Lookup of display identities by user id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, id: DbId) -> Result<Option<UserRef>, CoreError>;

    /// Resolve many ids at once. Unknown ids are silently omitted.
    async fn find_many(&self, ids: &[DbId]) -> Result<Vec<UserRef>, CoreError>;
}

/// A plain-text e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound e-mail side channel. Failures surface as [`CoreError::Upstream`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), CoreError>;
}

/// Blob storage for attachments, voice notes, and video notes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` and return a URL that can later be used to fetch it.
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, CoreError>;
}
