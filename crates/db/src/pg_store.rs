//! [`PgStore`]: the PostgreSQL implementation of the domain store traits.

use async_trait::async_trait;
use taskboard_core::error::CoreError;
use taskboard_core::notification::{NewNotification, Notification, NotificationView};
use taskboard_core::page::{Page, PageRequest};
use taskboard_core::store::{NotificationStore, TaskStore, UserDirectory};
use taskboard_core::task::{
    status_locked_error, NewTask, NewTaskUpdate, Task, TaskChanges, TaskFilter, TaskUpdate,
    TaskWithUpdates,
};
use taskboard_core::types::DbId;
use taskboard_core::user::UserRef;

use crate::models::task::{TaskRow, TaskUpdateRow};
use crate::repositories::{LeadRepo, NotificationRepo, TaskRepo, TaskUpdateRepo, UserRepo};
use crate::DbPool;

/// PostgreSQL error codes the store translates into domain errors.
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Classify a database error into a domain error.
///
/// Constraint violations become validation errors naming the constraint;
/// everything else is logged and reported as internal.
pub fn map_db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or("unknown").to_string();
        match db_err.code().as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => {
                return CoreError::Validation(format!(
                    "Referenced record does not exist ({constraint})"
                ));
            }
            Some(CHECK_VIOLATION) => {
                return CoreError::Validation(format!("Value rejected by {constraint}"));
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal(format!("Database error: {err}"))
}

fn task_with_updates(
    task: TaskRow,
    updates: Vec<TaskUpdateRow>,
) -> Result<TaskWithUpdates, CoreError> {
    Ok(TaskWithUpdates {
        task: task.try_into()?,
        updates: updates
            .into_iter()
            .map(TaskUpdate::try_from)
            .collect::<Result<_, _>>()?,
    })
}

/// Store backed by a shared connection pool. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert(&self, input: NewTask) -> Result<Task, CoreError> {
        TaskRepo::create(&self.pool, &input)
            .await
            .map_err(map_db_error)?
            .try_into()
    }

    async fn find(&self, id: DbId) -> Result<Option<TaskWithUpdates>, CoreError> {
        let Some(task) = TaskRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };
        let updates = TaskUpdateRepo::list_for_task(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        task_with_updates(task, updates).map(Some)
    }

    async fn update_fields(
        &self,
        id: DbId,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, CoreError> {
        if changes.status.is_none() {
            return TaskRepo::update(&self.pool, id, changes)
                .await
                .map_err(map_db_error)?
                .map(Task::try_from)
                .transpose();
        }

        // Status edits hold the row lock while checking the timeline, so a
        // concurrent append cannot slip in between check and write.
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        if !TaskRepo::lock(&mut *tx, id).await.map_err(map_db_error)? {
            return Ok(None);
        }
        if TaskUpdateRepo::exists_for_task(&mut *tx, id)
            .await
            .map_err(map_db_error)?
        {
            return Err(status_locked_error());
        }
        let row = TaskRepo::update(&mut *tx, id, changes)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        row.map(Task::try_from).transpose()
    }

    async fn append_update(
        &self,
        id: DbId,
        update: NewTaskUpdate,
    ) -> Result<Option<TaskWithUpdates>, CoreError> {
        TaskRepo::append_update(&self.pool, id, &update)
            .await
            .map_err(map_db_error)?
            .map(|(task, updates)| task_with_updates(task, updates))
            .transpose()
    }

    async fn delete(&self, id: DbId) -> Result<bool, CoreError> {
        TaskRepo::delete(&self.pool, id).await.map_err(map_db_error)
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Page<Task>, CoreError> {
        let rows = TaskRepo::list_for_user(&self.pool, user_id, filter)
            .await
            .map_err(map_db_error)?;
        let total = TaskRepo::count_for_user(&self.pool, user_id, filter)
            .await
            .map_err(map_db_error)?;
        Ok(Page {
            items: rows
                .into_iter()
                .map(Task::try_from)
                .collect::<Result<_, _>>()?,
            total,
            request: filter.page,
        })
    }

    async fn lead_exists(&self, id: DbId) -> Result<bool, CoreError> {
        LeadRepo::exists(&self.pool, id).await.map_err(map_db_error)
    }

    async fn ping(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(map_db_error)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_many(
        &self,
        batch: &[NewNotification],
    ) -> Result<Vec<Notification>, CoreError> {
        NotificationRepo::create_many(&self.pool, batch)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }

    async fn list_for_recipient(
        &self,
        recipient_id: DbId,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, CoreError> {
        let rows = NotificationRepo::list_for_recipient(
            &self.pool,
            recipient_id,
            page.limit(),
            page.offset(),
        )
        .await
        .map_err(map_db_error)?;
        let total = NotificationRepo::count_for_recipient(&self.pool, recipient_id)
            .await
            .map_err(map_db_error)?;
        Ok(Page {
            items: rows
                .into_iter()
                .map(NotificationView::try_from)
                .collect::<Result<_, _>>()?,
            total,
            request: page,
        })
    }

    async fn unread_count(&self, recipient_id: DbId) -> Result<i64, CoreError> {
        NotificationRepo::unread_count(&self.pool, recipient_id)
            .await
            .map_err(map_db_error)
    }

    async fn mark_read(
        &self,
        recipient_id: DbId,
        notification_id: DbId,
    ) -> Result<Option<Notification>, CoreError> {
        NotificationRepo::mark_read(&self.pool, recipient_id, notification_id)
            .await
            .map_err(map_db_error)?
            .map(Notification::try_from)
            .transpose()
    }

    async fn mark_all_read(&self, recipient_id: DbId) -> Result<u64, CoreError> {
        NotificationRepo::mark_all_read(&self.pool, recipient_id)
            .await
            .map_err(map_db_error)
    }

    async fn delete_for_task(&self, task_id: DbId) -> Result<u64, CoreError> {
        NotificationRepo::delete_for_task(&self.pool, task_id)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find(&self, id: DbId) -> Result<Option<UserRef>, CoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(UserRef::from))
    }

    async fn find_many(&self, ids: &[DbId]) -> Result<Vec<UserRef>, CoreError> {
        Ok(UserRepo::find_many(&self.pool, ids)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(UserRef::from)
            .collect())
    }
}
