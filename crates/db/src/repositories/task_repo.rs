//! Repository for the `tasks` table.

use sqlx::{PgConnection, PgExecutor, PgPool};
use taskboard_core::task::{NewTask, NewTaskUpdate, TaskChanges, TaskFilter, TaskScope};
use taskboard_core::types::DbId;

use super::TaskUpdateRepo;
use crate::models::task::{TaskRow, TaskUpdateRow};

/// Column list for `tasks` queries.
const COLUMNS: &str = "id, title, description, due_date, assigned_to, assigned_by, watchers, \
                       status, priority, lead_id, assigned_date, attachments, voice_note, \
                       video_note, created_at, updated_at";

/// `WHERE` fragment selecting the tasks user `$1` participates in.
fn scope_clause(scope: TaskScope) -> &'static str {
    match scope {
        TaskScope::All => "(assigned_to = $1 OR assigned_by = $1 OR $1 = ANY(watchers))",
        TaskScope::Assigned => "assigned_to = $1",
        TaskScope::Created => "assigned_by = $1",
        TaskScope::Watching => "$1 = ANY(watchers)",
    }
}

/// Provides CRUD operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new task, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewTask) -> Result<TaskRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
                (title, description, due_date, assigned_to, assigned_by, watchers, status, \
                 priority, lead_id, attachments, voice_note, video_note) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.due_date)
            .bind(input.assigned_to)
            .bind(input.assigned_by)
            .bind(&input.watchers)
            .bind(input.status.as_str())
            .bind(input.priority.as_str())
            .bind(input.lead_id)
            .bind(&input.files.attachments)
            .bind(&input.files.voice_note)
            .bind(&input.files.video_note)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a task row until the end of the caller's transaction. Returns
    /// `false` if the task does not exist.
    pub async fn lock(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM tasks WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map(|row| row.is_some())
    }

    /// Update a task. Only non-`None` fields in `changes` are applied;
    /// `lead_id: Some(None)` clears the lead.
    pub async fn update<'e, E>(
        executor: E,
        id: DbId,
        changes: &TaskChanges,
    ) -> Result<Option<TaskRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE tasks SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                due_date = COALESCE($4, due_date), \
                assigned_to = COALESCE($5, assigned_to), \
                watchers = COALESCE($6, watchers), \
                priority = COALESCE($7, priority), \
                lead_id = CASE WHEN $8 THEN $9 ELSE lead_id END, \
                status = COALESCE($10, status), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(changes.due_date)
            .bind(changes.assigned_to)
            .bind(changes.watchers.as_deref())
            .bind(changes.priority.map(|p| p.as_str()))
            .bind(changes.lead_id.is_some())
            .bind(changes.lead_id.flatten())
            .bind(changes.status.map(|s| s.as_str()))
            .fetch_optional(executor)
            .await
    }

    /// Overwrite the task status and append the matching timeline entry in
    /// one transaction. Returns `None` (and writes nothing) if the task does
    /// not exist.
    ///
    /// The `UPDATE` takes the row lock first, so concurrent appends to the
    /// same task serialize and the stored status always matches the entry
    /// with the highest id.
    pub async fn append_update(
        pool: &PgPool,
        id: DbId,
        input: &NewTaskUpdate,
    ) -> Result<Option<(TaskRow, Vec<TaskUpdateRow>)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE tasks SET status = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let task = sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(input.status.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(task) = task else {
            return Ok(None);
        };

        TaskUpdateRepo::create(&mut *tx, id, input).await?;
        let updates = TaskUpdateRepo::list_for_task(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(Some((task, updates)))
    }

    /// Delete a task. Its timeline goes with it through the foreign key.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List one page of the tasks `user_id` participates in, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Vec<TaskRow>, sqlx::Error> {
        let scope = scope_clause(filter.scope);
        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             WHERE {scope} \
               AND ($2::text IS NULL OR status = $2) \
               AND ($3::text IS NULL OR priority = $3) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(user_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.priority.map(|p| p.as_str()))
            .bind(filter.page.limit())
            .bind(filter.page.offset())
            .fetch_all(pool)
            .await
    }

    /// Total rows matching the same predicate as [`TaskRepo::list_for_user`].
    pub async fn count_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &TaskFilter,
    ) -> Result<i64, sqlx::Error> {
        let scope = scope_clause(filter.scope);
        let query = format!(
            "SELECT COUNT(*) FROM tasks \
             WHERE {scope} \
               AND ($2::text IS NULL OR status = $2) \
               AND ($3::text IS NULL OR priority = $3)"
        );
        sqlx::query_scalar(&query)
            .bind(user_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.priority.map(|p| p.as_str()))
            .fetch_one(pool)
            .await
    }
}
