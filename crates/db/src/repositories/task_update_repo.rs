//! Repository for the append-only `task_updates` table.

use sqlx::{PgConnection, PgExecutor};
use taskboard_core::task::NewTaskUpdate;
use taskboard_core::types::DbId;

use crate::models::task::TaskUpdateRow;

/// Column list for `task_updates` queries.
const COLUMNS: &str = "id, task_id, status, remarks, attachments, voice_note, video_note, \
                       updated_by, created_at";

/// Inserts and reads timeline entries. There is no update or delete; entries
/// disappear only through the task's `ON DELETE CASCADE`.
pub struct TaskUpdateRepo;

impl TaskUpdateRepo {
    /// Append an entry inside the caller's transaction.
    pub async fn create(
        conn: &mut PgConnection,
        task_id: DbId,
        input: &NewTaskUpdate,
    ) -> Result<TaskUpdateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO task_updates \
                (task_id, status, remarks, attachments, voice_note, video_note, updated_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskUpdateRow>(&query)
            .bind(task_id)
            .bind(input.status.as_str())
            .bind(&input.remarks)
            .bind(&input.files.attachments)
            .bind(&input.files.voice_note)
            .bind(&input.files.video_note)
            .bind(input.updated_by)
            .fetch_one(conn)
            .await
    }

    /// The full timeline of a task in insertion order.
    pub async fn list_for_task<'e, E>(
        executor: E,
        task_id: DbId,
    ) -> Result<Vec<TaskUpdateRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM task_updates \
             WHERE task_id = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, TaskUpdateRow>(&query)
            .bind(task_id)
            .fetch_all(executor)
            .await
    }

    /// Whether the task has at least one timeline entry.
    pub async fn exists_for_task<'e, E>(executor: E, task_id: DbId) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM task_updates WHERE task_id = $1)",
        )
        .bind(task_id)
        .fetch_one(executor)
        .await
    }
}
