//! Task and task update row models.

use sqlx::FromRow;
use taskboard_core::error::CoreError;
use taskboard_core::task::{FileRefs, Task, TaskPriority, TaskStatus, TaskUpdate};
use taskboard_core::types::{DbId, Timestamp};

use super::corrupt;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Timestamp,
    pub assigned_to: DbId,
    pub assigned_by: DbId,
    pub watchers: Vec<DbId>,
    pub status: String,
    pub priority: String,
    pub lead_id: Option<DbId>,
    pub assigned_date: Timestamp,
    pub attachments: Vec<String>,
    pub voice_note: Option<String>,
    pub video_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<TaskRow> for Task {
    type Error = CoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            assigned_to: row.assigned_to,
            assigned_by: row.assigned_by,
            watchers: row.watchers,
            status: TaskStatus::from_name(&row.status).map_err(|e| corrupt("tasks.status", e))?,
            priority: TaskPriority::from_name(&row.priority)
                .map_err(|e| corrupt("tasks.priority", e))?,
            lead_id: row.lead_id,
            assigned_date: row.assigned_date,
            files: FileRefs {
                attachments: row.attachments,
                voice_note: row.voice_note,
                video_note: row.video_note,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `task_updates` table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskUpdateRow {
    pub id: DbId,
    pub task_id: DbId,
    pub status: String,
    pub remarks: Option<String>,
    pub attachments: Vec<String>,
    pub voice_note: Option<String>,
    pub video_note: Option<String>,
    pub updated_by: DbId,
    pub created_at: Timestamp,
}

impl TryFrom<TaskUpdateRow> for TaskUpdate {
    type Error = CoreError;

    fn try_from(row: TaskUpdateRow) -> Result<Self, Self::Error> {
        Ok(TaskUpdate {
            id: row.id,
            task_id: row.task_id,
            status: TaskStatus::from_name(&row.status)
                .map_err(|e| corrupt("task_updates.status", e))?,
            remarks: row.remarks,
            files: FileRefs {
                attachments: row.attachments,
                voice_note: row.voice_note,
                video_note: row.video_note,
            },
            updated_by: row.updated_by,
            created_at: row.created_at,
        })
    }
}
