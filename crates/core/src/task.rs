//! Task domain types, status/priority enums, and input validation.
//!
//! A task carries an append-only timeline of [`TaskUpdate`] entries. The
//! task's `status` always mirrors the most recent update (or the
//! creation-time status when the timeline is empty).

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::user::UserRef;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Maximum length for a task title.
pub const MAX_TITLE_LENGTH: usize = 200;

/* --------------------------------------------------------------------------
Enums
-------------------------------------------------------------------------- */

/// Workflow status of a task. Any transition between the three states is
/// permitted, including reopening a finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "Todo")]
    Todo,
    #[serde(alias = "InProgress", alias = "In Progress")]
    InProgress,
    #[serde(alias = "Done")]
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Stored representation (`todo`, `in_progress`, `done`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parse the stored representation.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid task status '{name}'. Must be one of: todo, in_progress, done"
                ))
            })
    }

    /// Human-readable label used in notification messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid task priority '{name}'. Must be one of: low, medium, high, urgent"
                ))
            })
    }
}

/* --------------------------------------------------------------------------
Stored entities
-------------------------------------------------------------------------- */

/// Opaque file references (blob URLs) attached to a task or an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRefs {
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub voice_note: Option<String>,
    #[serde(default)]
    pub video_note: Option<String>,
}

impl FileRefs {
    /// Merge freshly uploaded files into references supplied by the client.
    /// Uploaded voice/video notes replace client-supplied ones.
    pub fn merge(&mut self, uploaded: FileRefs) {
        self.attachments.extend(uploaded.attachments);
        if uploaded.voice_note.is_some() {
            self.voice_note = uploaded.voice_note;
        }
        if uploaded.video_note.is_some() {
            self.video_note = uploaded.video_note;
        }
    }
}

/// A persisted task, with user references left unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Timestamp,
    pub assigned_to: DbId,
    pub assigned_by: DbId,
    pub watchers: Vec<DbId>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub lead_id: Option<DbId>,
    pub assigned_date: Timestamp,
    pub files: FileRefs,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One immutable timeline entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub id: DbId,
    pub task_id: DbId,
    pub status: TaskStatus,
    pub remarks: Option<String>,
    pub files: FileRefs,
    pub updated_by: DbId,
    pub created_at: Timestamp,
}

/// A task together with its timeline in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskWithUpdates {
    pub task: Task,
    pub updates: Vec<TaskUpdate>,
}

/* --------------------------------------------------------------------------
Store inputs
-------------------------------------------------------------------------- */

/// Fully validated insert payload handed to a [`TaskStore`](crate::store::TaskStore).
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Timestamp,
    pub assigned_to: DbId,
    pub assigned_by: DbId,
    pub watchers: Vec<DbId>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub lead_id: Option<DbId>,
    pub files: FileRefs,
}

/// Validated partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub assigned_to: Option<DbId>,
    pub watchers: Option<Vec<DbId>>,
    pub priority: Option<TaskPriority>,
    /// `Some(None)` unlinks the lead.
    pub lead_id: Option<Option<DbId>>,
    pub status: Option<TaskStatus>,
}

/// Timeline entry to append.
#[derive(Debug, Clone)]
pub struct NewTaskUpdate {
    pub status: TaskStatus,
    pub remarks: Option<String>,
    pub files: FileRefs,
    pub updated_by: DbId,
}

/* --------------------------------------------------------------------------
Request DTOs
-------------------------------------------------------------------------- */

/// DTO for creating a task.
///
/// Required fields are `Option` so that a missing value surfaces as a
/// validation error with a field name instead of a generic decode failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateTask {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub assigned_to: Option<DbId>,
    #[serde(default)]
    #[validate(length(max = 50, message = "must contain at most 50 users"))]
    pub watchers: Vec<DbId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub lead_id: Option<DbId>,
    #[serde(flatten)]
    pub files: FileRefs,
}

/// DTO for `PATCH /tasks/{id}`. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTask {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub assigned_to: Option<DbId>,
    #[validate(length(max = 50, message = "must contain at most 50 users"))]
    pub watchers: Option<Vec<DbId>>,
    pub priority: Option<TaskPriority>,
    /// Absent keeps the lead, `null` unlinks it.
    #[serde(default, deserialize_with = "present_or_null")]
    pub lead_id: Option<Option<DbId>>,
    pub status: Option<TaskStatus>,
}

/// DTO for `POST /tasks/{id}/updates`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateStatusUpdate {
    pub status: Option<TaskStatus>,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub remarks: Option<String>,
    #[serde(flatten)]
    pub files: FileRefs,
}

/* --------------------------------------------------------------------------
Validation
-------------------------------------------------------------------------- */

/// Error for a status edit on a task that already has timeline entries.
pub fn status_locked_error() -> CoreError {
    CoreError::Validation(
        "status cannot be edited once the task has updates; \
         post a status update to /tasks/{id}/updates instead"
            .to_string(),
    )
}

/// Maps a present field to `Some`, so an explicit `null` becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Remove duplicate user ids, keeping first-seen order.
pub fn dedup_watchers(watchers: &[DbId]) -> Vec<DbId> {
    let mut seen = HashSet::with_capacity(watchers.len());
    watchers.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Trim a title and reject it if nothing is left.
pub fn normalize_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text collapses to `None`.
fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl CreateTask {
    /// Validate the payload and build the insert for `actor`.
    pub fn into_new_task(self, actor: DbId) -> Result<NewTask, CoreError> {
        self.validate()?;

        let title = self
            .title
            .as_deref()
            .ok_or_else(|| CoreError::Validation("title is required".to_string()))
            .and_then(normalize_title)?;
        let due_date = self
            .due_date
            .ok_or_else(|| CoreError::Validation("due_date is required".to_string()))?;
        let assigned_to = self
            .assigned_to
            .ok_or_else(|| CoreError::Validation("assigned_to is required".to_string()))?;

        Ok(NewTask {
            title,
            description: non_blank(self.description),
            due_date,
            assigned_to,
            assigned_by: actor,
            watchers: dedup_watchers(&self.watchers),
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            lead_id: self.lead_id,
            files: self.files,
        })
    }
}

impl UpdateTask {
    /// Validate the payload into a set of field changes.
    pub fn into_changes(self) -> Result<TaskChanges, CoreError> {
        self.validate()?;

        let title = self.title.as_deref().map(normalize_title).transpose()?;

        Ok(TaskChanges {
            title,
            description: self.description,
            due_date: self.due_date,
            assigned_to: self.assigned_to,
            watchers: self.watchers.as_deref().map(dedup_watchers),
            priority: self.priority,
            lead_id: self.lead_id,
            status: self.status,
        })
    }
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
            && self.watchers.is_none()
            && self.priority.is_none()
            && self.lead_id.is_none()
            && self.status.is_none()
    }
}

impl CreateStatusUpdate {
    /// Validate the payload into a timeline entry authored by `actor`.
    pub fn into_new_update(self, actor: DbId) -> Result<NewTaskUpdate, CoreError> {
        self.validate()?;

        let status = self
            .status
            .ok_or_else(|| CoreError::Validation("status is required".to_string()))?;

        Ok(NewTaskUpdate {
            status,
            remarks: non_blank(self.remarks),
            files: self.files,
            updated_by: actor,
        })
    }
}

/* --------------------------------------------------------------------------
Listing
-------------------------------------------------------------------------- */

/// Which participation relation a task listing filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskScope {
    /// Assignee, assigner, or watcher.
    #[default]
    All,
    Assigned,
    Created,
    Watching,
}

impl TaskScope {
    /// Whether `user_id` participates in `task` under this scope.
    pub fn matches(self, task: &Task, user_id: DbId) -> bool {
        match self {
            Self::All => {
                task.assigned_to == user_id
                    || task.assigned_by == user_id
                    || task.watchers.contains(&user_id)
            }
            Self::Assigned => task.assigned_to == user_id,
            Self::Created => task.assigned_by == user_id,
            Self::Watching => task.watchers.contains(&user_id),
        }
    }
}

/// Filter for task listings.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub scope: TaskScope,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub page: crate::page::PageRequest,
}

/* --------------------------------------------------------------------------
Populated read model
-------------------------------------------------------------------------- */

/// A task with user references resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Timestamp,
    /// `None` when the referenced user no longer exists.
    pub assigned_to: Option<UserRef>,
    pub assigned_by: Option<UserRef>,
    pub watchers: Vec<UserRef>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub lead_id: Option<DbId>,
    pub assigned_date: Timestamp,
    #[serde(flatten)]
    pub files: FileRefs,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A timeline entry with its author resolved.
#[derive(Debug, Clone, Serialize)]
pub struct TaskUpdateView {
    pub id: DbId,
    pub status: TaskStatus,
    pub remarks: Option<String>,
    #[serde(flatten)]
    pub files: FileRefs,
    pub updated_by: Option<UserRef>,
    pub created_at: Timestamp,
}

/// Full task detail: the populated task plus its timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: TaskView,
    pub updates: Vec<TaskUpdateView>,
}

/// User ids referenced by a task and its timeline.
pub fn referenced_users(task: &Task, updates: &[TaskUpdate]) -> Vec<DbId> {
    let mut ids = vec![task.assigned_to, task.assigned_by];
    ids.extend(task.watchers.iter().copied());
    ids.extend(updates.iter().map(|u| u.updated_by));
    dedup_watchers(&ids)
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn valid_create() -> CreateTask {
        CreateTask {
            title: Some("  Call the supplier ".to_string()),
            due_date: Some(Utc::now()),
            assigned_to: Some(2),
            watchers: vec![3, 4, 3, 2],
            ..Default::default()
        }
    }

    #[test]
    fn status_round_trips_through_name() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_name(status.as_str()).unwrap(), status);
        }
        assert_matches!(TaskStatus::from_name("blocked"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_value(TaskStatus::InProgress).unwrap();
        assert_eq!(json, "in_progress");
        let parsed: TaskStatus = serde_json::from_value(serde_json::json!("done")).unwrap();
        assert_eq!(parsed, TaskStatus::Done);
    }

    #[test]
    fn status_accepts_display_names() {
        for (name, expected) in [
            ("Todo", TaskStatus::Todo),
            ("InProgress", TaskStatus::InProgress),
            ("In Progress", TaskStatus::InProgress),
            ("Done", TaskStatus::Done),
        ] {
            let parsed: TaskStatus = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(parsed, expected, "{name}");
        }
        assert!(serde_json::from_value::<TaskStatus>(serde_json::json!("DONE")).is_err());
    }

    #[test]
    fn patch_distinguishes_null_lead_from_absent_lead() {
        let absent: UpdateTask = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(absent.into_changes().unwrap().lead_id, None);

        let cleared: UpdateTask =
            serde_json::from_value(serde_json::json!({ "lead_id": null })).unwrap();
        let changes = cleared.into_changes().unwrap();
        assert_eq!(changes.lead_id, Some(None));
        assert!(!changes.is_empty());

        let linked: UpdateTask =
            serde_json::from_value(serde_json::json!({ "lead_id": 12 })).unwrap();
        assert_eq!(linked.into_changes().unwrap().lead_id, Some(Some(12)));
    }

    #[test]
    fn only_done_is_terminal() {
        assert!(TaskStatus::Done.is_terminal());
        assert!(!TaskStatus::Todo.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }

    #[test]
    fn priority_rejects_unknown_name() {
        assert_eq!(TaskPriority::from_name("urgent").unwrap(), TaskPriority::Urgent);
        assert_matches!(TaskPriority::from_name("critical"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn create_defaults_and_normalizes() {
        let new_task = valid_create().into_new_task(1).unwrap();
        assert_eq!(new_task.title, "Call the supplier");
        assert_eq!(new_task.assigned_by, 1);
        assert_eq!(new_task.status, TaskStatus::Todo);
        assert_eq!(new_task.priority, TaskPriority::Medium);
        assert_eq!(new_task.watchers, vec![3, 4, 2]);
    }

    #[test]
    fn create_requires_title_due_date_and_assignee() {
        let missing_title = CreateTask {
            title: None,
            ..valid_create()
        };
        assert_matches!(
            missing_title.into_new_task(1),
            Err(CoreError::Validation(msg)) if msg.contains("title")
        );

        let blank_title = CreateTask {
            title: Some("   ".to_string()),
            ..valid_create()
        };
        assert_matches!(blank_title.into_new_task(1), Err(CoreError::Validation(_)));

        let missing_due = CreateTask {
            due_date: None,
            ..valid_create()
        };
        assert_matches!(
            missing_due.into_new_task(1),
            Err(CoreError::Validation(msg)) if msg.contains("due_date")
        );

        let missing_assignee = CreateTask {
            assigned_to: None,
            ..valid_create()
        };
        assert_matches!(
            missing_assignee.into_new_task(1),
            Err(CoreError::Validation(msg)) if msg.contains("assigned_to")
        );
    }

    #[test]
    fn create_rejects_overlong_title() {
        let input = CreateTask {
            title: Some("x".repeat(MAX_TITLE_LENGTH + 1)),
            ..valid_create()
        };
        assert_matches!(
            input.into_new_task(1),
            Err(CoreError::Validation(msg)) if msg.starts_with("title")
        );
    }

    #[test]
    fn status_update_requires_status() {
        let input = CreateStatusUpdate {
            remarks: Some("half way".to_string()),
            ..Default::default()
        };
        assert_matches!(input.into_new_update(7), Err(CoreError::Validation(_)));

        let input = CreateStatusUpdate {
            status: Some(TaskStatus::Done),
            remarks: Some("   ".to_string()),
            ..Default::default()
        };
        let update = input.into_new_update(7).unwrap();
        assert_eq!(update.updated_by, 7);
        assert_eq!(update.remarks, None);
    }

    #[test]
    fn patch_dedups_watchers_and_trims_title() {
        let changes = UpdateTask {
            title: Some(" Renamed ".to_string()),
            watchers: Some(vec![5, 5, 6]),
            ..Default::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.title.as_deref(), Some("Renamed"));
        assert_eq!(changes.watchers, Some(vec![5, 6]));
        assert!(!changes.is_empty());
        assert!(TaskChanges::default().is_empty());
    }

    #[test]
    fn file_refs_merge_appends_attachments() {
        let mut refs = FileRefs {
            attachments: vec!["a".into()],
            voice_note: Some("old".into()),
            video_note: None,
        };
        refs.merge(FileRefs {
            attachments: vec!["b".into()],
            voice_note: Some("new".into()),
            video_note: None,
        });
        assert_eq!(refs.attachments, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(refs.voice_note.as_deref(), Some("new"));
        assert_eq!(refs.video_note, None);
    }

    #[test]
    fn create_payload_accepts_flattened_files() {
        let input: CreateTask = serde_json::from_value(serde_json::json!({
            "title": "Site visit",
            "due_date": "2026-11-01T09:00:00Z",
            "assigned_to": 4,
            "priority": "high",
            "attachments": ["https://blobs.example/plan.pdf"],
        }))
        .unwrap();
        assert_eq!(input.priority, Some(TaskPriority::High));
        assert_eq!(input.files.attachments.len(), 1);
    }
}
