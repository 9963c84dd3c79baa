//! Handlers for the `/tasks` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. The authenticated
//! user is the actor of every mutation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use taskboard_core::task::{
    CreateStatusUpdate, CreateTask, TaskDetail, TaskUpdateView, TaskView, UpdateTask,
};
use taskboard_core::types::DbId;

use crate::error::AppResult;
use crate::extract::{upload_files, AppJson, TaskForm};
use crate::middleware::auth::AuthUser;
use crate::query::TaskListParams;
use crate::response::{DataResponse, PagedResponse, TaskOutcomeResponse};
use crate::state::AppState;

/// GET /api/v1/tasks
///
/// List tasks the caller is assigned to, assigned, or watches, newest first.
pub async fn list_tasks(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> AppResult<Json<PagedResponse<TaskView>>> {
    let page = state
        .lifecycle
        .list_tasks(auth.user_id, &params.into())
        .await?;
    Ok(Json(page.into()))
}

/// POST /api/v1/tasks
///
/// Create a task assigned by the caller. Accepts JSON, or multipart with a
/// `payload` field and `attachments` / `voice_note` / `video_note` files.
pub async fn create_task(
    auth: AuthUser,
    State(state): State<AppState>,
    form: TaskForm<CreateTask>,
) -> AppResult<(StatusCode, Json<TaskOutcomeResponse>)> {
    let TaskForm { mut input, files } = form;

    if !files.is_empty() {
        // Reject invalid payloads and unknown references before uploading.
        state.lifecycle.validate_create(auth.user_id, &input).await?;
        let uploaded = upload_files(state.blobs.as_ref(), files).await?;
        input.files.merge(uploaded);
    }

    let outcome = state.lifecycle.create_task(auth.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// GET /api/v1/tasks/{id}
///
/// Fetch one task with its populated timeline in storage order.
pub async fn get_task(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaskDetail>>> {
    let task = state.lifecycle.get_task(task_id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// PATCH /api/v1/tasks/{id}
///
/// Edit task fields. Never appends to the timeline and never notifies.
pub async fn update_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
    AppJson(input): AppJson<UpdateTask>,
) -> AppResult<Json<DataResponse<TaskDetail>>> {
    let task = state
        .lifecycle
        .update_task_fields(auth.user_id, task_id, input)
        .await?;
    Ok(Json(DataResponse { data: task }))
}

/// DELETE /api/v1/tasks/{id}
///
/// Delete a task and the notifications that reference it.
pub async fn delete_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.lifecycle.delete_task(task_id).await?;
    tracing::info!(task_id, user_id = auth.user_id, "Task deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/tasks/{id}/updates
///
/// The task's timeline, newest first.
pub async fn list_task_updates(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<TaskUpdateView>>>> {
    let updates = state.lifecycle.timeline(task_id).await?;
    Ok(Json(DataResponse { data: updates }))
}

/// POST /api/v1/tasks/{id}/updates
///
/// Append a status update authored by the caller. Accepts the same JSON or
/// multipart forms as task creation.
pub async fn post_status_update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
    form: TaskForm<CreateStatusUpdate>,
) -> AppResult<(StatusCode, Json<TaskOutcomeResponse>)> {
    let TaskForm { mut input, files } = form;

    if !files.is_empty() {
        state
            .lifecycle
            .validate_status_update(auth.user_id, task_id, &input)
            .await?;
        let uploaded = upload_files(state.blobs.as_ref(), files).await?;
        input.files.merge(uploaded);
    }

    let outcome = state
        .lifecycle
        .post_status_update(auth.user_id, task_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}
