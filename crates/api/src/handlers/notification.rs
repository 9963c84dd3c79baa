//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`] and only ever touch
//! the caller's own notifications.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use taskboard_core::error::CoreError;
use taskboard_core::notification::{Notification, NotificationView};
use taskboard_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked_read: u64,
}

/// GET /api/v1/notifications
///
/// The caller's notifications, newest first, read and unread alike.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PagedResponse<NotificationView>>> {
    let page = state
        .notifications
        .list_for_recipient(auth.user_id, params.to_request())
        .await?;
    Ok(Json(page.into()))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let count = state.notifications.unread_count(auth.user_id).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { count },
    }))
}

/// PATCH /api/v1/notifications/{id}/read
///
/// Mark one notification read. A notification owned by someone else is
/// reported exactly like a missing one.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let notification = state
        .notifications
        .mark_read(auth.user_id, notification_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }))?;
    Ok(Json(DataResponse { data: notification }))
}

/// PATCH /api/v1/notifications/read-all
///
/// Mark every unread notification of the caller read. Idempotent.
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let marked_read = state.notifications.mark_all_read(auth.user_id).await?;
    tracing::debug!(user_id = auth.user_id, marked_read, "Notifications marked read");
    Ok(Json(DataResponse {
        data: MarkedRead { marked_read },
    }))
}
