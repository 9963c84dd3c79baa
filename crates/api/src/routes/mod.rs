pub mod health;
pub mod notification;
pub mod task;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tasks                              list, create
/// /tasks/{id}                         get, update (PATCH), delete
/// /tasks/{id}/updates                 timeline, post status update
///
/// /notifications                      list
/// /notifications/unread-count         unread count
/// /notifications/read-all             mark all read (PATCH)
/// /notifications/{id}/read            mark one read (PATCH)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tasks", task::router())
        .nest("/notifications", notification::router())
}
