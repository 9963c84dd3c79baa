//! Route definitions for the `/tasks` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::task;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                 -> list_tasks
/// POST   /                 -> create_task
/// GET    /{id}             -> get_task
/// PATCH  /{id}             -> update_task
/// DELETE /{id}             -> delete_task
/// GET    /{id}/updates     -> list_task_updates
/// POST   /{id}/updates     -> post_status_update
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(task::list_tasks).post(task::create_task))
        .route(
            "/{id}",
            get(task::get_task)
                .patch(task::update_task)
                .delete(task::delete_task),
        )
        .route(
            "/{id}/updates",
            get(task::list_task_updates).post(task::post_status_update),
        )
}
