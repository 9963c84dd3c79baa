//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                 -> list_notifications
/// GET    /unread-count     -> unread_count
/// PATCH  /read-all         -> mark_all_read
/// PATCH  /{id}/read        -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/read-all", patch(notification::mark_all_read))
        .route("/{id}/read", patch(notification::mark_read))
}
