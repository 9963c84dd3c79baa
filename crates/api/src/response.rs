//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Use [`DataResponse`]
//! instead of ad-hoc `serde_json::json!({ "data": ... })` to get
//! compile-time type safety and consistent serialization.

use serde::Serialize;
use taskboard_core::fanout::FanOut;
use taskboard_core::lifecycle::TaskOutcome;
use taskboard_core::page::Page;
use taskboard_core::task::TaskDetail;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "data": [...], "total", "page", "page_size" }` for paginated lists.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T: Serialize> From<Page<T>> for PagedResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            data: page.items,
            total: page.total,
            page: page.request.page,
            page_size: page.request.page_size,
        }
    }
}

/// A task mutation that fans out notifications.
///
/// `fan_out` reports the notification side effect. Its failure never changes
/// the status code because the task write has already committed.
#[derive(Debug, Serialize)]
pub struct TaskOutcomeResponse {
    pub data: TaskDetail,
    pub fan_out: FanOut,
}

impl From<TaskOutcome> for TaskOutcomeResponse {
    fn from(outcome: TaskOutcome) -> Self {
        Self {
            data: outcome.task,
            fan_out: outcome.fan_out,
        }
    }
}
