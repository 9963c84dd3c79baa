//! Shared query parameter types for API handlers.

use serde::Deserialize;
use taskboard_core::page::PageRequest;
use taskboard_core::task::{TaskFilter, TaskPriority, TaskScope, TaskStatus};

/// Page-number pagination (`?page=&page_size=`). Values are clamped by
/// [`PageRequest::new`].
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PaginationParams {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

/// Query parameters for `GET /tasks`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub scope: Option<TaskScope>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<TaskListParams> for TaskFilter {
    fn from(params: TaskListParams) -> Self {
        TaskFilter {
            scope: params.scope.unwrap_or_default(),
            status: params.status,
            priority: params.priority,
            page: PageRequest::new(params.page, params.page_size),
        }
    }
}
