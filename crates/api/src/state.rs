use std::sync::Arc;

use taskboard_core::lifecycle::TaskLifecycleService;
use taskboard_core::store::{BlobStore, NotificationStore, TaskStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (JWT secret, limits).
    pub config: Arc<ServerConfig>,
    /// Task mutations and reads, including notification fan-out.
    pub lifecycle: TaskLifecycleService,
    /// Direct task store access for health probes.
    pub tasks: Arc<dyn TaskStore>,
    /// Notification reads and read-state changes by the recipient.
    pub notifications: Arc<dyn NotificationStore>,
    /// Upload target for attachments and voice/video notes.
    pub blobs: Arc<dyn BlobStore>,
}
