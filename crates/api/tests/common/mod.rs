#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use taskboard_api::auth::jwt::{generate_access_token, JwtConfig};
use taskboard_api::config::ServerConfig;
use taskboard_api::router::build_app_router;
use taskboard_api::state::AppState;
use taskboard_core::error::CoreError;
use taskboard_core::lifecycle::TaskLifecycleService;
use taskboard_core::memory::MemoryStore;
use taskboard_core::notification::{NewNotification, Notification, NotificationView};
use taskboard_core::page::{Page, PageRequest};
use taskboard_core::store::NotificationStore;
use taskboard_core::types::DbId;
use taskboard_core::user::UserRef;
use taskboard_storage::{LocalBlobStore, StorageConfig};

/// Public path under which the test app serves uploaded files.
pub const UPLOADS_PATH: &str = "/uploads";

const MULTIPART_BOUNDARY: &str = "taskboard-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout, and local blob storage in `upload_dir`.
pub fn test_config(upload_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        storage: StorageConfig::Local {
            dir: upload_dir.path().to_path_buf(),
            public_base_url: UPLOADS_PATH.to_string(),
        },
    }
}

/// A fully wired application over an in-memory store with three users.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub config: ServerConfig,
    pub alice: UserRef,
    pub bob: UserRef,
    pub carol: UserRef,
    /// Keeps the upload directory alive for the duration of the test.
    pub upload_dir: TempDir,
}

impl TestApp {
    /// A router clone for one `oneshot` request.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Bearer token for `user`.
    pub fn token(&self, user: &UserRef) -> String {
        generate_access_token(user.id, &self.config.jwt).unwrap()
    }
}

/// Build the full application router with all middleware layers.
///
/// This goes through the same [`build_app_router`] as `main.rs` so
/// integration tests exercise the production middleware stack.
pub async fn build_test_app() -> TestApp {
    build_app_with(|store| store as Arc<dyn NotificationStore>).await
}

/// Like [`build_test_app`], but every notification insert fails.
pub async fn build_test_app_with_failing_fan_out() -> TestApp {
    build_app_with(|store| Arc::new(FailingNotifications(store)) as Arc<dyn NotificationStore>)
        .await
}

async fn build_app_with(
    notifications: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn NotificationStore>,
) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = test_config(&upload_dir);

    let store = Arc::new(MemoryStore::new());
    let alice = store.add_user("Alice", "alice@example.com").await;
    let bob = store.add_user("Bob", "bob@example.com").await;
    let carol = store.add_user("Carol", "carol@example.com").await;

    let notifications = notifications(store.clone());
    let blobs = Arc::new(
        LocalBlobStore::new(upload_dir.path().to_path_buf(), UPLOADS_PATH.to_string())
            .await
            .unwrap(),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        lifecycle: TaskLifecycleService::new(store.clone(), notifications.clone(), store.clone()),
        tasks: store.clone(),
        notifications,
        blobs,
    };
    let app = build_app_router(state, &config);

    TestApp {
        app,
        store,
        config,
        alice,
        bob,
        carol,
        upload_dir,
    }
}

/// Notification store whose batch insert always fails.
struct FailingNotifications(Arc<MemoryStore>);

#[async_trait]
impl NotificationStore for FailingNotifications {
    async fn insert_many(
        &self,
        _batch: &[NewNotification],
    ) -> Result<Vec<Notification>, CoreError> {
        Err(CoreError::Internal("notification insert failed".into()))
    }

    async fn list_for_recipient(
        &self,
        recipient_id: DbId,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, CoreError> {
        self.0.list_for_recipient(recipient_id, page).await
    }

    async fn unread_count(&self, recipient_id: DbId) -> Result<i64, CoreError> {
        self.0.unread_count(recipient_id).await
    }

    async fn mark_read(
        &self,
        recipient_id: DbId,
        notification_id: DbId,
    ) -> Result<Option<Notification>, CoreError> {
        self.0.mark_read(recipient_id, notification_id).await
    }

    async fn mark_all_read(&self, recipient_id: DbId) -> Result<u64, CoreError> {
        self.0.mark_all_read(recipient_id).await
    }

    async fn delete_for_task(&self, task_id: DbId) -> Result<u64, CoreError> {
        self.0.delete_for_task(task_id).await
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

fn authorized(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// Unauthenticated GET.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = authorized(Method::GET, uri, None)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = authorized(Method::GET, uri, Some(token))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = authorized(method, uri, Some(token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send_json(app, Method::POST, uri, token, body).await
}

pub async fn patch_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send_json(app, Method::PATCH, uri, token, body).await
}

/// PATCH without a body.
pub async fn patch(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = authorized(Method::PATCH, uri, Some(token))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = authorized(Method::DELETE, uri, Some(token))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// One part of a multipart body.
#[derive(Clone)]
pub enum Part<'a> {
    Text {
        name: &'a str,
        value: String,
    },
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// POST a `multipart/form-data` body built from `parts`.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    token: &str,
    parts: &[Part<'_>],
) -> Response<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let request = authorized(Method::POST, uri, Some(token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}
