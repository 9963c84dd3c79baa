//! Request body extractors.
//!
//! - [`AppJson`] -- `axum::Json` whose rejection renders as a validation error.
//! - [`TaskForm`] -- a task payload sent either as JSON or as multipart form
//!   data carrying a `payload` JSON field plus file parts.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use taskboard_core::error::CoreError;
use taskboard_core::store::BlobStore;
use taskboard_core::task::FileRefs;

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor with [`AppError`] as its rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/* --------------------------------------------------------------------------
Multipart task payloads
-------------------------------------------------------------------------- */

/// Multipart field holding the JSON-encoded payload.
const PAYLOAD_FIELD: &str = "payload";

/// Which file reference an uploaded part fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSlot {
    Attachment,
    VoiceNote,
    VideoNote,
}

impl FileSlot {
    fn from_field(name: &str) -> Option<Self> {
        match name {
            "attachments" => Some(Self::Attachment),
            "voice_note" => Some(Self::VoiceNote),
            "video_note" => Some(Self::VideoNote),
            _ => None,
        }
    }
}

/// A file part read into memory, not yet uploaded.
#[derive(Debug)]
pub struct PendingFile {
    pub slot: FileSlot,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A task payload and the files that came with it.
///
/// Files are only buffered here. Handlers validate the payload first and
/// then call [`upload_files`], so a rejected request stores nothing.
#[derive(Debug)]
pub struct TaskForm<T> {
    pub input: T,
    pub files: Vec<PendingFile>,
}

impl<T> FromRequest<AppState> for TaskForm<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let AppJson(input) = AppJson::<T>::from_request(req, state).await?;
            return Ok(Self {
                input,
                files: Vec::new(),
            });
        }

        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        read_multipart(multipart).await
    }
}

async fn read_multipart<T: DeserializeOwned>(
    mut multipart: Multipart,
) -> Result<TaskForm<T>, AppError> {
    let mut payload: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name == PAYLOAD_FIELD {
            payload = Some(field.text().await?);
            continue;
        }
        let Some(slot) = FileSlot::from_field(&name) else {
            continue; // ignore unknown fields
        };

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await?;
        // Browsers submit empty file inputs as zero-length parts.
        if data.is_empty() {
            continue;
        }

        if slot != FileSlot::Attachment && files.iter().any(|f: &PendingFile| f.slot == slot) {
            return Err(AppError::BadRequest(format!(
                "Field '{name}' may only be sent once"
            )));
        }
        files.push(PendingFile {
            slot,
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    let input = serde_json::from_str(payload.as_deref().unwrap_or("{}")).map_err(|e| {
        AppError::Core(CoreError::Validation(format!("Invalid '{PAYLOAD_FIELD}' field: {e}")))
    })?;

    Ok(TaskForm { input, files })
}

/// Upload all pending files concurrently and collect their URLs.
///
/// Attachments keep their submission order.
pub async fn upload_files(
    blobs: &dyn BlobStore,
    files: Vec<PendingFile>,
) -> Result<FileRefs, AppError> {
    if files.is_empty() {
        return Ok(FileRefs::default());
    }

    let count = files.len();
    let uploads = files.into_iter().map(|file| async move {
        let url = blobs
            .upload(file.data, &file.filename, &file.content_type)
            .await?;
        Ok::<_, CoreError>((file.slot, url))
    });
    let uploaded = try_join_all(uploads).await?;
    tracing::debug!(count, "Uploaded task files");

    let mut refs = FileRefs::default();
    for (slot, url) in uploaded {
        match slot {
            FileSlot::Attachment => refs.attachments.push(url),
            FileSlot::VoiceNote => refs.voice_note = Some(url),
            FileSlot::VideoNote => refs.video_note = Some(url),
        }
    }
    Ok(refs)
}
