//! Blob storage for task attachments, voice notes, and video notes.
//!
//! Uploads are write-once: each file gets a fresh object key and the public
//! URL is returned to the caller, which stores it on the task or update.

pub mod config;
pub mod key;
pub mod local;
pub mod s3;

use std::sync::Arc;

use taskboard_core::error::CoreError;
use taskboard_core::store::BlobStore;

pub use config::StorageConfig;
pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

/// Error type for blob storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        CoreError::Upstream(err.to_string())
    }
}

/// Build the blob store selected by `config`.
pub async fn build_blob_store(
    config: &StorageConfig,
) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config {
        StorageConfig::Local {
            dir,
            public_base_url,
        } => {
            let store = LocalBlobStore::new(dir.clone(), public_base_url.clone()).await?;
            tracing::info!(dir = %dir.display(), "Using local blob storage");
            Ok(Arc::new(store))
        }
        StorageConfig::S3 {
            bucket,
            public_base_url,
        } => {
            let store = S3BlobStore::from_env(bucket.clone(), public_base_url.clone()).await;
            tracing::info!(bucket = %bucket, "Using S3 blob storage");
            Ok(Arc::new(store))
        }
    }
}
