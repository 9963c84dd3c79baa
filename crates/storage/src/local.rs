//! Blob storage on the local filesystem.

use std::path::PathBuf;

use async_trait::async_trait;
use taskboard_core::error::CoreError;
use taskboard_core::store::BlobStore;

use crate::key::object_key;
use crate::StorageError;

/// Writes each upload to `dir/<key>` and publishes it as
/// `<public_base_url>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    /// Create the store, making sure `dir` exists.
    pub async fn new(dir: PathBuf, public_base_url: String) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            public_base_url,
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, CoreError> {
        let key = object_key(filename);
        let size = data.len();
        tokio::fs::write(self.dir.join(&key), data)
            .await
            .map_err(StorageError::from)?;

        tracing::debug!(key = %key, size, content_type, "Stored upload on local disk");
        Ok(format!("{}/{key}", self.public_base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_writes_file_and_returns_public_url() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(tmp.path().join("nested"), "/uploads".into())
            .await
            .unwrap();

        let url = store
            .upload(b"%PDF-1.7".to_vec(), "quote.pdf", "application/pdf")
            .await
            .unwrap();

        let key = url.strip_prefix("/uploads/").unwrap();
        assert!(key.ends_with(".pdf"));
        let written = tokio::fs::read(store.dir().join(key)).await.unwrap();
        assert_eq!(written, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn same_filename_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(tmp.path().to_path_buf(), "/uploads".into())
            .await
            .unwrap();

        let a = store.upload(vec![1], "note.ogg", "audio/ogg").await.unwrap();
        let b = store.upload(vec![2], "note.ogg", "audio/ogg").await.unwrap();
        assert_ne!(a, b);
    }
}
