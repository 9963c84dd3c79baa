//! Blob storage in an S3 bucket.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use taskboard_core::error::CoreError;
use taskboard_core::store::BlobStore;

use crate::key::object_key;
use crate::StorageError;

/// Object prefix inside the bucket.
const KEY_PREFIX: &str = "task-files";

/// Uploads objects with `PutObject` and publishes them under
/// `<public_base_url>/task-files/<key>`.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Build a client from the standard AWS environment (region,
    /// credentials, profile).
    pub async fn from_env(bucket: String, public_base_url: String) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), bucket, public_base_url)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, CoreError> {
        let key = format!("{KEY_PREFIX}/{}", object_key(filename));
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        tracing::debug!(bucket = %self.bucket, key = %key, size, "Stored upload in S3");
        Ok(format!("{}/{key}", self.public_base_url))
    }
}
