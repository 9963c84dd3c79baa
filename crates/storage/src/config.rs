//! Storage backend selection from the environment.

use std::path::PathBuf;

use crate::StorageError;

const DEFAULT_LOCAL_DIR: &str = "storage/uploads";
const DEFAULT_PUBLIC_BASE_URL: &str = "/uploads";

/// Which blob backend to use and where its objects are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Files on local disk, served by the API under `public_base_url`.
    Local {
        dir: PathBuf,
        public_base_url: String,
    },
    /// Objects in an S3 bucket. Credentials and region come from the
    /// standard AWS environment.
    S3 {
        bucket: String,
        public_base_url: String,
    },
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                  | Default           |
    /// |---------------------------|-------------------|
    /// | `STORAGE_BACKEND`         | `local`           |
    /// | `STORAGE_LOCAL_DIR`       | `storage/uploads` |
    /// | `STORAGE_PUBLIC_BASE_URL` | `/uploads`        |
    /// | `S3_BUCKET`               | required for `s3` |
    /// | `S3_PUBLIC_BASE_URL`      | `https://<bucket>.s3.amazonaws.com` |
    pub fn from_env() -> Result<Self, StorageError> {
        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        Self::from_parts(
            &backend,
            std::env::var("STORAGE_LOCAL_DIR").ok(),
            std::env::var("STORAGE_PUBLIC_BASE_URL").ok(),
            std::env::var("S3_BUCKET").ok(),
            std::env::var("S3_PUBLIC_BASE_URL").ok(),
        )
    }

    fn from_parts(
        backend: &str,
        local_dir: Option<String>,
        local_base_url: Option<String>,
        bucket: Option<String>,
        s3_base_url: Option<String>,
    ) -> Result<Self, StorageError> {
        match backend {
            "local" => Ok(Self::Local {
                dir: PathBuf::from(local_dir.unwrap_or_else(|| DEFAULT_LOCAL_DIR.into())),
                public_base_url: trim_base(
                    local_base_url.unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.into()),
                ),
            }),
            "s3" => {
                let bucket = bucket
                    .filter(|b| !b.trim().is_empty())
                    .ok_or_else(|| StorageError::Config("S3_BUCKET must be set".into()))?;
                let public_base_url = trim_base(
                    s3_base_url.unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com")),
                );
                Ok(Self::S3 {
                    bucket,
                    public_base_url,
                })
            }
            other => Err(StorageError::Config(format!(
                "Unknown STORAGE_BACKEND '{other}'. Must be one of: local, s3"
            ))),
        }
    }

    /// URL prefix under which stored objects are published.
    pub fn public_base_url(&self) -> &str {
        match self {
            Self::Local {
                public_base_url, ..
            }
            | Self::S3 {
                public_base_url, ..
            } => public_base_url,
        }
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
