//! Upload signer abstraction

use async_trait::async_trait;
use std::time::Duration;
use tally_core::models::UploadCredential;
use tally_core::AppError;
use thiserror::Error;

/// Storage signing errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Bucket, region or credentials are not configured.
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Config(msg) => AppError::StorageConfig(msg),
            StorageError::Signing(msg) => AppError::Signing(msg),
        }
    }
}

#[async_trait]
pub trait UploadSigner: Send + Sync {
    /// Sign a PUT for `key`, restricted to `content_type`, valid for `expires_in`.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &'static str,
        expires_in: Duration,
    ) -> StorageResult<UploadCredential>;

    /// URL the stored object can be fetched from.
    fn public_url(&self, key: &str) -> StorageResult<String>;
}
