use async_trait::async_trait;
use tally_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    /// Provider credential is not configured.
    #[error("OCR configuration error: {0}")]
    Config(String),

    #[error("OCR transport error: {0}")]
    Transport(String),

    #[error("OCR provider returned no completion choices")]
    EmptyResponse,
}

impl From<OcrError> for AppError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::Config(msg) => AppError::OcrConfig(msg),
            OcrError::Transport(msg) => AppError::Transport(msg),
            OcrError::EmptyResponse => AppError::Transport(err.to_string()),
        }
    }
}

/// Vision-model text extraction for one receipt image. One call, no retries.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    async fn extract(&self, image_url: &str) -> Result<String, OcrError>;
}
