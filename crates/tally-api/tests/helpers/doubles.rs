use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tally_core::models::UploadCredential;
use tally_ocr::{OcrError, ReceiptExtractor};
use tally_storage::{StorageError, StorageResult, UploadSigner};

/// Signs nothing; builds URLs that look like S3 presigned ones.
pub struct FakeSigner {
    configured: bool,
}

impl FakeSigner {
    pub fn new(configured: bool) -> Self {
        Self { configured }
    }

    fn check(&self) -> StorageResult<()> {
        if self.configured {
            Ok(())
        } else {
            Err(StorageError::Config("S3_BUCKET_NAME is not set".to_string()))
        }
    }
}

#[async_trait]
impl UploadSigner for FakeSigner {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &'static str,
        expires_in: Duration,
    ) -> StorageResult<UploadCredential> {
        self.check()?;
        Ok(UploadCredential {
            object_key: key.to_string(),
            upload_url: format!(
                "https://receipts.s3.test/{}?X-Amz-Expires={}&x-id=PutObject",
                key,
                expires_in.as_secs()
            ),
            content_type,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in.as_secs() as i64),
        })
    }

    fn public_url(&self, key: &str) -> StorageResult<String> {
        self.check()?;
        Ok(format!("https://receipts.s3.test/{}", key))
    }
}

/// Answers every extraction with a scripted result and records the image
/// URLs it was asked about.
pub struct ScriptedExtractor {
    answer: Mutex<Result<String, String>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Ok(text.to_string())),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Err(message.to_string())),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn set_answer(&self, text: &str) {
        *self.answer.lock().unwrap() = Ok(text.to_string());
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptExtractor for ScriptedExtractor {
    async fn extract(&self, image_url: &str) -> Result<String, OcrError> {
        self.seen.lock().unwrap().push(image_url.to_string());
        self.answer.lock().unwrap().clone().map_err(OcrError::Transport)
    }
}
