use chrono::{DateTime, Utc};

/// Content type every receipt upload is signed for.
pub const RECEIPT_CONTENT_TYPE: &str = "image/png";

/// A signed, time-limited write URL for one storage object. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCredential {
    pub object_key: String,
    pub upload_url: String,
    pub content_type: &'static str,
    pub expires_at: DateTime<Utc>,
}
