use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PurchaseItemResponse;

/// OCR status as persisted in `receipts.ocr_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OcrStatus {
    Pending,
    Uploaded,
    Completed,
    Failed,
}

impl OcrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrStatus::Pending => "pending",
            OcrStatus::Uploaded => "uploaded",
            OcrStatus::Completed => "completed",
            OcrStatus::Failed => "failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            OcrStatus::Pending => 0,
            OcrStatus::Uploaded => 1,
            OcrStatus::Failed => 2,
            OcrStatus::Completed => 3,
        }
    }

    /// Status only ever moves forward; `completed` is terminal.
    pub fn can_advance_to(&self, next: OcrStatus) -> bool {
        *self != OcrStatus::Completed && next.rank() > self.rank()
    }
}

impl fmt::Display for OcrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OcrStatus::Pending),
            "uploaded" => Ok(OcrStatus::Uploaded),
            "completed" => Ok(OcrStatus::Completed),
            "failed" => Ok(OcrStatus::Failed),
            other => Err(format!("unknown OCR status: {}", other)),
        }
    }
}

/// Where a receipt sits in its ingestion lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptLifecycle {
    Pending,
    Uploaded,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub id: i64,
    pub group_id: i64,
    pub file_key: String,
    pub ocr_status: OcrStatus,
    pub is_uploaded: bool,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receipt {
    pub fn lifecycle(&self) -> ReceiptLifecycle {
        match (self.is_uploaded, self.ocr_status) {
            (_, OcrStatus::Completed) => ReceiptLifecycle::Completed,
            (true, _) => ReceiptLifecycle::Uploaded,
            (false, _) => ReceiptLifecycle::Pending,
        }
    }
}

/// Request body for issuing a signed receipt upload URL
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueReceiptRequest {
    /// Group id as a decimal string
    #[serde(default)]
    pub group_id: String,
}

impl IssueReceiptRequest {
    /// Parses `group_id` into a positive integer id.
    pub fn parsed_group_id(&self) -> Result<i64, String> {
        let raw = self.group_id.trim();
        if raw.is_empty() {
            return Err("group_id is required".to_string());
        }
        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err("Invalid group_id".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueReceiptResponse {
    /// Signed PUT URL, valid for 15 minutes, for an `image/png` body
    pub upload_url: String,
    pub file_key: String,
    pub receipt_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmUploadRequest {
    pub receipt_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmUploadResponse {
    pub message: String,
    pub receipt_id: i64,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptItemsResponse {
    pub receipt_id: i64,
    pub ocr_status: OcrStatus,
    pub is_uploaded: bool,
    pub lifecycle: ReceiptLifecycle,
    pub items: Vec<PurchaseItemResponse>,
}
