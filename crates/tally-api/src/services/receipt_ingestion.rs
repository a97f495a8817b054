//! Receipt ingestion: upload credential issuance and upload confirmation.
//!
//! Confirmation is a small state machine over one database transaction:
//!
//! 1. load the receipt (`NotFound`) and check group membership (`Forbidden`)
//!    before anything is written;
//! 2. set `is_uploaded`, which also row-locks the receipt;
//! 3. run OCR enrichment. Every enrichment failure is reported as
//!    [`EnrichmentOutcome::Skipped`] and leaves `ocr_status` untouched;
//! 4. on a parsed payload, insert all items and set `ocr_status = completed`;
//! 5. commit.
//!
//! Errors in steps 1, 2 and the item writes of step 4 roll the whole
//! transaction back, so an upload is never marked confirmed with a partial
//! item list.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tally_core::models::{OcrStatus, Receipt, SessionUser, RECEIPT_CONTENT_TYPE};
use tally_core::AppError;
use tally_db::{GroupStore, ReceiptStore, ReceiptTransaction};
use tally_ocr::{parse_receipt_payload, ReceiptExtractor};
use tally_storage::{receipt_object_key, UploadSigner};

/// A freshly created pending receipt and the URL to upload its image to.
#[derive(Debug, Clone)]
pub struct IssuedUpload {
    pub receipt_id: i64,
    pub object_key: String,
    pub upload_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Why enrichment did not persist any items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The group has no receipt object to read.
    NoObjectKey,
    /// Items were already extracted by an earlier confirmation.
    AlreadyCompleted,
    /// No public URL could be built for the object.
    ImageUrl(String),
    /// The OCR provider call failed.
    Extraction(String),
    /// The provider answered with text that is not a receipt payload.
    UnparseablePayload(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoObjectKey => f.write_str("no object key for group"),
            SkipReason::AlreadyCompleted => f.write_str("OCR already completed"),
            SkipReason::ImageUrl(e) => write!(f, "image URL unavailable: {}", e),
            SkipReason::Extraction(e) => write!(f, "extraction failed: {}", e),
            SkipReason::UnparseablePayload(e) => write!(f, "unparseable payload: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Completed { items: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    pub receipt_id: i64,
    pub enrichment: EnrichmentOutcome,
}

#[derive(Clone)]
pub struct ReceiptIngestion {
    receipts: Arc<dyn ReceiptStore>,
    groups: Arc<dyn GroupStore>,
    signer: Arc<dyn UploadSigner>,
    extractor: Arc<dyn ReceiptExtractor>,
    upload_ttl: Duration,
}

impl ReceiptIngestion {
    pub fn new(
        receipts: Arc<dyn ReceiptStore>,
        groups: Arc<dyn GroupStore>,
        signer: Arc<dyn UploadSigner>,
        extractor: Arc<dyn ReceiptExtractor>,
        upload_ttl: Duration,
    ) -> Self {
        Self {
            receipts,
            groups,
            signer,
            extractor,
            upload_ttl,
        }
    }

    /// Sign an upload URL for a new object under the group and record a
    /// pending receipt for it. Membership is not checked here; it is
    /// enforced at confirmation.
    #[tracing::instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn issue_upload_credential(
        &self,
        user: &SessionUser,
        group_id: i64,
    ) -> Result<IssuedUpload, AppError> {
        let object_key = receipt_object_key(group_id);

        let credential = self
            .signer
            .presign_put(&object_key, RECEIPT_CONTENT_TYPE, self.upload_ttl)
            .await?;

        let receipt = self
            .receipts
            .create_pending(group_id, &credential.object_key, user.id)
            .await?;

        tracing::info!(
            receipt_id = receipt.id,
            file_key = %receipt.file_key,
            expires_at = %credential.expires_at,
            "Issued receipt upload URL"
        );

        Ok(IssuedUpload {
            receipt_id: receipt.id,
            object_key: credential.object_key,
            upload_url: credential.upload_url,
            expires_at: credential.expires_at,
        })
    }

    /// Mark the receipt uploaded and try to extract its items.
    ///
    /// Succeeds whenever the upload flag was committed, whatever the
    /// enrichment outcome.
    #[tracing::instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn confirm_upload(
        &self,
        user: &SessionUser,
        receipt_id: i64,
    ) -> Result<ConfirmationOutcome, AppError> {
        let receipt = self
            .receipts
            .get(receipt_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))?;

        if !self.groups.is_member(receipt.group_id, user.id).await? {
            return Err(AppError::Forbidden(
                "You are not a member of this group".to_string(),
            ));
        }

        let mut tx = self.receipts.begin().await?;

        let status = match tx.mark_uploaded(receipt.id).await {
            Ok(status) => status,
            Err(e) => {
                abort(tx, receipt.id).await;
                return Err(e);
            }
        };

        let enrichment = match self.enrich(tx.as_mut(), &receipt, status).await {
            Ok(outcome) => outcome,
            Err(e) => {
                abort(tx, receipt.id).await;
                return Err(e);
            }
        };

        tx.commit().await?;

        match enrichment {
            EnrichmentOutcome::Completed { items } => {
                tracing::info!(receipt_id = receipt.id, items, "Receipt upload confirmed, OCR completed");
            }
            EnrichmentOutcome::Skipped(ref reason) => {
                tracing::warn!(receipt_id = receipt.id, reason = %reason, "Receipt upload confirmed, OCR skipped");
            }
        }

        Ok(ConfirmationOutcome {
            receipt_id: receipt.id,
            enrichment,
        })
    }

    async fn enrich(
        &self,
        tx: &mut dyn ReceiptTransaction,
        receipt: &Receipt,
        status: OcrStatus,
    ) -> Result<EnrichmentOutcome, AppError> {
        if !status.can_advance_to(OcrStatus::Completed) {
            return Ok(EnrichmentOutcome::Skipped(SkipReason::AlreadyCompleted));
        }

        // OCR reads the group's newest object, which is not necessarily the
        // receipt being confirmed.
        let Some(object_key) = self
            .receipts
            .latest_object_key_for_group(receipt.group_id)
            .await?
        else {
            return Ok(EnrichmentOutcome::Skipped(SkipReason::NoObjectKey));
        };
        if object_key != receipt.file_key {
            tracing::warn!(
                receipt_id = receipt.id,
                receipt_key = %receipt.file_key,
                ocr_key = %object_key,
                "OCR key differs from the confirmed receipt's key"
            );
        }

        let image_url = match self.signer.public_url(&object_key) {
            Ok(url) => url,
            Err(e) => return Ok(EnrichmentOutcome::Skipped(SkipReason::ImageUrl(e.to_string()))),
        };

        let text = match self.extractor.extract(&image_url).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(receipt_id = receipt.id, error = %e, "OCR extraction failed");
                return Ok(EnrichmentOutcome::Skipped(SkipReason::Extraction(e.to_string())));
            }
        };

        let parsed = match parse_receipt_payload(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(receipt_id = receipt.id, error = %e, "OCR payload rejected");
                return Ok(EnrichmentOutcome::Skipped(SkipReason::UnparseablePayload(
                    e.to_string(),
                )));
            }
        };

        tracing::debug!(
            receipt_id = receipt.id,
            date = ?parsed.date,
            total = ?parsed.total,
            items = parsed.items.len(),
            "Parsed OCR payload"
        );

        let written = tx
            .insert_purchase_items(receipt.id, receipt.group_id, &parsed.items)
            .await?;
        tx.set_ocr_status(receipt.id, OcrStatus::Completed).await?;

        Ok(EnrichmentOutcome::Completed {
            items: written as usize,
        })
    }
}

async fn abort(tx: Box<dyn ReceiptTransaction>, receipt_id: i64) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(receipt_id, error = %e, "Failed to roll back confirmation");
    }
}
