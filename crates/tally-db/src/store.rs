//! Store traits the HTTP layer and the ingestion workflow depend on.
//!
//! They keep handlers independent of Postgres so tests can swap in the
//! in-memory doubles from the `mock` feature.

use async_trait::async_trait;
use chrono::Duration;
use tally_core::models::{
    Group, NewGroup, NewPurchaseItem, OcrStatus, PurchaseItem, Receipt, SessionUser,
};
use tally_core::AppError;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve `token` to its user when the session was used within `window`,
    /// refreshing its last-used timestamp in the same step.
    async fn touch_active_session(
        &self,
        token: &str,
        window: Duration,
    ) -> Result<Option<SessionUser>, AppError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn get(&self, group_id: i64) -> Result<Option<Group>, AppError>;

    async fn is_member(&self, group_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Create the group and register `owner_id` as its owner atomically.
    async fn create_with_owner(&self, group: NewGroup, owner_id: i64) -> Result<Group, AppError>;

    /// Fails with `Conflict` when the user is already a member.
    async fn add_member(&self, group_id: i64, user_id: i64, is_owner: bool)
        -> Result<(), AppError>;
}

#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Insert a `pending`, not-yet-uploaded receipt inside its own transaction.
    async fn create_pending(
        &self,
        group_id: i64,
        file_key: &str,
        uploaded_by: i64,
    ) -> Result<Receipt, AppError>;

    async fn get(&self, receipt_id: i64) -> Result<Option<Receipt>, AppError>;

    /// Object key of the most recently created receipt in the group.
    async fn latest_object_key_for_group(&self, group_id: i64)
        -> Result<Option<String>, AppError>;

    async fn list_items(&self, receipt_id: i64) -> Result<Vec<PurchaseItem>, AppError>;

    async fn begin(&self) -> Result<Box<dyn ReceiptTransaction>, AppError>;
}

/// Writes of one upload confirmation. Nothing is visible to other callers
/// until `commit`; dropping the transaction discards every write.
#[async_trait]
pub trait ReceiptTransaction: Send {
    /// Set `is_uploaded = true` and lock the receipt row for the rest of the
    /// transaction. Returns the OCR status the receipt holds.
    async fn mark_uploaded(&mut self, receipt_id: i64) -> Result<OcrStatus, AppError>;

    /// Insert all items in one statement. Returns the number of rows written.
    async fn insert_purchase_items(
        &mut self,
        receipt_id: i64,
        group_id: i64,
        items: &[NewPurchaseItem],
    ) -> Result<u64, AppError>;

    async fn set_ocr_status(&mut self, receipt_id: i64, status: OcrStatus)
        -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;
}
