use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tally_core::models::{NewPurchaseItem, OcrStatus, PurchaseItem, Receipt};
use tally_core::AppError;

use super::transaction::TransactionGuard;
use crate::store::{ReceiptStore, ReceiptTransaction};

const RECEIPT_COLUMNS: &str =
    "id, group_id, file_key, ocr_status, is_uploaded, uploaded_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReceiptRow {
    id: i64,
    group_id: i64,
    file_key: String,
    ocr_status: String,
    is_uploaded: bool,
    uploaded_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReceiptRow> for Receipt {
    type Error = AppError;

    fn try_from(row: ReceiptRow) -> Result<Self, Self::Error> {
        Ok(Receipt {
            id: row.id,
            group_id: row.group_id,
            file_key: row.file_key,
            ocr_status: parse_status(&row.ocr_status)?,
            is_uploaded: row.is_uploaded,
            uploaded_by: row.uploaded_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_status(raw: &str) -> Result<OcrStatus, AppError> {
    raw.parse::<OcrStatus>().map_err(AppError::Internal)
}

/// Repository for receipts and their purchase items
#[derive(Clone)]
pub struct ReceiptRepository {
    pool: PgPool,
}

impl ReceiptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReceiptStore for ReceiptRepository {
    async fn create_pending(
        &self,
        group_id: i64,
        file_key: &str,
        uploaded_by: i64,
    ) -> Result<Receipt, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool, "create_receipt").await?;

        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            r#"
            INSERT INTO receipts (group_id, file_key, ocr_status, is_uploaded, uploaded_by, created_at, updated_at)
            VALUES ($1, $2, 'pending', FALSE, $3, NOW(), NOW())
            RETURNING {}
            "#,
            RECEIPT_COLUMNS
        ))
        .bind(group_id)
        .bind(file_key)
        .bind(uploaded_by)
        .fetch_one(tx.connection()?)
        .await;

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tx.rollback().await?;
                let err = AppError::from(e);
                if err.is_foreign_key_violation() {
                    return Err(AppError::NotFound("Group not found".to_string()));
                }
                return Err(err);
            }
        };

        tx.commit().await?;
        row.try_into()
    }

    async fn get(&self, receipt_id: i64) -> Result<Option<Receipt>, AppError> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {} FROM receipts WHERE id = $1",
            RECEIPT_COLUMNS
        ))
        .bind(receipt_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Receipt::try_from).transpose()
    }

    async fn latest_object_key_for_group(
        &self,
        group_id: i64,
    ) -> Result<Option<String>, AppError> {
        let key = sqlx::query_scalar::<_, String>(
            r#"
            SELECT file_key
            FROM receipts
            WHERE group_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn list_items(&self, receipt_id: i64) -> Result<Vec<PurchaseItem>, AppError> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT id, receipt_id, group_id, item_name, predict_item_name, price, quantity, created_at
            FROM purchase_items
            WHERE receipt_id = $1
            ORDER BY id
            "#,
        )
        .bind(receipt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn begin(&self) -> Result<Box<dyn ReceiptTransaction>, AppError> {
        let guard = TransactionGuard::begin(&self.pool, "confirm_upload").await?;
        Ok(Box::new(PgReceiptTransaction { guard }))
    }
}

/// Postgres-backed confirmation transaction
pub struct PgReceiptTransaction {
    guard: TransactionGuard,
}

#[async_trait]
impl ReceiptTransaction for PgReceiptTransaction {
    async fn mark_uploaded(&mut self, receipt_id: i64) -> Result<OcrStatus, AppError> {
        // The UPDATE takes the row lock, so a concurrent confirmation of the
        // same receipt waits here until this transaction finishes.
        let status = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE receipts
            SET is_uploaded = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING ocr_status
            "#,
        )
        .bind(receipt_id)
        .fetch_optional(self.guard.connection()?)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))?;

        parse_status(&status)
    }

    async fn insert_purchase_items(
        &mut self,
        receipt_id: i64,
        group_id: i64,
        items: &[NewPurchaseItem],
    ) -> Result<u64, AppError> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO purchase_items (receipt_id, group_id, item_name, predict_item_name, price, quantity) ",
        );
        builder.push_values(items, |mut row, item| {
            row.push_bind(receipt_id)
                .push_bind(group_id)
                .push_bind(&item.item_name)
                .push_bind(&item.predict_item_name)
                .push_bind(item.price)
                .push_bind(item.quantity);
        });

        let result = builder.build().execute(self.guard.connection()?).await?;
        Ok(result.rows_affected())
    }

    async fn set_ocr_status(&mut self, receipt_id: i64, status: OcrStatus) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE receipts
            SET ocr_status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(receipt_id)
        .bind(status.as_str())
        .execute(self.guard.connection()?)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.guard.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.guard.rollback().await
    }
}
