use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One extracted line item, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseItem {
    pub id: i64,
    pub receipt_id: i64,
    pub group_id: i64,
    pub item_name: String,
    /// Normalized name; empty when the printed name is unambiguous.
    pub predict_item_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// An item ready to be inserted. Built from a parsed OCR payload, so
/// `price >= 0` and `quantity >= 1` already hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchaseItem {
    pub item_name: String,
    pub predict_item_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseItemResponse {
    pub id: i64,
    pub name: String,
    pub predict_name: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub quantity: i32,
}

impl From<PurchaseItem> for PurchaseItemResponse {
    fn from(item: PurchaseItem) -> Self {
        Self {
            id: item.id,
            name: item.item_name,
            predict_name: item.predict_item_name,
            price: item.price,
            quantity: item.quantity,
        }
    }
}
