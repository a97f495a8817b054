//! Parsing of the JSON text a vision model returns for a receipt.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tally_core::models::NewPurchaseItem;
use tally_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("OCR payload is not valid receipt JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("OCR payload item {index} is invalid: {reason}")]
    InvalidItem { index: usize, reason: String },
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Largest price `purchase_items.price NUMERIC(12, 2)` can hold.
const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

#[derive(Debug, Deserialize)]
struct RawReceipt {
    #[serde(default)]
    date: Option<Value>,
    #[serde(default)]
    total: Option<Value>,
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    name: String,
    #[serde(default)]
    predict_name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    quantity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReceipt {
    /// Receipt date as printed, when the model reported one
    pub date: Option<String>,
    pub total: Option<Decimal>,
    pub items: Vec<NewPurchaseItem>,
}

/// Models often wrap JSON in a markdown fence despite being told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim()
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() || s.eq_ignore_ascii_case("null") => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn scalar_to_decimal(value: Value) -> Option<Decimal> {
    let decimal = match value {
        Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        Value::String(s) => s.trim().replace(',', "").parse::<Decimal>().ok(),
        _ => None,
    };
    decimal.map(|d| d.round_dp(2))
}

/// Postgres TEXT cannot store NUL.
fn clean_text(raw: &str) -> String {
    raw.replace('\0', "").trim().to_string()
}

fn convert_item(index: usize, raw: RawItem) -> Result<NewPurchaseItem, PayloadError> {
    let price = raw.price.unwrap_or(0.0);
    if !price.is_finite() || price < 0.0 {
        return Err(PayloadError::InvalidItem {
            index,
            reason: format!("price must be a non-negative number, got {}", price),
        });
    }
    let price = Decimal::from_f64(price)
        .ok_or_else(|| PayloadError::InvalidItem {
            index,
            reason: format!("price {} is out of range", price),
        })?
        .round_dp(2);
    if price > MAX_PRICE {
        return Err(PayloadError::InvalidItem {
            index,
            reason: format!("price {} exceeds {}", price, MAX_PRICE),
        });
    }

    let quantity = match raw.quantity {
        Some(q) if q.is_finite() && q >= 1.0 => q.trunc().min(i32::MAX as f64) as i32,
        _ => 1,
    };

    Ok(NewPurchaseItem {
        item_name: clean_text(&raw.name),
        predict_item_name: raw.predict_name.as_deref().map(clean_text).unwrap_or_default(),
        price,
        quantity,
    })
}

/// Parse OCR output into items ready to insert.
///
/// `items` is required. Missing `predict_name` becomes empty, a missing or
/// non-positive `quantity` becomes 1, NUL characters are dropped from names,
/// and a price that is negative or too large for the items table rejects the
/// whole payload.
pub fn parse_receipt_payload(text: &str) -> Result<ParsedReceipt, PayloadError> {
    let raw: RawReceipt = serde_json::from_str(strip_code_fence(text))?;

    let items = raw
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| convert_item(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedReceipt {
        date: raw.date.and_then(scalar_to_string),
        total: raw.total.and_then(scalar_to_decimal),
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ErrorMetadata;

    #[test]
    fn test_minimal_item_gets_defaults() {
        let parsed =
            parse_receipt_payload(r#"{"items":[{"name":"Coffee","price":3.5,"quantity":1}]}"#)
                .unwrap();
        assert_eq!(parsed.items.len(), 1);
        let item = &parsed.items[0];
        assert_eq!(item.item_name, "Coffee");
        assert_eq!(item.predict_item_name, "");
        assert_eq!(item.price, Decimal::new(350, 2));
        assert_eq!(item.quantity, 1);
        assert!(parsed.date.is_none());
        assert!(parsed.total.is_none());
    }

    #[test]
    fn test_full_payload() {
        let text = r#"{
            "date": "2026-03-14",
            "total": 1280,
            "items": [
                {"name": "ｵｰｶﾞﾆｯｸﾐﾙｸ", "predict_name": "オーガニックミルク", "price": 298, "quantity": 2},
                {"name": "Bread", "predict_name": "", "price": 684}
            ]
        }"#;
        let parsed = parse_receipt_payload(text).unwrap();
        assert_eq!(parsed.date.as_deref(), Some("2026-03-14"));
        assert_eq!(parsed.total, Some(Decimal::new(1280, 0)));
        assert_eq!(parsed.items[0].predict_item_name, "オーガニックミルク");
        assert_eq!(parsed.items[0].quantity, 2);
        assert_eq!(parsed.items[1].quantity, 1);
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let text = "```json\n{\"items\":[{\"name\":\"Tea\",\"price\":2}]}\n```";
        let parsed = parse_receipt_payload(text).unwrap();
        assert_eq!(parsed.items[0].item_name, "Tea");
    }

    #[test]
    fn test_zero_or_missing_quantity_defaults_to_one() {
        let parsed = parse_receipt_payload(
            r#"{"items":[{"name":"A","price":1,"quantity":0},{"name":"B","price":1,"quantity":-2}]}"#,
        )
        .unwrap();
        assert!(parsed.items.iter().all(|i| i.quantity == 1));
    }

    #[test]
    fn test_negative_price_rejects_payload() {
        let err = parse_receipt_payload(r#"{"items":[{"name":"Refund","price":-1.0}]}"#)
            .unwrap_err();
        assert!(matches!(err, PayloadError::InvalidItem { index: 0, .. }));
    }

    #[test]
    fn test_price_beyond_column_range_rejects_payload() {
        assert_eq!(MAX_PRICE, Decimal::new(999_999_999_999, 2));

        let err = parse_receipt_payload(
            r#"{"items":[{"name":"Tea","price":1},{"name":"Coffee","price":123456789012.5}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PayloadError::InvalidItem { index: 1, .. }));

        let parsed =
            parse_receipt_payload(r#"{"items":[{"name":"Boat","price":9999999999.99}]}"#).unwrap();
        assert_eq!(parsed.items[0].price, MAX_PRICE);
    }

    #[test]
    fn test_nul_characters_are_dropped_from_names() {
        let parsed = parse_receipt_payload(
            r#"{"items":[{"name":"Coffee\u0000","predict_name":"Ho\u0000t coffee","price":3}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.items[0].item_name, "Coffee");
        assert_eq!(parsed.items[0].predict_item_name, "Hot coffee");
    }

    #[test]
    fn test_payload_error_maps_to_invalid_input() {
        let err: AppError = parse_receipt_payload("not json").unwrap_err().into();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_missing_items_is_malformed() {
        assert!(matches!(
            parse_receipt_payload(r#"{"date":"2026-03-14"}"#),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_prose_is_malformed() {
        assert!(matches!(
            parse_receipt_payload("Sorry, I cannot read this receipt."),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_item_list_is_valid() {
        let parsed = parse_receipt_payload(r#"{"items":[]}"#).unwrap();
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_string_total_is_parsed() {
        let parsed = parse_receipt_payload(r#"{"total":"1,280","items":[]}"#).unwrap();
        assert_eq!(parsed.total, Some(Decimal::new(1280, 0)));
    }
}
