/// Instruction sent with every receipt image.
pub const RECEIPT_EXTRACTION_PROMPT: &str = r#"You read photographed shop receipts.
Return only a JSON object, with no surrounding text or code fences, in this shape:
{"date": "YYYY-MM-DD or null", "total": number or null, "items": [{"name": string, "predict_name": string, "price": number, "quantity": integer}]}
Rules:
- "name" is the item name exactly as printed.
- "predict_name" is the full product name when the printed name is truncated or abbreviated; otherwise an empty string.
- "price" is the unit price as a number without currency symbols.
- "quantity" defaults to 1 when the receipt does not state it.
- Skip subtotal, tax, discount and payment lines."#;
