//! Receipt OCR
//!
//! [`ReceiptExtractor`] turns an image URL into the raw text a vision model
//! returned; [`payload::parse_receipt_payload`] turns that text into items
//! ready to persist. The two steps fail independently so callers can tell a
//! provider failure from an unusable answer.

pub mod extractor;
pub mod openai;
pub mod payload;
pub mod prompt;

pub use extractor::{OcrError, ReceiptExtractor};
pub use openai::OpenAiReceiptExtractor;
pub use payload::{parse_receipt_payload, ParsedReceipt, PayloadError};
