//! Tally HTTP API
//!
//! Session-authenticated endpoints for issuing receipt upload URLs,
//! confirming uploads (which runs OCR enrichment) and managing groups.

mod api_doc;
mod handlers;
mod telemetry;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use services::receipt_ingestion::{
    ConfirmationOutcome, EnrichmentOutcome, IssuedUpload, ReceiptIngestion, SkipReason,
};
