//! Core types shared by every tally crate: configuration, the error taxonomy
//! and the receipt/group domain models.

pub mod config;
pub mod error;
pub mod models;

pub use config::{Config, OcrSettings, StorageSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
