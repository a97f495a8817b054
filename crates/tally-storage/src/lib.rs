//! Upload credentials for receipt photos.
//!
//! Clients upload receipt images straight to object storage with a signed,
//! time-limited PUT URL. This crate generates the object keys, signs the
//! URLs and resolves the public URL the OCR provider reads from.
//!
//! # Object key format
//!
//! `{group_id}/{uuid}.png`. Uniqueness comes from the random v4 UUID.

pub mod keys;
pub mod s3;
pub mod traits;

pub use keys::receipt_object_key;
pub use s3::S3UploadSigner;
pub use traits::{StorageError, StorageResult, UploadSigner};
