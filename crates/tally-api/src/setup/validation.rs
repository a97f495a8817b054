//! Startup configuration checks

use anyhow::Result;
use tally_core::Config;

/// Fail fast on configuration that would break every request.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.db_timeout_seconds() == 0 {
        return Err(anyhow::anyhow!("DB_TIMEOUT_SECONDS cannot be 0"));
    }
    if config.max_concurrent_requests() == 0 {
        return Err(anyhow::anyhow!("MAX_CONCURRENT_REQUESTS cannot be 0"));
    }

    Ok(())
}

/// Storage and OCR settings are checked lazily by the operations that use
/// them; at startup they only produce warnings.
pub fn warn_on_missing_integrations(config: &Config) {
    let storage = config.storage();
    let missing_storage: Vec<&str> = [
        ("S3_BUCKET_NAME", storage.bucket.is_none()),
        ("AWS_REGION", storage.region.is_none()),
        ("AWS_ACCESS_KEY_ID", storage.access_key_id.is_none()),
        ("AWS_SECRET_ACCESS_KEY", storage.secret_access_key.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, missing)| missing.then_some(name))
    .collect();

    if !missing_storage.is_empty() {
        tracing::warn!(
            missing = %missing_storage.join(","),
            "Storage is not fully configured; issuing upload URLs will fail"
        );
    }

    if config.ocr().api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; receipts will be confirmed without OCR");
    }

    if config.login_redirect_url().is_none() {
        tracing::warn!("LOGIN_REDIRECT_URL is not set");
    }
}
