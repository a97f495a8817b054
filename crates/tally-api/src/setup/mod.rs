//! Application setup: configuration checks, telemetry, database, the
//! storage and OCR clients, and the router.

pub mod database;
pub mod routes;
pub mod server;
pub mod validation;

use crate::auth::SessionAuthenticator;
use crate::services::receipt_ingestion::ReceiptIngestion;
use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tally_core::Config;
use tally_db::{GroupRepository, PoolHealth, ReceiptRepository, SessionRepository};
use tally_ocr::OpenAiReceiptExtractor;
use tally_storage::S3UploadSigner;

/// Build the state and router from configuration.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    validation::validate_config(&config).context("Configuration validation failed")?;

    let json_logs = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    crate::telemetry::init_telemetry(json_logs)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(environment = %config.environment(), "Configuration loaded and validated");
    validation::warn_on_missing_integrations(&config);

    let pool = database::setup_database(&config).await?;

    let receipts = Arc::new(ReceiptRepository::new(pool.clone()));
    let groups = Arc::new(GroupRepository::new(pool.clone()));
    let sessions = Arc::new(SessionRepository::new(pool.clone()));

    let ingestion = ReceiptIngestion::new(
        receipts.clone(),
        groups.clone(),
        Arc::new(S3UploadSigner::new(config.storage().clone())),
        Arc::new(OpenAiReceiptExtractor::new(config.ocr().clone())),
        Duration::from_secs(config.storage().upload_url_ttl_secs),
    );

    let state = Arc::new(AppState {
        receipts,
        groups,
        health: Arc::new(PoolHealth::new(pool)),
        authenticator: SessionAuthenticator::new(sessions, config.session_inactivity()),
        ingestion,
        default_menu_image_url: config.default_menu_image_url().to_string(),
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
