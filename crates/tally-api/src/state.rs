use crate::auth::SessionAuthenticator;
use crate::services::receipt_ingestion::ReceiptIngestion;
use std::sync::Arc;
use tally_db::{GroupStore, HealthProbe, ReceiptStore};

/// Shared application state, built once at startup and handed to the router.
#[derive(Clone)]
pub struct AppState {
    pub receipts: Arc<dyn ReceiptStore>,
    pub groups: Arc<dyn GroupStore>,
    pub health: Arc<dyn HealthProbe>,
    pub authenticator: SessionAuthenticator,
    pub ingestion: ReceiptIngestion,
    /// Used when a group is created without a menu image
    pub default_menu_image_url: String,
}
