//! Test helpers: build the router over in-memory stores and scripted
//! storage/OCR doubles.
//!
//! Run with `cargo test -p tally-api`. No database or network is needed.

#![allow(dead_code)]

pub mod doubles;

use axum_test::TestServer;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tally_api::auth::SessionAuthenticator;
use tally_api::setup::routes::setup_routes;
use tally_api::state::AppState;
use tally_api::ReceiptIngestion;
use tally_core::Config;
use tally_db::mock::InMemoryStore;

use doubles::{FakeSigner, ScriptedExtractor};

pub const GROUP_ID: i64 = 42;
pub const MEMBER_ID: i64 = 7;
pub const OUTSIDER_ID: i64 = 9;
pub const MEMBER_COOKIE: &str = "session_id=member-token";
pub const OUTSIDER_COOKIE: &str = "session_id=outsider-token";
pub const DEFAULT_MENU_IMAGE: &str = "https://images.test/placeholder.webp";

pub const COFFEE_PAYLOAD: &str =
    r#"{"date":"2026-03-14","total":3.5,"items":[{"name":"Coffee","predict_name":"","price":3.5,"quantity":1}]}"#;

pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryStore,
    pub extractor: Arc<ScriptedExtractor>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/tally_test".to_string()),
        "DEFAULT_MENU_IMAGE_URL" => Some(DEFAULT_MENU_IMAGE.to_string()),
        _ => None,
    })
    .expect("test config")
}

/// Group 42 with member 7 and outsider 9, both holding live sessions.
pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.add_user(MEMBER_ID, "Aki");
    store.add_user(OUTSIDER_ID, "Ren");
    store.add_session("member-token", MEMBER_ID, Utc::now());
    store.add_session("outsider-token", OUTSIDER_ID, Utc::now());
    store.add_group(GROUP_ID, "Friday lunch", MEMBER_ID);
    store.add_membership(GROUP_ID, MEMBER_ID);
    store
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(seeded_store(), true, ScriptedExtractor::answering(COFFEE_PAYLOAD))
}

pub fn setup_test_app_with(
    store: InMemoryStore,
    storage_configured: bool,
    extractor: Arc<ScriptedExtractor>,
) -> TestApp {
    let config = test_config();
    let store_arc = Arc::new(store.clone());

    let ingestion = ReceiptIngestion::new(
        store_arc.clone(),
        store_arc.clone(),
        Arc::new(FakeSigner::new(storage_configured)),
        extractor.clone(),
        std::time::Duration::from_secs(config.storage().upload_url_ttl_secs),
    );

    let state = Arc::new(AppState {
        receipts: store_arc.clone(),
        groups: store_arc.clone(),
        health: store_arc.clone(),
        authenticator: SessionAuthenticator::new(store_arc, Duration::days(30)),
        ingestion,
        default_menu_image_url: config.default_menu_image_url().to_string(),
    });

    let router = setup_routes(&config, state).expect("router");
    let server = TestServer::new(router).expect("test server");

    TestApp {
        server,
        store,
        extractor,
    }
}
