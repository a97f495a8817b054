//! Router construction. The router is built once at startup and handed to
//! the server; nothing registers routes globally.

mod health;

use crate::auth::middleware::session_auth_middleware;
use crate::error::HttpAppError;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tally_core::{AppError, Config};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let request_timeout = Duration::from_secs(config.request_timeout_secs());

    tracing::info!(
        request_timeout_secs = config.request_timeout_secs(),
        max_concurrent_requests = config.max_concurrent_requests(),
        "HTTP limits configured"
    );

    let protected = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        session_auth_middleware,
    ));

    let app = public_routes()
        .merge(protected)
        .with_state(state)
        .merge(
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"),
        )
        .layer(axum::middleware::from_fn_with_state(
            request_timeout,
            request_timeout_middleware,
        ))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::ApiDoc::openapi()) }),
        )
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/issue-signed-receipt",
            post(handlers::receipts::issue_signed_receipt),
        )
        .route(
            "/api/confirm-upload-and-start-ocr",
            post(handlers::receipts::confirm_upload_and_start_ocr),
        )
        .route(
            "/api/receipts/{receipt_id}/items",
            get(handlers::receipts::list_receipt_items),
        )
        .route("/api/create-group", post(handlers::groups::create_group))
        .route("/api/join-group", post(handlers::groups::join_group))
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_origins().iter().any(|o| o == "*") {
        if config.is_production() {
            return Err(anyhow::anyhow!("CORS_ORIGINS cannot be '*' in production"));
        }
        tracing::warn!("CORS configured to allow all origins");
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins()
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Session cookies travel cross-origin only with credentials allowed,
    // which in turn forbids wildcard headers.
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true))
}

/// Dropping the handler future on expiry rolls back any open transaction.
async fn request_timeout_middleware(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path = %path, timeout_secs = timeout.as_secs(), "Request timed out");
            let error = AppError::Transport("Request timed out".to_string());
            let mut response = HttpAppError(error).into_response();
            *response.status_mut() = StatusCode::REQUEST_TIMEOUT;
            response
        }
    }
}
