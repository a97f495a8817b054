use crate::auth::{session_token_from_headers, AuthenticatedUser};
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tally_core::AppError;

/// Rejects requests without a live session with 401; otherwise attaches
/// [`AuthenticatedUser`] to the request.
pub async fn session_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token_from_headers(request.headers()) else {
        tracing::debug!(path = %request.uri().path(), "Missing session cookie");
        return HttpAppError(AppError::Unauthorized("Unauthorized".to_string())).into_response();
    };

    let user = match state.authenticator.authenticate(&token).await {
        Ok(user) => user,
        Err(e) => return HttpAppError(e).into_response(),
    };

    tracing::debug!(user_id = user.id, "Session authenticated");
    request.extensions_mut().insert(AuthenticatedUser(user));
    next.run(request).await
}
