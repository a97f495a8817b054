use crate::auth::AuthenticatedUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tally_core::models::{
    CreateGroupRequest, CreateGroupResponse, JoinGroupRequest, JoinGroupResponse, NewGroup,
};
use tally_core::AppError;
use validator::Validate;

/// Create a group owned by the caller
#[utoipa::path(
    post,
    path = "/api/create-group",
    tag = "groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = CreateGroupResponse),
        (status = 400, description = "Missing name or menu", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, user, request), fields(user_id = user.0.id))]
pub async fn create_group(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let menu_image_url = request
        .menu_image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| state.default_menu_image_url.clone());

    let group = state
        .groups
        .create_with_owner(
            NewGroup {
                name: request.name.trim().to_string(),
                menu: request.menu.trim().to_string(),
                menu_image_url,
            },
            user.0.id,
        )
        .await?;

    tracing::info!(group_id = group.id, "Group created");

    Ok((StatusCode::CREATED, Json(CreateGroupResponse::from(group))))
}

/// Join an existing group
#[utoipa::path(
    post,
    path = "/api/join-group",
    tag = "groups",
    request_body = JoinGroupRequest,
    responses(
        (status = 200, description = "Joined the group", body = JoinGroupResponse),
        (status = 400, description = "Invalid group_id", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, user, request), fields(user_id = user.0.id, group_id = request.group_id))]
pub async fn join_group(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<JoinGroupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request.group_id <= 0 {
        return Err(AppError::InvalidInput("Invalid group_id".to_string()).into());
    }

    let group = state
        .groups
        .get(request.group_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    state.groups.add_member(group.id, user.0.id, false).await?;

    tracing::info!("User joined group");

    Ok(Json(JoinGroupResponse {
        group_id: group.id,
        group_name: group.name,
        user_id: user.0.id,
        message: "Successfully joined the group".to_string(),
    }))
}
