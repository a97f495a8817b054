use crate::auth::AuthenticatedUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tally_core::models::{
    ConfirmUploadRequest, ConfirmUploadResponse, IssueReceiptRequest, IssueReceiptResponse,
    PurchaseItemResponse, ReceiptItemsResponse,
};
use tally_core::AppError;

/// Issue a signed upload URL for a new receipt photo
#[utoipa::path(
    post,
    path = "/api/issue-signed-receipt",
    tag = "receipts",
    request_body = IssueReceiptRequest,
    responses(
        (status = 200, description = "Upload URL issued and pending receipt created", body = IssueReceiptResponse),
        (status = 400, description = "Missing or invalid group_id", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, user, request), fields(user_id = user.0.id))]
pub async fn issue_signed_receipt(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<IssueReceiptRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let group_id = request.parsed_group_id().map_err(AppError::InvalidInput)?;

    let issued = state
        .ingestion
        .issue_upload_credential(&user.0, group_id)
        .await?;

    Ok(Json(IssueReceiptResponse {
        upload_url: issued.upload_url,
        file_key: issued.object_key,
        receipt_id: issued.receipt_id,
    }))
}

/// Confirm a receipt upload and run OCR on it
///
/// The response is the same whether or not item extraction succeeded; poll
/// `GET /api/receipts/{receipt_id}/items` to see the extracted items.
#[utoipa::path(
    post,
    path = "/api/confirm-upload-and-start-ocr",
    tag = "receipts",
    request_body = ConfirmUploadRequest,
    responses(
        (status = 200, description = "Upload confirmed", body = ConfirmUploadResponse),
        (status = 400, description = "Invalid receipt_id", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Caller is not a member of the receipt's group", body = ErrorResponse),
        (status = 404, description = "Receipt not found", body = ErrorResponse),
        (status = 500, description = "Database failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, user, request), fields(user_id = user.0.id, receipt_id = request.receipt_id))]
pub async fn confirm_upload_and_start_ocr(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ConfirmUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request.receipt_id <= 0 {
        return Err(AppError::InvalidInput("Invalid receipt_id".to_string()).into());
    }

    let outcome = state
        .ingestion
        .confirm_upload(&user.0, request.receipt_id)
        .await?;

    Ok(Json(ConfirmUploadResponse {
        message: "Receipt upload confirmed successfully".to_string(),
        receipt_id: outcome.receipt_id,
        status: "uploaded".to_string(),
    }))
}

/// List the items extracted from a receipt
#[utoipa::path(
    get,
    path = "/api/receipts/{receipt_id}/items",
    tag = "receipts",
    params(
        ("receipt_id" = i64, Path, description = "Receipt ID")
    ),
    responses(
        (status = 200, description = "Receipt status and extracted items", body = ReceiptItemsResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Caller is not a member of the receipt's group", body = ErrorResponse),
        (status = 404, description = "Receipt not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn list_receipt_items(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(receipt_id): Path<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    let receipt = state
        .receipts
        .get(receipt_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))?;

    if !state.groups.is_member(receipt.group_id, user.0.id).await? {
        return Err(AppError::Forbidden("You are not a member of this group".to_string()).into());
    }

    let items = state.receipts.list_items(receipt.id).await?;

    Ok(Json(ReceiptItemsResponse {
        receipt_id: receipt.id,
        ocr_status: receipt.ocr_status,
        is_uploaded: receipt.is_uploaded,
        lifecycle: receipt.lifecycle(),
        items: items.into_iter().map(PurchaseItemResponse::from).collect(),
    }))
}
