//! OpenAPI document served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use tally_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tally API",
        version = "0.1.0",
        description = "Receipt capture for groups: signed photo uploads, OCR item extraction and group membership. Every /api route except the OpenAPI document requires a `session_id` cookie."
    ),
    paths(
        handlers::receipts::issue_signed_receipt,
        handlers::receipts::confirm_upload_and_start_ocr,
        handlers::receipts::list_receipt_items,
        handlers::groups::create_group,
        handlers::groups::join_group,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::IssueReceiptRequest,
            models::IssueReceiptResponse,
            models::ConfirmUploadRequest,
            models::ConfirmUploadResponse,
            models::ReceiptItemsResponse,
            models::PurchaseItemResponse,
            models::OcrStatus,
            models::ReceiptLifecycle,
            models::CreateGroupRequest,
            models::CreateGroupResponse,
            models::JoinGroupRequest,
            models::JoinGroupResponse,
        )
    ),
    tags(
        (name = "receipts", description = "Receipt upload and OCR"),
        (name = "groups", description = "Group creation and membership")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/issue-signed-receipt",
            "/api/confirm-upload-and-start-ocr",
            "/api/receipts/{receipt_id}/items",
            "/api/create-group",
            "/api/join-group",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
