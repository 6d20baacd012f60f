//! services/api/src/web/documents.rs
//!
//! Handlers for uploading, listing, reading and deleting a user's documents.

use crate::error::{ApiError, ErrorBody};
use crate::web::analyze::spawn_analysis;
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthenticatedUser;
use crate::web::models::{
    BulkDeleteRequest, BulkDeleteResponse, DeleteResponse, DocumentDetail, DocumentView,
    ListQuery, StatsResponse, UploadAccepted,
};
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use legal_lens_core::{DeleteOutcome, DocumentFilter, UploadRequest, UploadedFile};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

//=========================================================================================
// Upload
//=========================================================================================

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("Failed to read multipart data: {}", e))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, ApiError> {
    let mut file = None;
    let mut title = None;
    let mut auto_delete = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("document.pdf").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let contents = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    contents,
                });
            }
            "title" => {
                let value = field.text().await.map_err(multipart_error)?;
                title = Some(value.trim().to_string()).filter(|t| !t.is_empty());
            }
            "auto_delete" => {
                auto_delete = parse_flag(&field.text().await.map_err(multipart_error)?);
            }
            other => warn!(field = %other, "ignoring unknown multipart field"),
        }
    }

    let file = file
        .ok_or_else(|| ApiError::Validation("Multipart form must include a file".to_string()))?;
    Ok(UploadRequest {
        file,
        title,
        auto_delete,
    })
}

/// Upload a PDF and start its analysis.
///
/// The file is validated, stored (unless `auto_delete` is set), recorded as a
/// `processing` document and its text extracted. Analysis then runs in the
/// background; poll `GET /documents/{id}` for the outcome.
#[utoipa::path(
    post,
    path = "/documents",
    request_body(content_type = "multipart/form-data", description = "Fields: `file` (PDF), optional `title`, optional `auto_delete`."),
    responses(
        (status = 202, description = "Document accepted for analysis", body = UploadAccepted),
        (status = 400, description = "Missing file, wrong type or too large", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 500, description = "Storage or database failure", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let request = read_upload(multipart).await?;
    let submitted = state.upload_pipeline().submit(user_id, request).await?;

    let document_id = submitted.document.id;
    let extraction_degraded = submitted.extracted.degraded;
    if !spawn_analysis(&state, document_id, submitted.extracted.text) {
        warn!(%document_id, "analysis already registered for new document");
    }
    info!(%document_id, %user_id, extraction_degraded, "document uploaded");

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            document_id,
            status: submitted.document.status.as_str().to_string(),
            extraction_degraded,
        }),
    ))
}

//=========================================================================================
// Reads
//=========================================================================================

/// List the caller's documents, newest first, optionally filtered.
#[utoipa::path(
    get,
    path = "/documents",
    params(ListQuery),
    responses(
        (status = 200, description = "The caller's documents", body = [DocumentView]),
        (status = 400, description = "Unknown status, risk level or date", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DocumentView>>, ApiError> {
    let filter = DocumentFilter::try_from(query)?;
    let documents = state.documents().list(user_id, &filter).await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

/// Fetch one document and, once available, its analysis.
#[utoipa::path(
    get,
    path = "/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document with optional analysis", body = DocumentDetail),
        (status = 404, description = "Document not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentDetail>, ApiError> {
    let (document, analysis) = state.documents().get_with_analysis(document_id).await?;
    if document.user_id != user_id {
        return Err(ApiError::NotFound(format!("Document {} not found", document_id)));
    }
    Ok(Json(DocumentDetail {
        document: document.into(),
        analysis: analysis.map(Into::into),
    }))
}

/// Dashboard counters for the caller.
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Document counts by status and risk", body = StatsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(state.documents().stats(user_id).await?.into()))
}

//=========================================================================================
// Deletion
//=========================================================================================

/// Delete a document, its stored file and its analysis.
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document deleted, possibly with warnings", body = DeleteResponse),
        (status = 404, description = "Document not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    match state.documents().delete(user_id, document_id).await? {
        DeleteOutcome::NotFound => Err(ApiError::NotFound(format!(
            "Document {} not found",
            document_id
        ))),
        DeleteOutcome::Deleted { warnings } => {
            let message = if warnings.is_empty() {
                "Document deleted".to_string()
            } else {
                "Document deleted with warnings".to_string()
            };
            Ok(Json(DeleteResponse {
                success: true,
                message,
                warnings,
            }))
        }
    }
}

/// Delete several documents, reporting how many succeeded.
#[utoipa::path(
    post,
    path = "/documents/bulk-delete",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Per-item outcome summary", body = BulkDeleteResponse),
        (status = 400, description = "No ids given", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn bulk_delete_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    if body.ids.is_empty() {
        return Err(ApiError::Validation("ids must not be empty".to_string()));
    }
    let outcome = state.documents().bulk_delete(user_id, &body.ids).await;
    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn auto_delete_flag_accepts_common_truthy_values() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("On"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
