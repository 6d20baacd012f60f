//! services/api/src/web/share.rs
//!
//! Share links for analyses. A link is the stable URL
//! `{PUBLIC_BASE_URL}/shared/analysis/{document_id}`; anyone holding it can
//! read the analysis.

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthenticatedUser;
use crate::web::models::{ShareRequest, ShareResponse, SharedAnalysis};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn share_url(public_base_url: &str, document_id: Uuid) -> String {
    format!("{}/shared/analysis/{}", public_base_url, document_id)
}

/// Create a share link for an analysed document.
#[utoipa::path(
    post,
    path = "/share-analysis",
    request_body = ShareRequest,
    responses(
        (status = 200, description = "Share link", body = ShareResponse),
        (status = 400, description = "Missing document id", body = ErrorBody),
        (status = 404, description = "Document or analysis not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn share_analysis_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<ShareRequest>,
) -> Result<Json<ShareResponse>, ApiError> {
    let document_id = body
        .document_id
        .ok_or_else(|| ApiError::Validation("documentId is required".to_string()))?;

    state.documents().get_owned(user_id, document_id).await?;
    let (_, analysis) = state.documents().get_with_analysis(document_id).await?;
    if analysis.is_none() {
        return Err(ApiError::NotFound("Analysis not found".to_string()));
    }

    Ok(Json(ShareResponse {
        success: true,
        share_url: share_url(&state.config.public_base_url, document_id),
        message: "Share link created".to_string(),
    }))
}

/// Read-only view of a shared analysis. Requires no authentication.
#[utoipa::path(
    get,
    path = "/shared/analysis/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "The shared analysis", body = SharedAnalysis),
        (status = 404, description = "Nothing shared under this id", body = ErrorBody)
    )
)]
pub async fn shared_analysis_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<SharedAnalysis>, ApiError> {
    let not_found = || ApiError::NotFound("Shared analysis not found".to_string());
    let (document, analysis) = state
        .documents()
        .get_with_analysis(document_id)
        .await
        .map_err(|e| match e {
            legal_lens_core::PortError::NotFound(_) => not_found(),
            other => ApiError::Port(other),
        })?;
    let analysis = analysis.ok_or_else(not_found)?;

    Ok(Json(SharedAnalysis {
        title: document.title,
        status: document.status.as_str().to_string(),
        analysis: analysis.into(),
    }))
}
