//! services/api/src/web/reports.rs
//!
//! PDF report generation for analysed documents.

use crate::error::{ApiError, ErrorBody};
use crate::report::{self, REPORTS_BUCKET};
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthenticatedUser;
use crate::web::models::{ReportRequest, ReportResponse};
use crate::web::state::AppState;
use axum::{extract::State, response::Json, Extension};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use legal_lens_core::PortError;
use std::sync::Arc;
use tracing::{info, warn};

/// Render the analysis of a document as a PDF.
///
/// With `saveToStorage` the report is written to the `reports` bucket and its
/// URL returned. Otherwise, or if storing fails, the PDF is returned inline as
/// a base64 data URL.
#[utoipa::path(
    post,
    path = "/generate-report",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report generated", body = ReportResponse),
        (status = 400, description = "Missing document id", body = ErrorBody),
        (status = 404, description = "Document or analysis not found", body = ErrorBody),
        (status = 500, description = "Report rendering failed", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn generate_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<ReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let document_id = body
        .document_id
        .ok_or_else(|| ApiError::Validation("documentId is required".to_string()))?;

    let document = state.documents().get_owned(user_id, document_id).await?;
    let analysis = state
        .db
        .get_analysis_by_document(document_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("Analysis not found".to_string()),
            other => ApiError::Port(other),
        })?;

    let layout = report::layout_report(&document, &analysis);
    let pdf = tokio::task::spawn_blocking(move || report::render_pdf(&layout))
        .await
        .map_err(|e| ApiError::Internal(format!("report task failed: {}", e)))??;

    let millis = Utc::now().timestamp_millis();
    if body.save_to_storage {
        let key = report::storage_key(&document, millis);
        match state
            .storage
            .upload(REPORTS_BUCKET, &key, &pdf, "application/pdf", true)
            .await
        {
            Ok(()) => {
                info!(%document_id, %key, "report saved");
                return Ok(Json(ReportResponse {
                    success: true,
                    message: "Report generated and saved".to_string(),
                    url: Some(state.storage.public_url(REPORTS_BUCKET, &key)),
                    pdf_data: None,
                    file_name: key,
                }));
            }
            Err(e) => warn!(%document_id, error = %e, "could not save report, returning it inline"),
        }
    }

    Ok(Json(ReportResponse {
        success: true,
        message: "Report generated".to_string(),
        url: None,
        pdf_data: Some(format!("data:application/pdf;base64,{}", STANDARD.encode(&pdf))),
        file_name: report::download_file_name(&document, millis),
    }))
}
