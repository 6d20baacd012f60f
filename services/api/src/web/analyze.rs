//! services/api/src/web/analyze.rs
//!
//! Handlers that hand extracted document text to the analysis service,
//! either waiting for the outcome or in a detached background job.

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthenticatedUser;
use crate::web::models::{AnalyzeRequest, AnalyzeResponse, BackgroundAccepted};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use legal_lens_core::ports::PortError;
use legal_lens_core::{AnalysisDispatcher, DocumentStatus};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Validates the body and checks the caller owns a document that is still
/// waiting for its analysis.
async fn checked_request(
    state: &AppState,
    user_id: Uuid,
    body: &AnalyzeRequest,
) -> Result<Uuid, ApiError> {
    let document_id = body.document_id.unwrap_or_else(Uuid::nil);
    AnalysisDispatcher::validate(document_id, &body.pdf_text)?;
    let document = state.documents().get_owned(user_id, document_id).await?;
    if document.status != DocumentStatus::Processing {
        return Err(ApiError::Port(PortError::Conflict {
            expected: DocumentStatus::Processing,
            actual: document.status,
        }));
    }
    Ok(document_id)
}

fn already_running(document_id: Uuid) -> ApiError {
    ApiError::Conflict(format!(
        "An analysis for document {} is already in progress",
        document_id
    ))
}

/// Analyse a document and wait for the result.
///
/// The analysis is stored and the document marked `completed` before this
/// returns. Any failure leaves the document `failed`.
#[utoipa::path(
    post,
    path = "/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis stored", body = AnalyzeResponse),
        (status = 400, description = "Missing text or document id", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Document not found", body = ErrorBody),
        (status = 409, description = "Analysis already running or document not processing", body = ErrorBody),
        (status = 502, description = "Analysis service failed", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let document_id = checked_request(&state, user_id, &body).await?;
    let Some(_claim) = state.jobs.claim(document_id) else {
        return Err(already_running(document_id));
    };

    let analysis = state.dispatcher().dispatch(document_id, &body.pdf_text).await?;
    Ok(Json(AnalyzeResponse {
        success: true,
        analysis: analysis.into(),
    }))
}

/// Start an analysis and return immediately.
///
/// The outcome is only visible through the document's status.
#[utoipa::path(
    post,
    path = "/analyze-background",
    request_body = AnalyzeRequest,
    responses(
        (status = 202, description = "Analysis started", body = BackgroundAccepted),
        (status = 400, description = "Missing text or document id", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Document not found", body = ErrorBody),
        (status = 409, description = "Analysis already running or document not processing", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn analyze_background_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = checked_request(&state, user_id, &body).await?;
    if !spawn_analysis(&state, document_id, body.pdf_text) {
        return Err(already_running(document_id));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(BackgroundAccepted {
            success: true,
            message: "Analysis started in background".to_string(),
            document_id,
        }),
    ))
}

/// Registers a detached analysis job. Returns `false` if one is already
/// running for the document.
pub(crate) fn spawn_analysis(state: &AppState, document_id: Uuid, text: String) -> bool {
    let dispatcher = state.dispatcher();
    state.jobs.spawn(document_id, async move {
        match dispatcher.dispatch(document_id, &text).await {
            Ok(analysis) => {
                info!(%document_id, analysis_id = %analysis.id, "background analysis completed")
            }
            Err(e) => error!(%document_id, error = %e, "background analysis failed"),
        }
    })
}
