pub mod analyze;
pub mod documents;
pub mod extract;
pub mod health;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod reports;
pub mod rest;
pub mod share;
pub mod state;

pub use middleware::{require_bearer, AuthenticatedUser};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Slack above the upload limit for multipart framing and the other form fields.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Builds the API routes: public routes, then bearer-protected ones.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/ping", get(health::ping_handler))
        .route("/shared/analysis/{id}", get(share::shared_analysis_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/analyze", post(analyze::analyze_handler))
        .route("/analyze-background", post(analyze::analyze_background_handler))
        .route("/generate-report", post(reports::generate_report_handler))
        .route("/share-analysis", post(share::share_analysis_handler))
        .route(
            "/documents",
            post(documents::upload_document_handler).get(documents::list_documents_handler),
        )
        .route("/documents/bulk-delete", post(documents::bulk_delete_handler))
        .route(
            "/documents/{id}",
            get(documents::get_document_handler).delete(documents::delete_document_handler),
        )
        .route("/stats", get(documents::stats_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_bearer,
        ));

    let body_limit = usize::try_from(app_state.config.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}
