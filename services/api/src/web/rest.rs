//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification of the REST API.

use crate::error::ErrorBody;
use crate::web::models::{
    AnalysisView, AnalyzeRequest, AnalyzeResponse, BackgroundAccepted, BulkDeleteRequest,
    BulkDeleteResponse, CategoryView, DeleteResponse, DocumentDetail, DocumentView, FindingView,
    PingResponse, ReportRequest, ReportResponse, ShareRequest, ShareResponse, SharedAnalysis,
    StatsResponse, UploadAccepted,
};
use crate::web::{analyze, documents, health, reports, share};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        analyze::analyze_handler,
        analyze::analyze_background_handler,
        documents::upload_document_handler,
        documents::list_documents_handler,
        documents::get_document_handler,
        documents::delete_document_handler,
        documents::bulk_delete_handler,
        documents::stats_handler,
        reports::generate_report_handler,
        share::share_analysis_handler,
        share::shared_analysis_handler,
        health::ping_handler,
    ),
    components(
        schemas(
            ErrorBody, DocumentView, DocumentDetail, AnalysisView, CategoryView, FindingView,
            UploadAccepted, DeleteResponse, BulkDeleteRequest, BulkDeleteResponse, StatsResponse,
            AnalyzeRequest, AnalyzeResponse, BackgroundAccepted, ReportRequest, ReportResponse,
            ShareRequest, ShareResponse, SharedAnalysis, PingResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Legal Lens API", description = "Upload legal documents, run risk analyses and share the results.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/analyze",
            "/analyze-background",
            "/documents",
            "/documents/{id}",
            "/documents/bulk-delete",
            "/stats",
            "/generate-report",
            "/share-analysis",
            "/shared/analysis/{id}",
            "/ping",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let schemes = doc.components.map(|c| c.security_schemes).unwrap_or_default();
        assert!(schemes.contains_key("bearer"));
    }
}
