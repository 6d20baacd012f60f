//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every request handler.

use crate::config::Config;
use crate::web::jobs::AnalysisJobs;
use legal_lens_core::ports::{
    AnalysisService, DatabaseService, IdentityService, ObjectStorage, TextExtractionService,
};
use legal_lens_core::{
    AnalysisDispatcher, DocumentManager, IntakePolicy, StatusTransition, UploadPipeline,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, warn};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub storage: Arc<dyn ObjectStorage>,
    pub extractor: Arc<dyn TextExtractionService>,
    pub analyzer: Arc<dyn AnalysisService>,
    pub identity: Arc<dyn IdentityService>,
    pub config: Arc<Config>,
    pub jobs: AnalysisJobs,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractionService>,
        analyzer: Arc<dyn AnalysisService>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        Self {
            db,
            storage,
            extractor,
            analyzer,
            identity,
            config,
            jobs: AnalysisJobs::default(),
            started_at: Instant::now(),
        }
    }

    pub fn dispatcher(&self) -> AnalysisDispatcher {
        AnalysisDispatcher::new(self.db.clone(), self.analyzer.clone())
    }

    pub fn documents(&self) -> DocumentManager {
        DocumentManager::new(self.db.clone(), self.storage.clone())
    }

    pub fn upload_pipeline(&self) -> UploadPipeline {
        UploadPipeline::new(
            IntakePolicy::default().with_max_bytes(self.config.max_upload_bytes),
            self.db.clone(),
            self.storage.clone(),
            self.extractor.clone(),
        )
    }

    /// Lets background analyses finish for up to `grace`, then marks the
    /// document of every aborted job `failed`. Returns how many were aborted.
    pub async fn drain_jobs(&self, grace: Duration) -> usize {
        let aborted = self.jobs.drain(grace).await;
        for document_id in &aborted {
            let document_id = *document_id;
            warn!(%document_id, "analysis aborted by shutdown");
            match self.db.update_status(document_id, StatusTransition::fail()).await {
                Ok(()) => {
                    if let Err(e) = self.db.delete_analyses_for_document(document_id).await {
                        warn!(%document_id, error = %e, "could not remove partial analysis");
                    }
                }
                Err(e) => error!(%document_id, error = %e, "could not mark aborted analysis failed"),
            }
        }
        aborted.len()
    }
}
