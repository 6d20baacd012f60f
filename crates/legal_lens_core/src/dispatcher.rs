//! Submits extracted text to the analysis service, persists the result and
//! moves the document to a terminal status.
//!
//! The analysis row is always written before the document is marked
//! completed. Any failure on the way leaves the document `failed` and, as far
//! as the store allows, without an analysis row. Only a `processing` document
//! is accepted; anything already terminal is left untouched.

use crate::domain::{Analysis, DocumentStatus, StatusTransition};
use crate::ports::{AnalysisService, DatabaseService, PortError};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),
    /// The document is missing or no longer waiting for an analysis.
    #[error("{0}")]
    Rejected(PortError),
    #[error("Analysis failed: {0}")]
    Upstream(PortError),
    #[error("Failed to save analysis result: {0}")]
    Persistence(PortError),
}

#[derive(Clone)]
pub struct AnalysisDispatcher {
    db: Arc<dyn DatabaseService>,
    analyzer: Arc<dyn AnalysisService>,
}

impl AnalysisDispatcher {
    pub fn new(db: Arc<dyn DatabaseService>, analyzer: Arc<dyn AnalysisService>) -> Self {
        Self { db, analyzer }
    }

    /// Checks the inputs before anything touches the network or the store.
    pub fn validate(document_id: Uuid, text: &str) -> Result<(), DispatchError> {
        if text.trim().is_empty() {
            return Err(DispatchError::Validation("pdf_text is required".to_string()));
        }
        if document_id.is_nil() {
            return Err(DispatchError::Validation("document_id is required".to_string()));
        }
        Ok(())
    }

    pub async fn dispatch(&self, document_id: Uuid, text: &str) -> Result<Analysis, DispatchError> {
        Self::validate(document_id, text)?;
        let document = self.db.get_document(document_id).await.map_err(|e| match e {
            PortError::NotFound(_) => DispatchError::Rejected(e),
            other => DispatchError::Persistence(other),
        })?;
        if document.status != DocumentStatus::Processing {
            warn!(%document_id, status = %document.status, "document is not awaiting analysis");
            return Err(DispatchError::Rejected(PortError::Conflict {
                expected: DocumentStatus::Processing,
                actual: document.status,
            }));
        }
        info!(%document_id, chars = text.len(), "submitting document for analysis");

        let payload = match self.analyzer.analyze(text).await {
            Ok(payload) => payload,
            Err(e) => {
                error!(%document_id, error = %e, "analysis service failed");
                self.mark_failed(document_id).await;
                return Err(DispatchError::Upstream(e));
            }
        };

        let analysis = match self.db.save_analysis(document_id, &payload).await {
            Ok(analysis) => analysis,
            Err(e) => {
                error!(%document_id, error = %e, "failed to save analysis result");
                self.mark_failed(document_id).await;
                return Err(DispatchError::Persistence(e));
            }
        };

        if let Err(e) = self
            .db
            .update_status(document_id, StatusTransition::complete())
            .await
        {
            error!(%document_id, error = %e, "failed to mark document completed");
            if let Err(cleanup) = self.db.delete_analyses_for_document(document_id).await {
                warn!(%document_id, error = %cleanup, "could not roll back analysis row");
            }
            self.mark_failed(document_id).await;
            return Err(DispatchError::Persistence(e));
        }

        info!(%document_id, risk_score = %analysis.risk_score, "analysis completed");
        Ok(analysis)
    }

    async fn mark_failed(&self, document_id: Uuid) {
        if let Err(e) = self
            .db
            .update_status(document_id, StatusTransition::fail())
            .await
        {
            error!(%document_id, error = %e, "failed to mark document failed");
        }
    }
}
