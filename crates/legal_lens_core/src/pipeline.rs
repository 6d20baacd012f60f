//! The upload workflow up to the point where analysis can be dispatched:
//! validate, store (unless auto-delete), create the record, extract text.

use crate::domain::{Document, NewDocument, UploadedFile};
use crate::extraction::{extract_or_placeholder, ExtractedText};
use crate::intake::{storage_key, IntakeError, IntakePolicy, DOCUMENTS_BUCKET};
use crate::ports::{DatabaseService, ObjectStorage, PortError, TextExtractionService};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Invalid(#[from] IntakeError),
    #[error("Failed to store file: {0}")]
    Storage(PortError),
    #[error("Failed to create document record: {0}")]
    Record(PortError),
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: UploadedFile,
    pub title: Option<String>,
    /// Skip persisting the original file.
    pub auto_delete: bool,
}

#[derive(Debug, Clone)]
pub struct SubmittedUpload {
    pub document: Document,
    pub extracted: ExtractedText,
}

#[derive(Clone)]
pub struct UploadPipeline {
    policy: IntakePolicy,
    db: Arc<dyn DatabaseService>,
    storage: Arc<dyn ObjectStorage>,
    extractor: Arc<dyn TextExtractionService>,
}

impl UploadPipeline {
    pub fn new(
        policy: IntakePolicy,
        db: Arc<dyn DatabaseService>,
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractionService>,
    ) -> Self {
        Self {
            policy,
            db,
            storage,
            extractor,
        }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    pub async fn submit(
        &self,
        user_id: Uuid,
        request: UploadRequest,
    ) -> Result<SubmittedUpload, UploadError> {
        let UploadRequest {
            file,
            title,
            auto_delete,
        } = request;
        self.policy.validate(&file)?;

        let file_path = if auto_delete {
            None
        } else {
            let key = storage_key(user_id, Utc::now(), &file);
            self.storage
                .upload(DOCUMENTS_BUCKET, &key, &file.contents, &file.content_type, true)
                .await
                .map_err(UploadError::Storage)?;
            Some(key)
        };

        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| file.file_name.clone());

        let document = match self
            .db
            .create_document(NewDocument {
                user_id,
                title,
                file_path: file_path.clone(),
            })
            .await
        {
            Ok(document) => document,
            Err(e) => {
                if let Some(key) = &file_path {
                    if let Err(cleanup) = self.storage.remove(DOCUMENTS_BUCKET, key).await {
                        warn!(%key, error = %cleanup, "failed to remove orphaned upload");
                    }
                }
                return Err(UploadError::Record(e));
            }
        };
        info!(document_id = %document.id, auto_delete, "document record created");

        let extracted = extract_or_placeholder(self.extractor.as_ref(), &file).await;
        Ok(SubmittedUpload {
            document,
            extracted,
        })
    }
}
