//! Document record management on top of the database and storage ports:
//! owner-scoped reads, cascading deletes and dashboard statistics.

use crate::domain::{
    Analysis, BulkDeleteOutcome, BulkDeleteStatus, DashboardStats, DeleteOutcome, Document,
    DocumentFilter, DocumentStatus, RiskLevel,
};
use crate::intake::DOCUMENTS_BUCKET;
use crate::ports::{DatabaseService, ObjectStorage, PortError, PortResult};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct DocumentManager {
    db: Arc<dyn DatabaseService>,
    storage: Arc<dyn ObjectStorage>,
}

impl DocumentManager {
    pub fn new(db: Arc<dyn DatabaseService>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { db, storage }
    }

    /// Fetches a document, hiding documents owned by someone else.
    pub async fn get_owned(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Document> {
        let document = self.db.get_document(document_id).await?;
        if document.user_id != user_id {
            return Err(PortError::NotFound(format!("Document {} not found", document_id)));
        }
        Ok(document)
    }

    /// A document together with its analysis, if one has been stored.
    pub async fn get_with_analysis(
        &self,
        document_id: Uuid,
    ) -> PortResult<(Document, Option<Analysis>)> {
        let document = self.db.get_document(document_id).await?;
        let analysis = match self.db.get_analysis_by_document(document_id).await {
            Ok(analysis) => Some(analysis),
            Err(PortError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        Ok((document, analysis))
    }

    /// The user's documents, newest first. A blank search term is ignored.
    pub async fn list(&self, user_id: Uuid, filter: &DocumentFilter) -> PortResult<Vec<Document>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Ok(Vec::new());
            }
        }
        let filter = DocumentFilter {
            search,
            ..filter.clone()
        };
        self.db.list_documents(user_id, &filter).await
    }

    /// Removes the stored file, the analysis rows and the document row, in
    /// that order. Only the last step decides success; earlier failures are
    /// reported as warnings.
    pub async fn delete(&self, user_id: Uuid, document_id: Uuid) -> PortResult<DeleteOutcome> {
        let document = match self.get_owned(user_id, document_id).await {
            Ok(document) => document,
            Err(PortError::NotFound(_)) => return Ok(DeleteOutcome::NotFound),
            Err(e) => return Err(e),
        };
        let mut warnings = Vec::new();

        if let Some(path) = &document.file_path {
            if let Err(e) = self.storage.remove(DOCUMENTS_BUCKET, path).await {
                warn!(%document_id, error = %e, "failed to remove stored file");
                warnings.push(format!("{}: stored file was not removed", document.title));
            }
        }

        if let Err(e) = self.db.delete_analyses_for_document(document_id).await {
            warn!(%document_id, error = %e, "failed to delete analysis results");
            warnings.push(format!("{}: analysis results were not removed", document.title));
        }

        if !self.db.delete_document(document_id).await? {
            return Ok(DeleteOutcome::NotFound);
        }
        info!(%document_id, warnings = warnings.len(), "document deleted");
        Ok(DeleteOutcome::Deleted { warnings })
    }

    /// Deletes each document in turn without stopping at the first failure.
    pub async fn bulk_delete(&self, user_id: Uuid, document_ids: &[Uuid]) -> BulkDeleteOutcome {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut warnings = Vec::new();

        for &document_id in document_ids {
            match self.delete(user_id, document_id).await {
                Ok(DeleteOutcome::Deleted { warnings: w }) if w.is_empty() => succeeded += 1,
                Ok(DeleteOutcome::Deleted { warnings: w }) => {
                    failed += 1;
                    warnings.extend(w);
                }
                Ok(DeleteOutcome::NotFound) => {
                    failed += 1;
                    warnings.push(format!("Document {} not found", document_id));
                }
                Err(e) => {
                    failed += 1;
                    warnings.push(format!("Document {}: {}", document_id, e));
                }
            }
        }

        let status = match (succeeded, failed) {
            (_, 0) => BulkDeleteStatus::AllSucceeded,
            (0, _) => BulkDeleteStatus::AllFailed,
            _ => BulkDeleteStatus::Partial,
        };
        BulkDeleteOutcome {
            status,
            succeeded,
            failed,
            warnings,
        }
    }

    pub async fn stats(&self, user_id: Uuid) -> PortResult<DashboardStats> {
        let documents = self.db.list_documents(user_id, &DocumentFilter::default()).await?;
        let mut stats = DashboardStats {
            total_documents: documents.len(),
            ..Default::default()
        };

        for document in &documents {
            match document.status {
                DocumentStatus::Processing => stats.processing_documents += 1,
                DocumentStatus::Failed => stats.failed_documents += 1,
                DocumentStatus::Completed => {
                    stats.completed_documents += 1;
                    match self.db.get_analysis_by_document(document.id).await {
                        Ok(analysis) if analysis.risk().level() == RiskLevel::High => {
                            stats.high_risk_documents += 1
                        }
                        Ok(_) | Err(PortError::NotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisPayload, NewDocument, StatusTransition};
    use crate::testing::{sample_payload, InMemoryDatabase, InMemoryStorage};
    use std::sync::atomic::Ordering;

    struct Fixture {
        db: Arc<InMemoryDatabase>,
        storage: Arc<InMemoryStorage>,
        manager: DocumentManager,
        user: Uuid,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(InMemoryDatabase::new());
        let storage = Arc::new(InMemoryStorage::new());
        let manager = DocumentManager::new(db.clone(), storage.clone());
        Fixture {
            db,
            storage,
            manager,
            user: Uuid::new_v4(),
        }
    }

    impl Fixture {
        async fn stored_document(&self, title: &str) -> Document {
            let key = format!("{}/{}", self.user, title);
            self.storage
                .upload(DOCUMENTS_BUCKET, &key, b"%PDF", "application/pdf", true)
                .await
                .unwrap();
            let doc = self
                .db
                .create_document(NewDocument {
                    user_id: self.user,
                    title: title.to_string(),
                    file_path: Some(key),
                })
                .await
                .unwrap();
            self.db.save_analysis(doc.id, &sample_payload()).await.unwrap();
            self.db.update_status(doc.id, StatusTransition::complete()).await.unwrap();
            doc
        }
    }

    #[tokio::test]
    async fn delete_cascades_to_analysis_and_storage() {
        let f = fixture();
        let doc = f.stored_document("nda.pdf").await;

        let outcome = f.manager.delete(f.user, doc.id).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted { warnings: vec![] });
        assert_eq!(f.db.document_count(), 0);
        assert_eq!(f.db.analysis_count(), 0);
        assert_eq!(f.storage.object_count(), 0);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let f = fixture();
        let doc = f.stored_document("nda.pdf").await;

        assert!(f.manager.delete(f.user, doc.id).await.unwrap().is_deleted());
        assert_eq!(f.manager.delete(f.user, doc.id).await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(
            f.manager.delete(f.user, Uuid::new_v4()).await.unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn delete_continues_past_sub_step_failures() {
        let f = fixture();
        let doc = f.stored_document("lease.pdf").await;
        f.storage.fail_removal_of(doc.file_path.as_deref().unwrap());
        f.db.fail_delete_analyses.store(true, Ordering::SeqCst);

        let outcome = f.manager.delete(f.user, doc.id).await.unwrap();

        match outcome {
            DeleteOutcome::Deleted { warnings } => assert_eq!(warnings.len(), 2),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(f.db.document_count(), 0);
    }

    #[tokio::test]
    async fn foreign_documents_are_invisible() {
        let f = fixture();
        let doc = f.stored_document("nda.pdf").await;
        let stranger = Uuid::new_v4();

        assert!(matches!(
            f.manager.get_owned(stranger, doc.id).await,
            Err(PortError::NotFound(_))
        ));
        assert_eq!(f.manager.delete(stranger, doc.id).await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(f.db.document_count(), 1);
    }

    #[tokio::test]
    async fn bulk_delete_reports_partial_outcome() {
        let f = fixture();
        let a = f.stored_document("a.pdf").await;
        let b = f.stored_document("b.pdf").await;
        let c = f.stored_document("c.pdf").await;
        f.storage.fail_removal_of(b.file_path.as_deref().unwrap());

        let outcome = f.manager.bulk_delete(f.user, &[a.id, b.id, c.id]).await;

        assert_eq!(outcome.status, BulkDeleteStatus::Partial);
        assert_eq!(outcome.message(), "2 succeeded, 1 failed");
        assert!(f.manager.list(f.user, &DocumentFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_delete_of_missing_ids_fails_entirely() {
        let f = fixture();
        let outcome = f.manager.bulk_delete(f.user, &[Uuid::new_v4(), Uuid::new_v4()]).await;
        assert_eq!(outcome.status, BulkDeleteStatus::AllFailed);
        assert_eq!(outcome.failed, 2);
    }

    impl Fixture {
        async fn pending_document(&self, title: &str) -> Document {
            self.db
                .create_document(NewDocument {
                    user_id: self.user,
                    title: title.to_string(),
                    file_path: None,
                })
                .await
                .unwrap()
        }

        async fn titles(&self, filter: DocumentFilter) -> Vec<String> {
            self.manager
                .list(self.user, &filter)
                .await
                .unwrap()
                .into_iter()
                .map(|d| d.title)
                .collect()
        }
    }

    #[tokio::test]
    async fn list_filters_case_insensitively_newest_first() {
        let f = fixture();
        f.stored_document("Consulting Agreement").await;
        f.stored_document("Lease - TechStart").await;
        f.stored_document("lease - Acme").await;

        assert_eq!(
            f.titles(DocumentFilter::search("LEASE")).await,
            vec!["lease - Acme", "Lease - TechStart"]
        );
        assert_eq!(f.titles(DocumentFilter::search("  ")).await.len(), 3);
    }

    #[tokio::test]
    async fn list_search_reaches_summary_and_categories() {
        let f = fixture();
        f.stored_document("Consulting Agreement").await;
        f.pending_document("Draft contract").await;

        assert_eq!(
            f.titles(DocumentFilter::search("standard nda")).await,
            vec!["Consulting Agreement"]
        );
        assert_eq!(
            f.titles(DocumentFilter::search("confidential")).await,
            vec!["Consulting Agreement"]
        );
        assert_eq!(f.titles(DocumentFilter::search("contract")).await, vec!["Draft contract"]);
    }

    #[tokio::test]
    async fn list_filters_by_status_risk_and_upload_window() {
        let f = fixture();
        f.stored_document("safe.pdf").await;
        let risky = f.pending_document("risky.pdf").await;
        let payload = AnalysisPayload {
            risk_score: "12/100 (Higher scores indicate lower risk)".to_string(),
            ..Default::default()
        };
        f.db.save_analysis(risky.id, &payload).await.unwrap();
        f.db.update_status(risky.id, StatusTransition::complete()).await.unwrap();
        f.pending_document("pending.pdf").await;

        let by_status = DocumentFilter {
            status: Some(DocumentStatus::Processing),
            ..DocumentFilter::default()
        };
        assert_eq!(f.titles(by_status).await, vec!["pending.pdf"]);

        let by_risk = |level| DocumentFilter {
            risk_level: Some(level),
            ..DocumentFilter::default()
        };
        assert_eq!(f.titles(by_risk(RiskLevel::High)).await, vec!["risky.pdf"]);
        assert_eq!(f.titles(by_risk(RiskLevel::Low)).await, vec!["safe.pdf"]);
        assert!(f.titles(by_risk(RiskLevel::Medium)).await.is_empty());

        let now = chrono::Utc::now();
        let window = |from, to| DocumentFilter {
            from,
            to,
            ..DocumentFilter::default()
        };
        assert_eq!(
            f.titles(window(Some(now - chrono::Duration::hours(1)), Some(now))).await.len(),
            3
        );
        assert!(f
            .titles(window(Some(now + chrono::Duration::hours(1)), None))
            .await
            .is_empty());
        assert!(f
            .titles(window(Some(now), Some(now - chrono::Duration::hours(1))))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn stats_count_statuses_and_high_risk() {
        let f = fixture();
        f.stored_document("safe.pdf").await;
        let risky = f
            .db
            .create_document(NewDocument {
                user_id: f.user,
                title: "risky.pdf".to_string(),
                file_path: None,
            })
            .await
            .unwrap();
        let payload = AnalysisPayload {
            risk_score: "12/100 (Higher scores indicate lower risk)".to_string(),
            ..Default::default()
        };
        f.db.save_analysis(risky.id, &payload).await.unwrap();
        f.db.update_status(risky.id, StatusTransition::complete()).await.unwrap();
        f.db.create_document(NewDocument {
            user_id: f.user,
            title: "pending.pdf".to_string(),
            file_path: None,
        })
        .await
        .unwrap();

        let stats = f.manager.stats(f.user).await.unwrap();

        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.completed_documents, 2);
        assert_eq!(stats.processing_documents, 1);
        assert_eq!(stats.high_risk_documents, 1);
    }
}
