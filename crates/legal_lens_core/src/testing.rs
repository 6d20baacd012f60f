//! In-memory implementations of the service ports, with switches for
//! injecting failures. Only compiled for tests or with the `testing` feature.

use crate::domain::{
    Analysis, AnalysisPayload, Document, DocumentFilter, DocumentStatus, NewDocument,
    StatusTransition, UploadedFile,
};
use crate::ports::{
    AnalysisService, DatabaseService, IdentityService, ObjectStorage, PortError, PortResult,
    TextExtractionService,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// Database
//=========================================================================================

#[derive(Default)]
struct Tables {
    /// Insertion order doubles as creation order.
    documents: Vec<Document>,
    analyses: HashMap<Uuid, Analysis>,
    status_writes: Vec<(Uuid, DocumentStatus)>,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    pub fail_create_document: AtomicBool,
    pub fail_save_analysis: AtomicBool,
    pub fail_delete_analyses: AtomicBool,
    pub fail_complete: AtomicBool,
    pub fail_get_document: AtomicBool,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status value successfully written, in order.
    pub fn status_writes(&self) -> Vec<(Uuid, DocumentStatus)> {
        self.lock().status_writes.clone()
    }

    pub fn analysis_count(&self) -> usize {
        self.lock().analyses.len()
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    /// Sets a status directly, bypassing the transition guard.
    pub fn force_status(&self, document_id: Uuid, status: DocumentStatus) {
        let mut tables = self.lock();
        if let Some(doc) = tables.documents.iter_mut().find(|d| d.id == document_id) {
            doc.status = status;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found(what: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_document(&self, new_document: NewDocument) -> PortResult<Document> {
        if self.fail_create_document.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("insert rejected".to_string()));
        }
        let document = Document {
            id: Uuid::new_v4(),
            user_id: new_document.user_id,
            title: new_document.title,
            file_path: new_document.file_path,
            status: DocumentStatus::Processing,
            created_at: Utc::now(),
            processed_at: None,
        };
        self.lock().documents.push(document.clone());
        Ok(document)
    }

    async fn get_document(&self, document_id: Uuid) -> PortResult<Document> {
        if self.fail_get_document.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("read timed out".to_string()));
        }
        self.lock()
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .cloned()
            .ok_or_else(|| not_found("Document", document_id))
    }

    async fn list_documents(
        &self,
        user_id: Uuid,
        filter: &DocumentFilter,
    ) -> PortResult<Vec<Document>> {
        let tables = self.lock();
        Ok(tables
            .documents
            .iter()
            .rev()
            .filter(|d| d.user_id == user_id)
            .filter(|d| filter.matches(d, tables.analyses.get(&d.id)))
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        document_id: Uuid,
        transition: StatusTransition,
    ) -> PortResult<()> {
        if transition.to == DocumentStatus::Completed && self.fail_complete.load(Ordering::SeqCst)
        {
            return Err(PortError::Unexpected("status update rejected".to_string()));
        }
        let mut tables = self.lock();
        let doc = tables
            .documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| not_found("Document", document_id))?;
        if doc.status == transition.to {
            return Ok(());
        }
        if doc.status != transition.from {
            return Err(PortError::Conflict {
                expected: transition.from,
                actual: doc.status,
            });
        }
        doc.status = transition.to;
        if transition.to.is_terminal() {
            doc.processed_at = Some(Utc::now());
        }
        tables.status_writes.push((document_id, transition.to));
        Ok(())
    }

    async fn delete_document(&self, document_id: Uuid) -> PortResult<bool> {
        let mut tables = self.lock();
        let before = tables.documents.len();
        tables.documents.retain(|d| d.id != document_id);
        Ok(tables.documents.len() < before)
    }

    async fn save_analysis(
        &self,
        document_id: Uuid,
        payload: &AnalysisPayload,
    ) -> PortResult<Analysis> {
        if self.fail_save_analysis.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("analysis insert rejected".to_string()));
        }
        let mut tables = self.lock();
        if !tables.documents.iter().any(|d| d.id == document_id) {
            return Err(not_found("Document", document_id));
        }
        let analysis = Analysis {
            id: Uuid::new_v4(),
            document_id,
            summary: payload.summary.clone(),
            risk_score: payload.risk_score.clone(),
            categories: payload.categories.clone(),
            findings: payload.findings.clone(),
            questions: payload.questions.clone(),
            created_at: Utc::now(),
        };
        tables.analyses.insert(document_id, analysis.clone());
        Ok(analysis)
    }

    async fn get_analysis_by_document(&self, document_id: Uuid) -> PortResult<Analysis> {
        self.lock()
            .analyses
            .get(&document_id)
            .cloned()
            .ok_or_else(|| not_found("Analysis for document", document_id))
    }

    async fn delete_analyses_for_document(&self, document_id: Uuid) -> PortResult<u64> {
        if self.fail_delete_analyses.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("analysis delete rejected".to_string()));
        }
        Ok(self.lock().analyses.remove(&document_id).map_or(0, |_| 1))
    }
}

//=========================================================================================
// Object Storage
//=========================================================================================

#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failing_removals: Mutex<HashSet<String>>,
    pub fail_uploads: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn object_count(&self) -> usize {
        self.objects().len()
    }

    /// Makes every later `remove` of `key` fail.
    pub fn fail_removal_of(&self, key: &str) {
        self.failing_removals
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string());
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        _content_type: &str,
        upsert: bool,
    ) -> PortResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("storage unavailable".to_string()));
        }
        let mut objects = self.objects();
        let id = (bucket.to_string(), key.to_string());
        if !upsert && objects.contains_key(&id) {
            return Err(PortError::Unexpected(format!("{}/{} already exists", bucket, key)));
        }
        objects.insert(id, data.to_vec());
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> PortResult<()> {
        let failing = self
            .failing_removals
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(key);
        if failing {
            return Err(PortError::Unexpected(format!("cannot remove {}/{}", bucket, key)));
        }
        self.objects().remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }
}

//=========================================================================================
// External Services
//=========================================================================================

/// Extraction stub returning a fixed text, or an upstream error when `None`.
pub struct StubExtractor {
    text: Option<String>,
    pub calls: AtomicUsize,
}

impl StubExtractor {
    pub fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextExtractionService for StubExtractor {
    async fn extract_text(&self, _file: &UploadedFile) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| PortError::Upstream("extraction returned HTTP 500".to_string()))
    }
}

/// Analysis stub returning a fixed payload, or an upstream error when `None`.
/// Every submitted text is recorded.
pub struct StubAnalyzer {
    payload: Option<AnalysisPayload>,
    received: Mutex<Vec<String>>,
}

impl StubAnalyzer {
    pub fn returning(payload: AnalysisPayload) -> Self {
        Self {
            payload: Some(payload),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: None,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl AnalysisService for StubAnalyzer {
    async fn analyze(&self, legal_text: &str) -> PortResult<AnalysisPayload> {
        self.received
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(legal_text.to_string());
        self.payload
            .clone()
            .ok_or_else(|| PortError::Upstream("analysis returned HTTP 500".to_string()))
    }
}

/// Accepts a fixed set of tokens.
#[derive(Default)]
pub struct StaticIdentity {
    tokens: HashMap<String, Uuid>,
}

impl StaticIdentity {
    pub fn with_token(mut self, token: &str, user_id: Uuid) -> Self {
        self.tokens.insert(token.to_string(), user_id);
        self
    }
}

#[async_trait]
impl IdentityService for StaticIdentity {
    async fn verify_bearer(&self, token: &str) -> PortResult<Uuid> {
        self.tokens.get(token).copied().ok_or(PortError::Unauthorized)
    }
}

/// A payload shaped like a typical NDA review.
pub fn sample_payload() -> AnalysisPayload {
    AnalysisPayload::from_json(&serde_json::json!({
        "full_summary": "Standard NDA terms",
        "risk_score": "78/100 (Higher scores indicate lower risk)",
        "categories": {
            "Confidentiality": { "risk_level": "Low Risk", "points": ["Mutual obligations"] }
        },
        "key_findings": [{
            "title": "Term",
            "description": "Obligations survive for two years.",
            "risk_level": "Low",
            "icon": "clock",
            "section": "Section 4"
        }],
        "legal_questions": ["Can the survival period be shortened?"]
    }))
}
