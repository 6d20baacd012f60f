//! crates/legal_lens_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{
    Analysis, AnalysisPayload, Document, DocumentFilter, DocumentStatus, NewDocument,
    StatusTransition, UploadedFile,
};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Status conflict: expected {expected}, found {actual}")]
    Conflict {
        expected: DocumentStatus,
        actual: DocumentStatus,
    },
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Document Management ---
    async fn create_document(&self, new_document: NewDocument) -> PortResult<Document>;

    async fn get_document(&self, document_id: Uuid) -> PortResult<Document>;

    /// Lists a user's documents, most recent first, keeping only those that
    /// pass `filter`. See [`DocumentFilter::matches`] for the exact semantics.
    async fn list_documents(
        &self,
        user_id: Uuid,
        filter: &DocumentFilter,
    ) -> PortResult<Vec<Document>>;

    /// Applies `transition` only while the document still holds `transition.from`.
    /// Writing the status the document already holds succeeds without change.
    async fn update_status(
        &self,
        document_id: Uuid,
        transition: StatusTransition,
    ) -> PortResult<()>;

    /// Deletes the document row. Returns `false` when no row existed.
    async fn delete_document(&self, document_id: Uuid) -> PortResult<bool>;

    // --- Analysis Management ---
    /// Inserts or replaces the single analysis belonging to `document_id`.
    async fn save_analysis(
        &self,
        document_id: Uuid,
        payload: &AnalysisPayload,
    ) -> PortResult<Analysis>;

    async fn get_analysis_by_document(&self, document_id: Uuid) -> PortResult<Analysis>;

    /// Returns the number of analysis rows removed.
    async fn delete_analyses_for_document(&self, document_id: Uuid) -> PortResult<u64>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Writes `data` under `bucket/key`. With `upsert` an existing object is replaced.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> PortResult<()>;

    async fn remove(&self, bucket: &str, key: &str) -> PortResult<()>;

    /// Publicly reachable URL of an object.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// Extracts plain text from a raw document file.
    async fn extract_text(&self, file: &UploadedFile) -> PortResult<String>;
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Submits legal text for analysis and returns the validated result.
    async fn analyze(&self, legal_text: &str) -> PortResult<AnalysisPayload>;
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Verifies a bearer token and returns the user it belongs to.
    async fn verify_bearer(&self, token: &str) -> PortResult<Uuid>;
}
