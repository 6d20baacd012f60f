//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legal_lens_core::domain::{
    Analysis, AnalysisPayload, CategoryEntry, Document, DocumentFilter, DocumentStatus,
    FindingEntry, NewDocument, StatusTransition,
};
use legal_lens_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Escapes `LIKE` wildcards so the search term matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Prefixes every column in a comma separated list with `alias`.
fn qualified(alias: &str, columns: &str) -> String {
    columns
        .split(", ")
        .map(|column| format!("{}.{}", alias, column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Listing query. The risk bands must agree with `RiskScore::level`.
const LIST_DOCUMENTS_SQL: &str = r#"
SELECT {columns}
FROM documents d
LEFT JOIN analysis_results a ON a.document_id = d.id
WHERE d.user_id = $1
  AND ($2::TEXT IS NULL
       OR d.title ILIKE $2
       OR a.summary ILIKE $2
       OR EXISTS (SELECT 1 FROM jsonb_object_keys(a.categories) AS k WHERE k ILIKE $2))
  AND ($3::TEXT IS NULL OR d.status = $3)
  AND ($4::TEXT IS NULL OR (a.id IS NOT NULL AND $4 = CASE
        WHEN LEAST(COALESCE(substring(a.risk_score FROM '^\s*(\d+)\s*/\s*100')::NUMERIC, 0), 100) >= 70 THEN 'Low'
        WHEN LEAST(COALESCE(substring(a.risk_score FROM '^\s*(\d+)\s*/\s*100')::NUMERIC, 0), 100) >= 40 THEN 'Medium'
        ELSE 'High' END))
  AND ($5::TIMESTAMPTZ IS NULL OR d.created_at >= $5)
  AND ($6::TIMESTAMPTZ IS NULL OR d.created_at <= $6)
ORDER BY d.created_at DESC
"#;

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const DOCUMENT_COLUMNS: &str = "id, user_id, title, file_path, status, created_at, processed_at";
const ANALYSIS_COLUMNS: &str = "id, document_id, summary, risk_score, risks_detected, categories, suggested_questions, created_at";

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    file_path: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}
impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        let status = self
            .status
            .parse::<DocumentStatus>()
            .map_err(PortError::Unexpected)?;
        Ok(Document {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            file_path: self.file_path,
            status,
            created_at: self.created_at,
            processed_at: self.processed_at,
        })
    }
}

#[derive(FromRow)]
struct AnalysisRecord {
    id: Uuid,
    document_id: Uuid,
    summary: String,
    risk_score: String,
    risks_detected: Json<Vec<FindingEntry>>,
    categories: Json<BTreeMap<String, CategoryEntry>>,
    suggested_questions: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}
impl AnalysisRecord {
    fn to_domain(self) -> Analysis {
        Analysis {
            id: self.id,
            document_id: self.document_id,
            summary: self.summary,
            risk_score: self.risk_score,
            findings: self.risks_detected.0,
            categories: self.categories.0,
            questions: self.suggested_questions.0,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_document(&self, new_document: NewDocument) -> PortResult<Document> {
        let sql = format!(
            "INSERT INTO documents (id, user_id, title, file_path, status) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            DOCUMENT_COLUMNS
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(new_document.user_id)
            .bind(&new_document.title)
            .bind(&new_document.file_path)
            .bind(DocumentStatus::Processing.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_document(&self, document_id: Uuid) -> PortResult<Document> {
        let sql = format!("SELECT {} FROM documents WHERE id = $1", DOCUMENT_COLUMNS);
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Document {} not found", document_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn list_documents(
        &self,
        user_id: Uuid,
        filter: &DocumentFilter,
    ) -> PortResult<Vec<Document>> {
        let sql = LIST_DOCUMENTS_SQL.replace("{columns}", &qualified("d", DOCUMENT_COLUMNS));
        let records = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(user_id)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.risk_level.map(|l| l.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_status(
        &self,
        document_id: Uuid,
        transition: StatusTransition,
    ) -> PortResult<()> {
        let updated = sqlx::query(
            "UPDATE documents SET status = $1, processed_at = CASE WHEN $1 = 'processing' THEN NULL ELSE NOW() END WHERE id = $2 AND status = $3",
        )
        .bind(transition.to.as_str())
        .bind(document_id)
        .bind(transition.from.as_str())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?
        .rows_affected();

        if updated == 1 {
            return Ok(());
        }

        // Nothing matched the guard: either the row is gone, already holds the
        // target status, or moved on to something else.
        let current = self.get_document(document_id).await?.status;
        if current == transition.to {
            Ok(())
        } else {
            Err(PortError::Conflict {
                expected: transition.from,
                actual: current,
            })
        }
    }

    async fn delete_document(&self, document_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_analysis(
        &self,
        document_id: Uuid,
        payload: &AnalysisPayload,
    ) -> PortResult<Analysis> {
        let sql = format!(
            "INSERT INTO analysis_results (id, document_id, summary, risk_score, risks_detected, categories, suggested_questions) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (document_id) DO UPDATE SET summary = EXCLUDED.summary, risk_score = EXCLUDED.risk_score, \
             risks_detected = EXCLUDED.risks_detected, categories = EXCLUDED.categories, \
             suggested_questions = EXCLUDED.suggested_questions, created_at = NOW() \
             RETURNING {}",
            ANALYSIS_COLUMNS
        );
        let record = sqlx::query_as::<_, AnalysisRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(document_id)
            .bind(&payload.summary)
            .bind(&payload.risk_score)
            .bind(Json(&payload.findings))
            .bind(Json(&payload.categories))
            .bind(Json(&payload.questions))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                let missing_document = matches!(
                    &e,
                    sqlx::Error::Database(db) if db.is_foreign_key_violation()
                );
                if missing_document {
                    PortError::NotFound(format!("Document {} not found", document_id))
                } else {
                    unexpected(e)
                }
            })?;
        Ok(record.to_domain())
    }

    async fn get_analysis_by_document(&self, document_id: Uuid) -> PortResult<Analysis> {
        let sql = format!(
            "SELECT {} FROM analysis_results WHERE document_id = $1",
            ANALYSIS_COLUMNS
        );
        let record = sqlx::query_as::<_, AnalysisRecord>(&sql)
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Analysis for document {} not found", document_id))
                }
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn delete_analyses_for_document(&self, document_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM analysis_results WHERE document_id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}
