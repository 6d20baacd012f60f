//! crates/legal_lens_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP client.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

//=========================================================================================
// Documents
//=========================================================================================

/// Processing status of a document. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DocumentStatus::Processing)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}

/// A guarded status change: the write only applies while the document
/// still holds `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: DocumentStatus,
    pub to: DocumentStatus,
}

impl StatusTransition {
    pub fn complete() -> Self {
        Self {
            from: DocumentStatus::Processing,
            to: DocumentStatus::Completed,
        }
    }

    pub fn fail() -> Self {
        Self {
            from: DocumentStatus::Processing,
            to: DocumentStatus::Failed,
        }
    }
}

/// Represents one uploaded legal document and its processing status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Object store key of the original file. `None` when the user asked for auto-delete.
    pub file_path: Option<String>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Fields required to create a document record.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: Uuid,
    pub title: String,
    pub file_path: Option<String>,
}

/// A file received from a user, before validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub contents: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }

    /// Lowercased extension of the file name, falling back to `pdf`.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "pdf".to_string())
    }
}

//=========================================================================================
// Analyses
//=========================================================================================

/// Coarse risk classification used by findings and dashboard statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Parses labels such as `"High"`, `"high risk"` or `"Medium Risk"`.
    /// Anything unrecognised is treated as `Medium`.
    pub fn normalize(label: &str) -> Self {
        let lowered = label.trim().to_lowercase();
        match lowered.trim_end_matches("risk").trim() {
            "low" => RiskLevel::Low,
            "high" => RiskLevel::High,
            _ => RiskLevel::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    /// Strict counterpart of [`RiskLevel::normalize`]: unknown labels are an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.trim_end_matches("risk").trim() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(format!("unknown risk level '{}'", s.trim())),
        }
    }
}

/// Numeric view of a risk score string like `"42/100 (Higher scores indicate lower risk)"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskScore(pub u32);

impl RiskScore {
    pub fn parse(raw: &str) -> Self {
        static SCORE: OnceLock<Regex> = OnceLock::new();
        let re = SCORE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*/\s*100").expect("valid regex"));
        let value = re
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0);
        RiskScore(value.min(100))
    }

    /// Higher scores mean lower risk.
    pub fn level(&self) -> RiskLevel {
        match self.0 {
            70..=100 => RiskLevel::Low,
            40..=69 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub risk_level: String,
    pub points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingEntry {
    pub title: String,
    pub description: String,
    pub risk_level: RiskLevel,
    pub icon: String,
    pub section: String,
}

/// The structured result returned by the external analysis service.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnalysisPayload {
    pub summary: String,
    pub risk_score: String,
    pub categories: BTreeMap<String, CategoryEntry>,
    pub findings: Vec<FindingEntry>,
    pub questions: Vec<String>,
}

/// A persisted analysis. At most one exists per document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub id: Uuid,
    pub document_id: Uuid,
    pub summary: String,
    pub risk_score: String,
    pub categories: BTreeMap<String, CategoryEntry>,
    pub findings: Vec<FindingEntry>,
    pub questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    pub fn risk(&self) -> RiskScore {
        RiskScore::parse(&self.risk_score)
    }
}

//=========================================================================================
// Listing
//=========================================================================================

/// Narrows a document listing. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    /// Case-insensitive substring of the title, the analysis summary or a category name.
    pub search: Option<String>,
    pub status: Option<DocumentStatus>,
    /// Level derived from the analysis score. Documents without an analysis never match.
    pub risk_level: Option<RiskLevel>,
    /// Inclusive lower bound on the upload time.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the upload time.
    pub to: Option<DateTime<Utc>>,
}

impl DocumentFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Whether `document`, with its analysis if any, passes every set condition.
    pub fn matches(&self, document: &Document, analysis: Option<&Analysis>) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = document.title.to_lowercase().contains(&term)
                || analysis.is_some_and(|a| {
                    a.summary.to_lowercase().contains(&term)
                        || a.categories.keys().any(|k| k.to_lowercase().contains(&term))
                });
            if !hit {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != document.status) {
            return false;
        }
        if let Some(level) = self.risk_level {
            if analysis.map(|a| a.risk().level()) != Some(level) {
                return false;
            }
        }
        if self.from.is_some_and(|from| document.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| document.created_at > to) {
            return false;
        }
        true
    }
}

//=========================================================================================
// Deletion and Dashboard Results
//=========================================================================================

/// Result of deleting a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The document row was removed. `warnings` lists sub-steps that failed along the way.
    Deleted { warnings: Vec<String> },
    NotFound,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkDeleteStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDeleteOutcome {
    pub status: BulkDeleteStatus,
    pub succeeded: usize,
    pub failed: usize,
    pub warnings: Vec<String>,
}

impl BulkDeleteOutcome {
    pub fn message(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_documents: usize,
    pub completed_documents: usize,
    pub processing_documents: usize,
    pub failed_documents: usize,
    pub high_risk_documents: usize,
}
