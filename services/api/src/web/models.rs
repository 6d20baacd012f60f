//! services/api/src/web/models.rs
//!
//! Request and response payloads of the REST API. Domain types are mapped
//! into these views so the OpenAPI schema stays independent of the core crate.

use crate::error::ApiError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use legal_lens_core::domain::{
    Analysis, BulkDeleteOutcome, CategoryEntry, DashboardStats, Document, DocumentFilter,
    DocumentStatus, FindingEntry, RiskLevel,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Documents and Analyses
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentView {
    pub id: Uuid,
    pub title: String,
    pub file_path: Option<String>,
    /// One of `processing`, `completed`, `failed`.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<Document> for DocumentView {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            title: d.title,
            file_path: d.file_path,
            status: d.status.as_str().to_string(),
            created_at: d.created_at,
            processed_at: d.processed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryView {
    pub risk_level: String,
    pub points: Vec<String>,
}

impl From<CategoryEntry> for CategoryView {
    fn from(c: CategoryEntry) -> Self {
        Self {
            risk_level: c.risk_level,
            points: c.points,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FindingView {
    pub title: String,
    pub description: String,
    pub risk_level: String,
    pub icon: String,
    pub section: String,
}

impl From<FindingEntry> for FindingView {
    fn from(f: FindingEntry) -> Self {
        Self {
            title: f.title,
            description: f.description,
            risk_level: f.risk_level.as_str().to_string(),
            icon: f.icon,
            section: f.section,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalysisView {
    pub id: Uuid,
    pub document_id: Uuid,
    pub summary: String,
    pub risk_score: String,
    /// Level derived from the numeric score: `Low`, `Medium` or `High`.
    pub risk_level: String,
    pub categories: BTreeMap<String, CategoryView>,
    pub risks_detected: Vec<FindingView>,
    pub suggested_questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Analysis> for AnalysisView {
    fn from(a: Analysis) -> Self {
        let risk_level = a.risk().level().as_str().to_string();
        Self {
            id: a.id,
            document_id: a.document_id,
            summary: a.summary,
            risk_score: a.risk_score,
            risk_level,
            categories: a
                .categories
                .into_iter()
                .map(|(name, entry)| (name, entry.into()))
                .collect(),
            risks_detected: a.findings.into_iter().map(Into::into).collect(),
            suggested_questions: a.questions,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentDetail {
    pub document: DocumentView,
    pub analysis: Option<AnalysisView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadAccepted {
    pub document_id: Uuid,
    pub status: String,
    /// `true` when text extraction failed and a placeholder was analysed instead.
    pub extraction_degraded: bool,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Case-insensitive substring of the title, the summary or a category name.
    pub search: Option<String>,
    /// `processing`, `completed` or `failed`.
    pub status: Option<String>,
    /// `low`, `medium` or `high`. Only analysed documents match.
    #[serde(alias = "riskLevel")]
    pub risk_level: Option<String>,
    /// Earliest upload time, as an RFC 3339 timestamp or a `YYYY-MM-DD` date.
    pub from: Option<String>,
    /// Latest upload time. A bare date includes that whole day.
    pub to: Option<String>,
}

impl TryFrom<ListQuery> for DocumentFilter {
    type Error = ApiError;

    fn try_from(query: ListQuery) -> Result<Self, Self::Error> {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let status = non_blank(query.status)
            .map(|s| s.trim().to_lowercase().parse::<DocumentStatus>())
            .transpose()
            .map_err(ApiError::Validation)?;
        let risk_level = non_blank(query.risk_level)
            .map(|l| l.parse::<RiskLevel>())
            .transpose()
            .map_err(ApiError::Validation)?;
        let from = non_blank(query.from)
            .map(|raw| parse_bound("from", &raw, false))
            .transpose()?;
        let to = non_blank(query.to)
            .map(|raw| parse_bound("to", &raw, true))
            .transpose()?;
        Ok(DocumentFilter {
            search: query.search,
            status,
            risk_level,
            from,
            to,
        })
    }
}

/// Reads an RFC 3339 timestamp or a plain date. A plain date becomes the
/// start of that day, or its last instant when `end_of_day` is set.
fn parse_bound(key: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let invalid =
        || ApiError::Validation(format!("{} must be an RFC 3339 timestamp or a YYYY-MM-DD date", key));
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkDeleteResponse {
    pub success: bool,
    /// `all_succeeded`, `partial` or `all_failed`.
    pub status: String,
    pub succeeded: usize,
    pub failed: usize,
    pub message: String,
    pub warnings: Vec<String>,
}

impl From<BulkDeleteOutcome> for BulkDeleteResponse {
    fn from(o: BulkDeleteOutcome) -> Self {
        let message = o.message();
        let status = serde_json::to_value(o.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            success: o.failed == 0,
            status,
            succeeded: o.succeeded,
            failed: o.failed,
            message,
            warnings: o.warnings,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub total_documents: usize,
    pub completed_documents: usize,
    pub processing_documents: usize,
    pub failed_documents: usize,
    pub high_risk_documents: usize,
}

impl From<DashboardStats> for StatsResponse {
    fn from(s: DashboardStats) -> Self {
        Self {
            total_documents: s.total_documents,
            completed_documents: s.completed_documents,
            processing_documents: s.processing_documents,
            failed_documents: s.failed_documents,
            high_risk_documents: s.high_risk_documents,
        }
    }
}

//=========================================================================================
// Analysis Dispatch
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub pdf_text: String,
    #[serde(default)]
    pub document_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: AnalysisView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundAccepted {
    pub success: bool,
    pub message: String,
    pub document_id: Uuid,
}

//=========================================================================================
// Reports and Sharing
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub document_id: Option<Uuid>,
    #[serde(default)]
    pub save_to_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `data:application/pdf;base64,...` when the report was not stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_data: Option<String>,
    pub file_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default)]
    pub document_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub success: bool,
    pub share_url: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SharedAnalysis {
    pub title: String,
    pub status: String,
    pub analysis: AnalysisView,
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Milliseconds spent handling the request.
    pub latency: u64,
    /// Seconds since the server started.
    pub uptime: u64,
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        };
        ListQuery {
            search: get("search"),
            status: get("status"),
            risk_level: get("risk_level"),
            from: get("from"),
            to: get("to"),
        }
    }

    #[test]
    fn list_query_becomes_a_filter() {
        let filter = DocumentFilter::try_from(query(&[
            ("search", "nda"),
            ("status", "Completed"),
            ("risk_level", "high"),
            ("from", "2024-01-01"),
            ("to", "2024-01-31"),
        ]))
        .unwrap();

        assert_eq!(filter.search.as_deref(), Some("nda"));
        assert_eq!(filter.status, Some(DocumentStatus::Completed));
        assert_eq!(filter.risk_level, Some(RiskLevel::High));
        assert_eq!(filter.from.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(
            filter.to.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()
                + chrono::Duration::microseconds(999_999)
        );
    }

    #[test]
    fn timestamps_keep_their_offset() {
        let filter = DocumentFilter::try_from(query(&[("from", "2024-03-01T10:00:00+02:00")])).unwrap();
        assert_eq!(filter.from, Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()));
    }

    #[test]
    fn unknown_filter_values_are_rejected() {
        for pairs in [
            [("status", "archived")],
            [("risk_level", "extreme")],
            [("from", "last week")],
        ] {
            assert!(matches!(
                DocumentFilter::try_from(query(&pairs)),
                Err(ApiError::Validation(_))
            ));
        }
        assert_eq!(
            DocumentFilter::try_from(query(&[("status", " ")])).unwrap(),
            DocumentFilter::default()
        );
    }
}
