//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use legal_lens_core::ports::PortError;
use legal_lens_core::{DispatchError, UploadError};
use serde::Serialize;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while running the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a failure to build one of the outbound HTTP clients.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a failure while encoding a PDF report.
    #[error("Report error: {0}")]
    Report(#[from] crate::report::ReportError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was malformed or failed validation.
    #[error("{0}")]
    Validation(String),

    /// The request carried no valid bearer credential.
    #[error("{0}")]
    Unauthorized(String),

    /// The requested resource does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// The request clashes with work already in progress.
    #[error("{0}")]
    Conflict(String),

    /// An external service answered with an error.
    #[error("{0}")]
    Upstream(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Port(e) => match e {
                PortError::NotFound(_) => StatusCode::NOT_FOUND,
                PortError::Unauthorized => StatusCode::UNAUTHORIZED,
                PortError::Conflict { .. } => StatusCode::CONFLICT,
                PortError::Upstream(_) => StatusCode::BAD_GATEWAY,
                PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message and optional detail shown to the client. Internal failures
    /// are logged in full but only summarised in the response.
    fn public_parts(&self) -> (String, Option<String>) {
        match self {
            ApiError::Validation(m)
            | ApiError::Unauthorized(m)
            | ApiError::NotFound(m)
            | ApiError::Upstream(m) => (m.clone(), None),
            ApiError::Port(PortError::NotFound(m)) => (m.clone(), None),
            ApiError::Port(PortError::Unauthorized) => ("Unauthorized".to_string(), None),
            ApiError::Port(e @ PortError::Conflict { .. }) => (e.to_string(), None),
            ApiError::Conflict(m) => (m.clone(), None),
            ApiError::Port(PortError::Upstream(m)) => {
                ("Upstream service error".to_string(), Some(m.clone()))
            }
            _ => ("Internal server error".to_string(), None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let (error, details) = self.public_parts();
        let body = ErrorBody {
            success: false,
            error,
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Validation(m) => ApiError::Validation(m),
            DispatchError::Rejected(e) => ApiError::Port(e),
            DispatchError::Upstream(e) => ApiError::Upstream(format!("Analysis failed: {}", e)),
            DispatchError::Persistence(PortError::Conflict { expected, actual }) => {
                ApiError::Port(PortError::Conflict { expected, actual })
            }
            DispatchError::Persistence(e) => {
                ApiError::Internal(format!("Failed to save analysis result: {}", e))
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Invalid(e) => ApiError::Validation(e.to_string()),
            UploadError::Storage(e) | UploadError::Record(e) => ApiError::Port(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_lens_core::DocumentStatus;

    #[test]
    fn port_errors_map_to_http_statuses() {
        let cases = [
            (ApiError::Port(PortError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (ApiError::Port(PortError::Unauthorized), StatusCode::UNAUTHORIZED),
            (
                ApiError::Port(PortError::Conflict {
                    expected: DocumentStatus::Processing,
                    actual: DocumentStatus::Failed,
                }),
                StatusCode::CONFLICT,
            ),
            (ApiError::Port(PortError::Unexpected("db".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::Validation("bad".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn rejected_dispatches_keep_their_status() {
        let conflict: ApiError = DispatchError::Rejected(PortError::Conflict {
            expected: DocumentStatus::Processing,
            actual: DocumentStatus::Completed,
        })
        .into();
        let missing: ApiError = DispatchError::Rejected(PortError::NotFound("gone".into())).into();

        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_details_stay_private() {
        let (message, details) =
            ApiError::Internal("password=hunter2".to_string()).public_parts();
        assert_eq!(message, "Internal server error");
        assert!(details.is_none());
    }
}
