//! File intake: validation of uploaded files and object store key layout.

use crate::domain::UploadedFile;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const PDF_MIME: &str = "application/pdf";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Bucket holding original uploads.
pub const DOCUMENTS_BUCKET: &str = "documents";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Invalid file type. Only PDF files are supported.")]
    UnsupportedType(String),
    #[error("File size exceeds {limit_mb}MB limit.")]
    TooLarge { size: u64, limit_mb: u64 },
}

/// Files that passed validation, plus one message per rejected file.
#[derive(Debug, Default)]
pub struct IntakeBatch {
    pub accepted: Vec<UploadedFile>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IntakePolicy {
    pub accepted_types: Vec<String>,
    pub max_bytes: u64,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            accepted_types: vec![PDF_MIME.to_string()],
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl IntakePolicy {
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn validate(&self, file: &UploadedFile) -> Result<(), IntakeError> {
        let mime = file
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !self.accepted_types.iter().any(|t| *t == mime) {
            return Err(IntakeError::UnsupportedType(file.content_type.clone()));
        }
        if file.size() > self.max_bytes {
            return Err(IntakeError::TooLarge {
                size: file.size(),
                limit_mb: self.max_bytes / (1024 * 1024),
            });
        }
        Ok(())
    }

    /// Validates every file independently; rejected files never reach `accepted`.
    pub fn validate_batch(&self, files: Vec<UploadedFile>) -> IntakeBatch {
        let mut batch = IntakeBatch::default();
        for file in files {
            match self.validate(&file) {
                Ok(()) => batch.accepted.push(file),
                Err(e) => batch.errors.push(format!("{}: {}", file.file_name, e)),
            }
        }
        batch
    }
}

/// Object store key for an original upload: `{user}/{millis}-{user}.{ext}`.
pub fn storage_key(user_id: Uuid, now: DateTime<Utc>, file: &UploadedFile) -> String {
    format!(
        "{}/{}-{}.{}",
        user_id,
        now.timestamp_millis(),
        user_id,
        file.extension()
    )
}
