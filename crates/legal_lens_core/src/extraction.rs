//! Soft-failure policy around the external text extraction service.

use crate::domain::UploadedFile;
use crate::ports::TextExtractionService;
use tracing::warn;

pub const EXTRACTION_FAILED_PLACEHOLDER: &str = "[PDF text extraction failed]";
pub const NO_TEXT_PLACEHOLDER: &str = "[No text could be extracted from this PDF]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Set when `text` is a placeholder rather than the document's contents.
    pub degraded: bool,
}

/// Extracts text, substituting a placeholder instead of failing so the
/// pipeline can still run an analysis on degraded input.
pub async fn extract_or_placeholder(
    service: &dyn TextExtractionService,
    file: &UploadedFile,
) -> ExtractedText {
    match service.extract_text(file).await {
        Ok(text) if !text.trim().is_empty() => ExtractedText {
            text,
            degraded: false,
        },
        Ok(_) => {
            warn!(file = %file.file_name, "extraction returned no text");
            ExtractedText {
                text: NO_TEXT_PLACEHOLDER.to_string(),
                degraded: true,
            }
        }
        Err(e) => {
            warn!(file = %file.file_name, error = %e, "text extraction failed");
            ExtractedText {
                text: EXTRACTION_FAILED_PLACEHOLDER.to_string(),
                degraded: true,
            }
        }
    }
}
