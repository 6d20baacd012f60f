//! services/api/src/client.rs
//!
//! A typed HTTP client for the Legal Lens API. Its main job is the
//! upload-then-wait flow: submit a PDF, then poll the document until the
//! background analysis settles.

use crate::web::models::{DocumentDetail, UploadAccepted};
use legal_lens_core::{DocumentStatus, PollOutcome, PortError, PortResult, StatusPoller};
use reqwest::{multipart, Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Analysis of document {0} failed")]
    AnalysisFailed(Uuid),
    #[error("Analysis of document {document_id} did not finish after {attempts} status checks")]
    TimedOut { document_id: Uuid, attempts: u32 },
}

#[derive(Clone)]
pub struct LegalLensClient {
    http: Client,
    base_url: String,
    token: String,
}

impl LegalLensClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::builder().timeout(Duration::from_secs(30)).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    async fn checked(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Uploads a PDF. Analysis starts on the server once this returns.
    pub async fn upload(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        title: Option<&str>,
        auto_delete: bool,
    ) -> Result<UploadAccepted, ClientError> {
        let part = multipart::Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str(legal_lens_core::intake::PDF_MIME)?;
        let mut form = multipart::Form::new()
            .part("file", part)
            .text("auto_delete", auto_delete.to_string());
        if let Some(title) = title {
            form = form.text("title", title.to_string());
        }

        let url = format!("{}/documents", self.base_url);
        let response = self.request(self.http.post(url)).multipart(form).send().await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    pub async fn document(&self, document_id: Uuid) -> Result<DocumentDetail, ClientError> {
        let url = format!("{}/documents/{}", self.base_url, document_id);
        let response = self.request(self.http.get(url)).send().await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    /// The document's current status, in the shape the poller consumes.
    pub async fn document_status(&self, document_id: Uuid) -> PortResult<DocumentStatus> {
        let detail = self
            .document(document_id)
            .await
            .map_err(|e| PortError::Upstream(e.to_string()))?;
        detail
            .document
            .status
            .parse::<DocumentStatus>()
            .map_err(PortError::Unexpected)
    }

    /// Polls until the document is `completed` or `failed`, then returns the
    /// document with its analysis.
    pub async fn wait_for_analysis(
        &self,
        document_id: Uuid,
        poller: &StatusPoller,
    ) -> Result<DocumentDetail, ClientError> {
        let outcome = poller
            .wait_for_terminal(|| self.document_status(document_id))
            .await;
        match outcome {
            PollOutcome::Completed { attempts } => {
                info!(%document_id, attempts, "analysis completed");
                self.document(document_id).await
            }
            PollOutcome::Failed { .. } => {
                warn!(%document_id, "analysis failed");
                Err(ClientError::AnalysisFailed(document_id))
            }
            PollOutcome::TimedOut { attempts } => Err(ClientError::TimedOut {
                document_id,
                attempts,
            }),
        }
    }
}
