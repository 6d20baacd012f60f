//! services/api/src/adapters/external.rs
//!
//! HTTP adapters for the hosted document service: text extraction and legal
//! analysis. Both endpoints share the same pair of credential headers.

use async_trait::async_trait;
use legal_lens_core::domain::{AnalysisPayload, UploadedFile};
use legal_lens_core::ports::{AnalysisService, PortError, PortResult, TextExtractionService};
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Credentials sent with every request to the document service.
#[derive(Clone, Debug, Default)]
pub struct ServiceCredentials {
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
}

impl ServiceCredentials {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Turns transport failures and non-success statuses into `PortError::Upstream`.
async fn check_response(
    result: Result<Response, reqwest::Error>,
    service: &str,
) -> PortResult<Response> {
    let response = result.map_err(|e| {
        error!(service, error = %e, "request failed");
        PortError::Upstream(format!("{} unreachable: {}", service, e))
    })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(service, %status, body = %body, "service returned an error");
    Err(PortError::Upstream(format!("{} returned HTTP {}", service, status)))
}

//=========================================================================================
// Text Extraction
//=========================================================================================

#[derive(Clone)]
pub struct HttpExtractionAdapter {
    client: Client,
    url: String,
    credentials: ServiceCredentials,
}

#[derive(Deserialize)]
struct ExtractionResponse {
    #[serde(default)]
    extracted_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl HttpExtractionAdapter {
    pub fn new(
        url: impl Into<String>,
        credentials: ServiceCredentials,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            credentials,
        })
    }
}

#[async_trait]
impl TextExtractionService for HttpExtractionAdapter {
    async fn extract_text(&self, file: &UploadedFile) -> PortResult<String> {
        let part = multipart::Part::bytes(file.contents.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        debug!(file = %file.file_name, size = file.size(), "sending file for text extraction");
        let request = self
            .credentials
            .apply(self.client.post(&self.url))
            .multipart(form);
        let response = check_response(request.send().await, "extraction service").await?;

        let body: ExtractionResponse = response
            .json()
            .await
            .map_err(|e| PortError::Upstream(format!("invalid extraction response: {}", e)))?;
        Ok(body.extracted_text.or(body.text).unwrap_or_default())
    }
}

//=========================================================================================
// Legal Analysis
//=========================================================================================

#[derive(Clone)]
pub struct HttpAnalysisAdapter {
    client: Client,
    url: String,
    credentials: ServiceCredentials,
}

#[derive(Serialize)]
struct AnalysisRequest<'a> {
    legal_text: &'a str,
}

impl HttpAnalysisAdapter {
    pub fn new(
        url: impl Into<String>,
        credentials: ServiceCredentials,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            credentials,
        })
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisAdapter {
    async fn analyze(&self, legal_text: &str) -> PortResult<AnalysisPayload> {
        let request = self
            .credentials
            .apply(self.client.post(&self.url))
            .json(&AnalysisRequest { legal_text });
        let response = check_response(request.send().await, "analysis service").await?;

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PortError::Upstream(format!("invalid analysis response: {}", e)))?;
        Ok(AnalysisPayload::from_json(&raw))
    }
}
