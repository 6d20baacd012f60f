//! The HTTP adapters for extraction, analysis and identity, exercised against
//! a small local stand-in for the hosted services.

use api_lib::adapters::{
    HttpAnalysisAdapter, HttpExtractionAdapter, HttpIdentityAdapter, ServiceCredentials,
};
use axum::{
    extract::Multipart,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use legal_lens_core::extraction::{extract_or_placeholder, EXTRACTION_FAILED_PLACEHOLDER};
use legal_lens_core::ports::{AnalysisService, IdentityService, PortError, TextExtractionService};
use legal_lens_core::{RiskLevel, UploadedFile};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

const USER_ID: &str = "7d1f6a52-3c1e-4f0b-9a57-1f2e3d4c5b6a";

fn authorised(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer service-token")
        && headers.get("api-key").and_then(|v| v.to_str().ok()) == Some("service-key")
}

async fn extract(headers: HeaderMap, mut multipart: Multipart) -> impl IntoResponse {
    if !authorised(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "denied" })));
    }
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.unwrap_or_default();
            let text = format!("extracted {} bytes", bytes.len());
            return (StatusCode::OK, Json(json!({ "extracted_text": text })));
        }
    }
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "no file" })))
}

async fn analyze(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if !authorised(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "denied" })));
    }
    let text = body["legal_text"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "full_summary": format!("Reviewed: {}", text),
            "risk_score": 35,
            "key_findings": [{
                "title": "Unlimited liability",
                "description": "No cap on damages.",
                "risk_level": "high risk"
            }],
            "legal_questions": ["Can liability be capped?"]
        })),
    )
}

async fn user(headers: HeaderMap) -> impl IntoResponse {
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    if bearer == Some("Bearer user-token") && apikey == Some("anon-key") {
        (StatusCode::OK, Json(json!({ "id": USER_ID, "email": "a@example.com" })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "invalid JWT" })))
    }
}

async fn failing() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn upstream() -> String {
    let app = Router::new()
        .route("/extract-text", post(extract))
        .route("/analyze", post(analyze))
        .route("/broken", post(failing))
        .route("/auth/v1/user", get(user));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn credentials() -> ServiceCredentials {
    ServiceCredentials {
        bearer_token: Some("service-token".to_string()),
        api_key: Some("service-key".to_string()),
    }
}

fn pdf() -> UploadedFile {
    UploadedFile {
        file_name: "nda.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        contents: Bytes::from_static(b"%PDF-1.4 twelve"),
    }
}

#[tokio::test]
async fn extraction_sends_file_with_credentials() {
    let base = upstream().await;
    let adapter = HttpExtractionAdapter::new(
        format!("{}/extract-text", base),
        credentials(),
        Duration::from_secs(5),
    )
    .unwrap();

    let text = adapter.extract_text(&pdf()).await.unwrap();
    assert_eq!(text, "extracted 15 bytes");
}

#[tokio::test]
async fn extraction_server_error_degrades_to_placeholder() {
    let base = upstream().await;
    let adapter = HttpExtractionAdapter::new(
        format!("{}/broken", base),
        credentials(),
        Duration::from_secs(5),
    )
    .unwrap();

    assert!(matches!(adapter.extract_text(&pdf()).await, Err(PortError::Upstream(_))));
    let extracted = extract_or_placeholder(&adapter, &pdf()).await;
    assert!(extracted.degraded);
    assert_eq!(extracted.text, EXTRACTION_FAILED_PLACEHOLDER);
}

#[tokio::test]
async fn analysis_response_is_normalised() {
    let base = upstream().await;
    let adapter = HttpAnalysisAdapter::new(
        format!("{}/analyze", base),
        credentials(),
        Duration::from_secs(5),
    )
    .unwrap();

    let payload = adapter.analyze("Clause 1").await.unwrap();
    assert_eq!(payload.summary, "Reviewed: Clause 1");
    assert_eq!(payload.findings.len(), 1);
    assert_eq!(payload.findings[0].risk_level, RiskLevel::High);
    assert_eq!(payload.questions, vec!["Can liability be capped?".to_string()]);
}

#[tokio::test]
async fn analysis_without_credentials_is_an_upstream_error() {
    let base = upstream().await;
    let adapter = HttpAnalysisAdapter::new(
        format!("{}/analyze", base),
        ServiceCredentials::default(),
        Duration::from_secs(5),
    )
    .unwrap();

    assert!(matches!(adapter.analyze("x").await, Err(PortError::Upstream(_))));
}

#[tokio::test]
async fn identity_resolves_user_or_rejects_token() {
    let base = upstream().await;
    let adapter = HttpIdentityAdapter::new(&base, Some("anon-key".to_string())).unwrap();

    let user_id = adapter.verify_bearer("user-token").await.unwrap();
    assert_eq!(user_id, Uuid::parse_str(USER_ID).unwrap());
    assert!(matches!(
        adapter.verify_bearer("expired").await,
        Err(PortError::Unauthorized)
    ));
}
