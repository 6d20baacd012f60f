//! Shared fixtures for the API integration tests: an `AppState` wired to the
//! in-memory adapters, plus request builders.
#![allow(dead_code)]

use api_lib::config::Config;
use api_lib::web::{self, AppState};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use legal_lens_core::domain::{Document, NewDocument};
use legal_lens_core::ports::DatabaseService;
use legal_lens_core::testing::{
    sample_payload, InMemoryDatabase, InMemoryStorage, StaticIdentity, StubAnalyzer,
    StubExtractor,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const TOKEN: &str = "owner-token";
pub const OTHER_TOKEN: &str = "other-token";
pub const CONTRACT_TEXT: &str = "This Non-Disclosure Agreement is entered into by the parties.";
const BOUNDARY: &str = "legal-lens-test-boundary";

pub struct Harness {
    pub db: Arc<InMemoryDatabase>,
    pub storage: Arc<InMemoryStorage>,
    pub extractor: Arc<StubExtractor>,
    pub analyzer: Arc<StubAnalyzer>,
    pub state: Arc<AppState>,
    pub user_id: Uuid,
    pub other_user_id: Uuid,
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused/lens".to_string()),
        "PUBLIC_BASE_URL" => Some("https://lens.example.com".to_string()),
        "APP_ENV" => Some("test".to_string()),
        _ => None,
    })
    .expect("test config")
}

impl Harness {
    pub fn new() -> Self {
        Self::with(
            StubExtractor::returning(CONTRACT_TEXT),
            StubAnalyzer::returning(sample_payload()),
        )
    }

    pub fn with(extractor: StubExtractor, analyzer: StubAnalyzer) -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        let storage = Arc::new(InMemoryStorage::new());
        let extractor = Arc::new(extractor);
        let analyzer = Arc::new(analyzer);
        let user_id = Uuid::new_v4();
        let other_user_id = Uuid::new_v4();
        let identity = StaticIdentity::default()
            .with_token(TOKEN, user_id)
            .with_token(OTHER_TOKEN, other_user_id);

        let state = Arc::new(AppState::new(
            Arc::new(test_config()),
            db.clone(),
            storage.clone(),
            extractor.clone(),
            analyzer.clone(),
            Arc::new(identity),
        ));

        Self {
            db,
            storage,
            extractor,
            analyzer,
            state,
            user_id,
            other_user_id,
        }
    }

    pub fn app(&self) -> Router {
        web::router(self.state.clone())
    }

    pub async fn seed_document(&self, title: &str) -> Document {
        self.db
            .create_document(NewDocument {
                user_id: self.user_id,
                title: title.to_string(),
                file_path: None,
            })
            .await
            .expect("seed document")
    }

    /// Sends a request through the router and returns the status and JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app().oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// Waits for background jobs to drain.
    pub async fn settle(&self) {
        for _ in 0..200 {
            if self.state.jobs.in_flight() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("background jobs did not finish");
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

pub fn delete_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("request")
}

/// A multipart upload with one file part and optional text fields.
pub fn upload_request(
    token: &str,
    file_name: &str,
    content_type: &str,
    contents: &[u8],
    fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/documents")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("request")
}
