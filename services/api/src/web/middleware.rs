//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use legal_lens_core::ports::PortError;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

/// The caller's identity, inserted into request extensions by `require_bearer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Middleware that verifies the `Authorization: Bearer` credential with the
/// identity backend.
///
/// If valid, inserts an `AuthenticatedUser` into request extensions for
/// handlers to use. If missing or rejected, returns 401 before any handler runs.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?;

    let user_id = state.identity.verify_bearer(&token).await.map_err(|e| match e {
        PortError::Unauthorized => ApiError::Unauthorized("Invalid authentication".to_string()),
        other => {
            warn!(error = %other, "could not verify bearer token");
            ApiError::Unauthorized("Authentication failed".to_string())
        }
    })?;

    req.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(req).await)
}
