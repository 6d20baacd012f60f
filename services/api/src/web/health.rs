//! services/api/src/web/health.rs

use crate::web::models::PingResponse;
use crate::web::state::AppState;
use axum::{extract::State, response::Json};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Liveness probe with uptime and environment.
#[utoipa::path(
    get,
    path = "/ping",
    responses((status = 200, description = "Service is up", body = PingResponse))
)]
pub async fn ping_handler(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    let received = Instant::now();
    let uptime = state.started_at.elapsed().as_secs();
    Json(PingResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        latency: received.elapsed().as_millis() as u64,
        uptime,
        environment: state.config.environment.clone(),
    })
}
