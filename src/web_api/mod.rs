//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Request validation
//! - Response formatting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.system_health.read().await;
    let uptime = chrono::Utc::now() - state.started_at;
    let status = if health.overloaded { "overloaded" } else { "ok" };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: uptime.num_seconds().max(0) as u64,
        capturing: state.capture.is_capturing(),
        cpu_percent: health.cpu_percent,
        memory_percent: health.memory_percent,
    };

    Json(response)
}
