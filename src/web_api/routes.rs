//! API Routes

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;

use crate::capture::{mjpeg_part, MJPEG_CONTENT_TYPE};
use crate::error::Result;
use crate::event_log_service::EventKind;
use crate::models::{ApiResponse, CameraRequest, FpsRequest, ResolutionRequest};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Viewer page & health
        .route("/", get(index))
        .route("/healthz", get(super::health_check))
        // Stream & frames
        .route("/video_feed", get(video_feed))
        .route("/snapshot.jpg", get(get_snapshot))
        // Status
        .route("/status", get(get_status))
        // Control
        .route("/control/pause", post(pause_capture))
        .route("/control/resume", post(resume_capture))
        .route("/control/resolution", post(set_resolution))
        .route("/control/fps", post(set_fps))
        .route("/control/camera", post(set_camera))
        // Events
        .route("/events", get(list_events))
        .with_state(state)
}

// ========================================
// Stream Handlers
// ========================================

async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

/// MJPEG stream: one multipart part per published frame.
/// Slow clients skip frames; only the latest frame is ever sent.
async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let mut frames = state.capture.subscribe();

    let stream = async_stream::stream! {
        let mut last_id = 0u32;
        // Deliver the frame already in the channel before waiting
        let current = frames.borrow_and_update().clone();
        if let Some(frame) = current {
            last_id = frame.frame_id;
            yield Ok::<Bytes, Infallible>(mjpeg_part(&frame));
        }
        loop {
            if frames.changed().await.is_err() {
                break;
            }
            let frame = frames.borrow_and_update().clone();
            if let Some(frame) = frame {
                if frame.frame_id != last_id {
                    last_id = frame.frame_id;
                    yield Ok(mjpeg_part(&frame));
                }
            }
        }
    };

    (
        [
            (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        ],
        Body::from_stream(stream),
    )
}

async fn get_snapshot(State(state): State<AppState>) -> Response {
    match state.capture.snapshot() {
        Some(frame) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/jpeg"),
                (
                    header::CACHE_CONTROL,
                    "no-cache, no-store, must-revalidate",
                ),
            ],
            frame.jpeg.clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "No frame captured yet",
                "hint": "Capture may still be starting, or is paused"
            })),
        )
            .into_response(),
    }
}

// ========================================
// Status Handlers
// ========================================

async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.capture.status())
}

// ========================================
// Control Handlers
// ========================================

async fn pause_capture(State(state): State<AppState>) -> impl IntoResponse {
    state.capture.set_paused(true);
    state
        .event_log
        .record(EventKind::Paused, "capture paused")
        .await;
    Json(json!({"status": "paused"}))
}

async fn resume_capture(State(state): State<AppState>) -> impl IntoResponse {
    state.capture.set_paused(false);
    state
        .event_log
        .record(EventKind::Resumed, "capture resumed")
        .await;
    Json(json!({"status": "resumed"}))
}

async fn set_resolution(
    State(state): State<AppState>,
    Json(req): Json<ResolutionRequest>,
) -> Result<impl IntoResponse> {
    state.capture.set_resolution(req.width, req.height)?;
    state
        .event_log
        .record(
            EventKind::ResolutionChanged,
            format!("{}x{}", req.width, req.height),
        )
        .await;
    Ok(Json(json!({"width": req.width, "height": req.height})))
}

async fn set_fps(
    State(state): State<AppState>,
    Json(req): Json<FpsRequest>,
) -> impl IntoResponse {
    state.capture.set_fps(req.fps);
    state
        .event_log
        .record(EventKind::FpsChanged, format!("fps {}", req.fps))
        .await;
    Json(json!({"fps": req.fps}))
}

async fn set_camera(
    State(state): State<AppState>,
    Json(req): Json<CameraRequest>,
) -> Result<impl IntoResponse> {
    state.capture.set_camera_index(req.index)?;
    state
        .event_log
        .record(EventKind::CameraSwitched, format!("camera {}", req.index))
        .await;
    Ok(Json(json!({"index": req.index})))
}

// ========================================
// Event Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct EventsQuery {
    count: Option<usize>,
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let count = query.count.unwrap_or(50);
    let events = state.event_log.get_latest(count).await;
    Json(ApiResponse::success(events))
}
