//! Shared models and types for the capture server
//!
//! This module contains types shared across multiple modules
//! to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub capturing: bool,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

/// Frame resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Capture status reported by `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureStatus {
    pub frame_id: u32,
    pub paused: bool,
    pub fps: u32,
    pub resolution: Resolution,
    pub jpeg_size: u32,
}

/// Body of `POST /control/resolution`
#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionRequest {
    pub width: u32,
    pub height: u32,
}

/// Body of `POST /control/fps`
#[derive(Debug, Clone, Deserialize)]
pub struct FpsRequest {
    pub fps: u32,
}

/// Body of `POST /control/camera`
#[derive(Debug, Clone, Deserialize)]
pub struct CameraRequest {
    pub index: i32,
}
