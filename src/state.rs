//! Application state
//!
//! Holds all shared components and state

use crate::capture::{CaptureBackend, CaptureService};
use crate::event_log_service::EventLogService;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Camera index to open at startup (maps to /dev/video{N})
    pub camera_index: i32,
    /// Initial capture width
    pub width: u32,
    /// Initial capture height
    pub height: u32,
    /// Initial capture frame rate
    pub fps: u32,
    /// JPEG encode quality (1-100)
    pub jpeg_quality: u8,
    /// Upper bound for a single encoded frame
    pub max_frame_bytes: usize,
    /// Capture backend selection
    pub backend: CaptureBackend,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            camera_index: std::env::var("CAMERA_INDEX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            width: std::env::var("CAPTURE_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(640),
            height: std::env::var("CAPTURE_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(480),
            fps: std::env::var("CAPTURE_FPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            jpeg_quality: std::env::var("JPEG_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(80),
            max_frame_bytes: std::env::var("MAX_FRAME_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            backend: std::env::var("CAPTURE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Capture engine
    pub capture: Arc<CaptureService>,
    /// Control event log (ring buffer)
    pub event_log: Arc<EventLogService>,
    /// System health status
    pub system_health: Arc<RwLock<SystemHealth>>,
    /// Server start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// System health metrics
#[derive(Debug, Clone, Default)]
pub struct SystemHealth {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub overloaded: bool,
    pub last_overload_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl SystemHealth {
    /// Check and update overload status
    pub fn update(&mut self, cpu: f32, memory: f32) {
        self.cpu_percent = cpu;
        self.memory_percent = memory;

        if cpu > 85.0 || memory > 90.0 {
            self.overloaded = true;
            self.last_overload_at = Some(chrono::Utc::now());
        } else if self.overloaded {
            // Recovery with hysteresis
            if let Some(last) = self.last_overload_at {
                let elapsed = chrono::Utc::now() - last;
                if elapsed > chrono::Duration::seconds(60) && cpu < 60.0 && memory < 70.0 {
                    self.overloaded = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_triggers() {
        let mut health = SystemHealth::default();
        health.update(90.0, 50.0);
        assert!(health.overloaded);
        assert!(health.last_overload_at.is_some());
    }

    #[test]
    fn test_recovery_needs_hysteresis_window() {
        let mut health = SystemHealth::default();
        health.update(90.0, 50.0);
        // Immediately back below thresholds: still overloaded (60s window)
        health.update(10.0, 10.0);
        assert!(health.overloaded);
    }

    #[test]
    fn test_recovery_after_window() {
        let mut health = SystemHealth::default();
        health.update(90.0, 50.0);
        health.last_overload_at =
            Some(chrono::Utc::now() - chrono::Duration::seconds(120));
        health.update(10.0, 10.0);
        assert!(!health.overloaded);
    }
}
