//! Capture control block
//!
//! Lock-free state shared between the capture worker and the API layer:
//! frame counter, latest JPEG size, pause flag, requested resolution,
//! frame interval and camera index. All fields are plain atomics so both
//! sides can read and write without coordination.

use crate::models::Resolution;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

/// Default capture width
pub const DEFAULT_WIDTH: u32 = 640;
/// Default capture height
pub const DEFAULT_HEIGHT: u32 = 480;
/// Default frame interval (~30 fps)
pub const DEFAULT_INTERVAL_MS: u32 = 33;

/// Shared control state
#[derive(Debug)]
pub struct ControlBlock {
    frame_id: AtomicU32,
    jpeg_size: AtomicU32,
    paused: AtomicBool,
    width: AtomicU32,
    height: AtomicU32,
    interval_ms: AtomicU32,
    camera_index: AtomicI32,
}

impl ControlBlock {
    /// Create a control block for the given camera index
    pub fn new(camera_index: i32) -> Self {
        Self {
            frame_id: AtomicU32::new(0),
            jpeg_size: AtomicU32::new(0),
            paused: AtomicBool::new(false),
            width: AtomicU32::new(DEFAULT_WIDTH),
            height: AtomicU32::new(DEFAULT_HEIGHT),
            interval_ms: AtomicU32::new(DEFAULT_INTERVAL_MS),
            camera_index: AtomicI32::new(camera_index),
        }
    }

    /// Reset to defaults for a fresh capture run
    pub fn reset(&self, camera_index: i32) {
        self.frame_id.store(0, Ordering::SeqCst);
        self.jpeg_size.store(0, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.width.store(DEFAULT_WIDTH, Ordering::SeqCst);
        self.height.store(DEFAULT_HEIGHT, Ordering::SeqCst);
        self.interval_ms.store(DEFAULT_INTERVAL_MS, Ordering::SeqCst);
        self.camera_index.store(camera_index, Ordering::SeqCst);
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id.load(Ordering::SeqCst)
    }

    pub fn jpeg_size(&self) -> u32 {
        self.jpeg_size.load(Ordering::SeqCst)
    }

    /// Record a published frame, returning the new frame id
    pub fn record_frame(&self, jpeg_size: u32) -> u32 {
        self.jpeg_size.store(jpeg_size, Ordering::SeqCst);
        self.frame_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width.load(Ordering::SeqCst),
            height: self.height.load(Ordering::SeqCst),
        }
    }

    pub fn set_resolution(&self, width: u32, height: u32) {
        self.width.store(width, Ordering::SeqCst);
        self.height.store(height, Ordering::SeqCst);
    }

    /// Requested frame rate, derived from the stored interval.
    /// An interval of 0 (fps set above 1000) reports the 30 fps default.
    pub fn fps(&self) -> u32 {
        let interval = self.interval_ms.load(Ordering::SeqCst);
        if interval == 0 {
            return 30;
        }
        1000 / interval
    }

    /// Store a frame rate as an interval. 0 is coerced to 30 fps.
    pub fn set_fps(&self, fps: u32) {
        let fps = if fps == 0 { 30 } else { fps };
        self.interval_ms.store(1000 / fps, Ordering::SeqCst);
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms.load(Ordering::SeqCst)
    }

    pub fn camera_index(&self) -> i32 {
        self.camera_index.load(Ordering::SeqCst)
    }

    pub fn set_camera_index(&self, index: i32) {
        self.camera_index.store(index, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctrl = ControlBlock::new(2);
        assert_eq!(ctrl.frame_id(), 0);
        assert_eq!(ctrl.jpeg_size(), 0);
        assert!(!ctrl.paused());
        assert_eq!(ctrl.resolution().width, 640);
        assert_eq!(ctrl.resolution().height, 480);
        assert_eq!(ctrl.interval_ms(), 33);
        assert_eq!(ctrl.camera_index(), 2);
    }

    #[test]
    fn test_fps_roundtrip() {
        let ctrl = ControlBlock::new(0);
        ctrl.set_fps(25);
        assert_eq!(ctrl.interval_ms(), 40);
        assert_eq!(ctrl.fps(), 25);
    }

    #[test]
    fn test_fps_zero_coerced_to_30() {
        let ctrl = ControlBlock::new(0);
        ctrl.set_fps(0);
        assert_eq!(ctrl.interval_ms(), 33);
        assert_eq!(ctrl.fps(), 30);
    }

    #[test]
    fn test_fps_above_1000_reports_default() {
        let ctrl = ControlBlock::new(0);
        ctrl.set_fps(2000);
        assert_eq!(ctrl.interval_ms(), 0);
        assert_eq!(ctrl.fps(), 30);
    }

    #[test]
    fn test_record_frame_increments() {
        let ctrl = ControlBlock::new(0);
        assert_eq!(ctrl.record_frame(1234), 1);
        assert_eq!(ctrl.record_frame(5678), 2);
        assert_eq!(ctrl.frame_id(), 2);
        assert_eq!(ctrl.jpeg_size(), 5678);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let ctrl = ControlBlock::new(0);
        ctrl.set_paused(true);
        ctrl.set_resolution(1920, 1080);
        ctrl.set_fps(60);
        ctrl.record_frame(100);
        ctrl.reset(3);
        assert_eq!(ctrl.frame_id(), 0);
        assert!(!ctrl.paused());
        assert_eq!(ctrl.resolution().width, 640);
        assert_eq!(ctrl.interval_ms(), 33);
        assert_eq!(ctrl.camera_index(), 3);
    }
}
