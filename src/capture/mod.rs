//! Capture engine
//!
//! ## Responsibilities
//!
//! - Own the capture worker thread and the shared control block
//! - Publish encoded JPEG frames to consumers over a watch channel
//! - Expose runtime control: pause/resume, resolution, fps, camera switch

mod control;
mod frame;
mod source;
#[cfg(feature = "v4l2")]
mod v4l2;
mod worker;

pub use control::ControlBlock;
pub use frame::{mjpeg_part, FrameData, MJPEG_CONTENT_TYPE};
pub use source::CaptureBackend;

use crate::error::{Error, Result};
use crate::models::{CaptureStatus, Resolution};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::watch;
use worker::WorkerOptions;

/// Largest accepted width or height
const MAX_DIMENSION: u32 = 8192;

/// State shared between the service and the worker thread
pub(crate) struct CaptureShared {
    pub(crate) control: ControlBlock,
    running: AtomicBool,
    ready: AtomicBool,
}

impl CaptureShared {
    fn new(camera_index: i32) -> Self {
        Self {
            control: ControlBlock::new(camera_index),
            running: AtomicBool::new(false),
            ready: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Called by a backend once a device is delivering
    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Capture service configuration
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub backend: CaptureBackend,
    pub jpeg_quality: u8,
    pub max_frame_bytes: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            backend: CaptureBackend::default(),
            jpeg_quality: 80,
            max_frame_bytes: 10 * 1024 * 1024,
        }
    }
}

/// CaptureService instance
pub struct CaptureService {
    shared: Arc<CaptureShared>,
    options: CaptureOptions,
    frames_tx: watch::Sender<Option<Arc<FrameData>>>,
    frames_rx: watch::Receiver<Option<Arc<FrameData>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureService {
    /// Create a service for the given camera index. No worker is spawned
    /// until `initialize` or `start` is called.
    pub fn new(camera_index: i32, options: CaptureOptions) -> Self {
        let (frames_tx, frames_rx) = watch::channel(None);
        Self {
            shared: Arc::new(CaptureShared::new(camera_index)),
            options,
            frames_tx,
            frames_rx,
            worker: Mutex::new(None),
        }
    }

    /// Spawn the worker and wait for the device to come up: up to ten
    /// 100 ms probes before giving up and stopping the worker again.
    pub fn initialize(&self) -> Result<()> {
        self.start(self.shared.control.camera_index())?;

        for _ in 0..10 {
            if self.shared.is_ready() {
                tracing::info!(
                    backend = self.options.backend.as_str(),
                    camera_index = self.camera_index(),
                    "Capture initialized"
                );
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        self.stop();
        Err(Error::Capture(
            "capture device did not become ready".to_string(),
        ))
    }

    /// (Re)start the worker on a camera index. Any previous worker is
    /// stopped first and the control block is reset to defaults.
    pub fn start(&self, camera_index: i32) -> Result<()> {
        self.stop();

        self.shared.control.reset(camera_index);
        self.shared.ready.store(false, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let tx = self.frames_tx.clone();
        let backend = self.options.backend;
        let opts = WorkerOptions {
            jpeg_quality: self.options.jpeg_quality,
            max_frame_bytes: self.options.max_frame_bytes,
        };
        let handle = std::thread::Builder::new()
            .name("capture-worker".to_string())
            .spawn(move || worker::run(shared, tx, backend, opts))?;

        let mut guard = self.worker.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(handle);
        Ok(())
    }

    /// Stop the worker and wait for it to exit
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = {
            let mut guard = self.worker.lock().unwrap_or_else(|p| p.into_inner());
            guard.take()
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Capture worker panicked");
            }
        }
    }

    /// Whether a worker is currently running
    pub fn is_capturing(&self) -> bool {
        let guard = self.worker.lock().unwrap_or_else(|p| p.into_inner());
        self.shared.is_running() && guard.is_some()
    }

    pub fn set_paused(&self, paused: bool) {
        self.shared.control.set_paused(paused);
    }

    pub fn paused(&self) -> bool {
        self.shared.control.paused()
    }

    pub fn set_resolution(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::Validation(format!(
                "resolution {width}x{height} out of range (1-{MAX_DIMENSION})"
            )));
        }
        self.shared.control.set_resolution(width, height);
        Ok(())
    }

    pub fn resolution(&self) -> Resolution {
        self.shared.control.resolution()
    }

    pub fn set_fps(&self, fps: u32) {
        self.shared.control.set_fps(fps);
    }

    pub fn fps(&self) -> u32 {
        self.shared.control.fps()
    }

    pub fn set_camera_index(&self, index: i32) -> Result<()> {
        if index < 0 {
            return Err(Error::Validation(format!(
                "camera index must not be negative, got {index}"
            )));
        }
        self.shared.control.set_camera_index(index);
        Ok(())
    }

    pub fn camera_index(&self) -> i32 {
        self.shared.control.camera_index()
    }

    pub fn frame_id(&self) -> u32 {
        self.shared.control.frame_id()
    }

    /// Current state for `GET /status`
    pub fn status(&self) -> CaptureStatus {
        CaptureStatus {
            frame_id: self.shared.control.frame_id(),
            paused: self.shared.control.paused(),
            fps: self.shared.control.fps(),
            resolution: self.shared.control.resolution(),
            jpeg_size: self.shared.control.jpeg_size(),
        }
    }

    /// Latest published frame, if any
    pub fn snapshot(&self) -> Option<Arc<FrameData>> {
        self.frames_rx.borrow().clone()
    }

    /// Subscribe to frame publications
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<FrameData>>> {
        self.frames_rx.clone()
    }
}

impl Drop for CaptureService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn test_service() -> CaptureService {
        CaptureService::new(
            0,
            CaptureOptions {
                backend: CaptureBackend::TestPattern,
                ..CaptureOptions::default()
            },
        )
    }

    async fn wait_for_frame(svc: &CaptureService) -> Arc<FrameData> {
        let mut rx = svc.subscribe();
        if let Some(frame) = rx.borrow_and_update().clone() {
            return frame;
        }
        timeout(WAIT, rx.changed()).await.unwrap().unwrap();
        let frame = rx.borrow().clone().unwrap();
        frame
    }

    #[tokio::test]
    async fn test_initialize_produces_jpeg_frames() {
        let svc = test_service();
        svc.initialize().unwrap();
        assert!(svc.is_capturing());

        let frame = wait_for_frame(&svc).await;
        assert!(frame.frame_id >= 1);
        assert_eq!(&frame.jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert!(svc.status().jpeg_size > 0);

        svc.stop();
        assert!(!svc.is_capturing());
    }

    #[tokio::test]
    async fn test_pause_freezes_frame_id_and_resume_advances() {
        let svc = test_service();
        svc.initialize().unwrap();
        wait_for_frame(&svc).await;

        svc.set_paused(true);
        // Let a frame already past the pause check drain out
        tokio::time::sleep(Duration::from_millis(150)).await;
        let frozen = svc.frame_id();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(svc.frame_id(), frozen);

        svc.set_paused(false);
        let mut rx = svc.subscribe();
        rx.borrow_and_update();
        timeout(WAIT, rx.changed()).await.unwrap().unwrap();
        assert!(svc.frame_id() > frozen);

        svc.stop();
    }

    #[tokio::test]
    async fn test_resolution_change_applies_to_new_frames() {
        let svc = test_service();
        svc.initialize().unwrap();
        wait_for_frame(&svc).await;

        svc.set_resolution(320, 240).unwrap();
        let mut rx = svc.subscribe();
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            timeout(deadline - tokio::time::Instant::now(), rx.changed())
                .await
                .unwrap()
                .unwrap();
            let frame = rx.borrow_and_update().clone().unwrap();
            if frame.width == 320 && frame.height == 240 {
                break;
            }
        }

        svc.stop();
    }

    #[tokio::test]
    async fn test_camera_switch_keeps_frames_flowing() {
        let svc = test_service();
        svc.initialize().unwrap();
        wait_for_frame(&svc).await;

        svc.set_camera_index(1).unwrap();
        assert_eq!(svc.camera_index(), 1);

        let mut rx = svc.subscribe();
        rx.borrow_and_update();
        timeout(WAIT, rx.changed()).await.unwrap().unwrap();

        svc.stop();
    }

    #[tokio::test]
    async fn test_stop_halts_frame_production() {
        let svc = test_service();
        svc.initialize().unwrap();
        wait_for_frame(&svc).await;

        svc.stop();
        let after_stop = svc.frame_id();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(svc.frame_id(), after_stop);
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_inputs() {
        let svc = test_service();
        assert!(svc.set_resolution(0, 480).is_err());
        assert!(svc.set_resolution(640, 0).is_err());
        assert!(svc.set_resolution(10_000, 480).is_err());
        assert!(svc.set_camera_index(-1).is_err());
        assert!(svc.set_resolution(1280, 720).is_ok());
    }
}
