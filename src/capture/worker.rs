//! Capture worker thread
//!
//! One OS thread owns the device for the lifetime of the service: open a
//! device, read frames until the control block asks for a pause, a camera
//! switch, a format change or shutdown, then reopen as needed. Device I/O
//! is blocking, so this stays off the async runtime.

use super::frame::{encode_jpeg, FrameData};
use super::source::{CaptureBackend, FramePixels, RawFrame, TestPatternSource};
use super::CaptureShared;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;

/// Channel the worker publishes frames on
pub(super) type FrameSender = watch::Sender<Option<Arc<FrameData>>>;

/// Per-worker settings fixed at spawn time
#[derive(Debug, Clone)]
pub(super) struct WorkerOptions {
    pub jpeg_quality: u8,
    pub max_frame_bytes: usize,
}

/// Why a capture session ended
pub(super) enum SessionEnd {
    /// Running flag cleared; the worker exits
    Shutdown,
    /// Camera index changed; reopen on the new index
    CameraSwitch(i32),
    /// Requested resolution changed; renegotiate the format
    Reconfigure,
    /// Device failure; back off and retry
    Fault(Error),
}

/// Worker entry point
pub(super) fn run(
    shared: Arc<CaptureShared>,
    tx: FrameSender,
    backend: CaptureBackend,
    opts: WorkerOptions,
) {
    tracing::info!(
        backend = backend.as_str(),
        camera_index = shared.control.camera_index(),
        "Capture worker started"
    );

    while shared.is_running() {
        if shared.control.paused() {
            thread::sleep(Duration::from_millis(100));
            continue;
        }

        let index = shared.control.camera_index();
        let res = shared.control.resolution();
        let end = match backend {
            #[cfg(feature = "v4l2")]
            CaptureBackend::V4l2 => {
                super::v4l2::run_session(&shared, &tx, index, res.width, res.height, &opts)
            }
            CaptureBackend::TestPattern => {
                run_test_session(&shared, &tx, res.width, res.height, &opts)
            }
        };

        match end {
            SessionEnd::Shutdown => break,
            SessionEnd::CameraSwitch(next) => {
                tracing::info!(camera_index = next, "Switching camera");
            }
            SessionEnd::Reconfigure => {
                let res = shared.control.resolution();
                tracing::info!(
                    width = res.width,
                    height = res.height,
                    "Renegotiating capture format"
                );
            }
            SessionEnd::Fault(e) => {
                tracing::error!(error = %e, camera_index = index, "Capture session failed");
                thread::sleep(Duration::from_secs(1));
            }
        }
    }

    tracing::info!("Capture worker stopped");
}

fn run_test_session(
    shared: &CaptureShared,
    tx: &FrameSender,
    width: u32,
    height: u32,
    opts: &WorkerOptions,
) -> SessionEnd {
    let mut source = TestPatternSource::new(width, height);
    shared.mark_ready();
    pump(shared, tx, width, height, opts, || {
        Ok(Some(source.next_frame()))
    })
}

/// Per-frame loop shared by all backends.
///
/// `next_frame` returns `Ok(None)` for a transient empty read (skipped, as
/// empty frames always were) and `Err` for a device fault that ends the
/// session. The frame counter never advances while paused, and a frame
/// exceeding the byte budget is dropped without advancing it either.
pub(super) fn pump<F>(
    shared: &CaptureShared,
    tx: &FrameSender,
    session_width: u32,
    session_height: u32,
    opts: &WorkerOptions,
    mut next_frame: F,
) -> SessionEnd
where
    F: FnMut() -> Result<Option<RawFrame>>,
{
    let session_index = shared.control.camera_index();

    loop {
        if !shared.is_running() {
            return SessionEnd::Shutdown;
        }
        if shared.control.paused() {
            thread::sleep(Duration::from_millis(100));
            continue;
        }

        let index = shared.control.camera_index();
        if index != session_index {
            return SessionEnd::CameraSwitch(index);
        }
        let res = shared.control.resolution();
        if res.width != session_width || res.height != session_height {
            return SessionEnd::Reconfigure;
        }

        let raw = match next_frame() {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => return SessionEnd::Fault(e),
        };

        let jpeg = match raw.pixels {
            FramePixels::Jpeg(data) => data,
            FramePixels::Rgb(rgb) => {
                match encode_jpeg(&rgb, raw.width, raw.height, opts.jpeg_quality) {
                    Ok(data) => data,
                    Err(e) => {
                        tracing::warn!(error = %e, "Frame encode failed, skipping");
                        continue;
                    }
                }
            }
        };

        if jpeg.len() > opts.max_frame_bytes {
            tracing::error!(
                size = jpeg.len(),
                budget = opts.max_frame_bytes,
                "Encoded frame exceeds budget, skipping"
            );
            continue;
        }

        let frame_id = shared.control.record_frame(jpeg.len() as u32);
        let frame = Arc::new(FrameData {
            frame_id,
            jpeg: Bytes::from(jpeg),
            width: raw.width,
            height: raw.height,
            captured_at: chrono::Utc::now(),
        });
        let _ = tx.send(Some(frame));

        thread::sleep(Duration::from_millis(u64::from(shared.control.interval_ms())));
    }
}
