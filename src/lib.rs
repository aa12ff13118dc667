//! Camserver Library
//!
//! Standalone video capture server
//!
//! ## Architecture
//!
//! 1. CaptureService - camera capture, JPEG encoding, frame publication
//! 2. EventLogService - control event recording (ring buffer)
//! 3. WebAPI - REST endpoints and the MJPEG stream
//! 4. Report - HTML report to Word document conversion
//!
//! ## Design Principles
//!
//! - The capture control block is the single source of truth for capture
//!   state; the worker and the API both read and write it lock-free
//! - Consumers never block the capture thread: frames are published over a
//!   watch channel and slow clients simply skip frames

pub mod capture;
pub mod event_log_service;
pub mod report;
pub mod web_api;

pub mod error;
pub mod models;
pub mod state;

pub use error::{Error, Result};
pub use state::AppState;
