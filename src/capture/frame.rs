//! Published frames and JPEG helpers

use crate::error::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::io::Cursor;

/// One captured frame as published to consumers
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Monotonic frame counter value for this frame
    pub frame_id: u32,
    /// Encoded JPEG payload
    pub jpeg: Bytes,
    /// Actual frame width (may differ from the requested resolution)
    pub width: u32,
    /// Actual frame height
    pub height: u32,
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
}

/// Encode packed RGB pixels to JPEG
pub fn encode_jpeg(rgb: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    let expected = (width as usize) * (height as usize) * 3;
    if rgb.len() != expected {
        return Err(Error::Encode(format!(
            "pixel buffer is {} bytes, expected {} for {}x{}",
            rgb.len(),
            expected,
            width,
            height
        )));
    }

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Build one MJPEG multipart part for a frame.
///
/// Wire layout matches the stream consumers expect:
/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg>\r\n`
pub fn mjpeg_part(frame: &FrameData) -> Bytes {
    let mut part = Vec::with_capacity(frame.jpeg.len() + 48);
    part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    part.extend_from_slice(&frame.jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

/// MIME type of the MJPEG stream
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_payload(payload: &[u8]) -> FrameData {
        FrameData {
            frame_id: 7,
            jpeg: Bytes::copy_from_slice(payload),
            width: 2,
            height: 2,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_encode_jpeg_produces_soi_marker() {
        let rgb = vec![128u8; 4 * 4 * 3];
        let jpeg = encode_jpeg(&rgb, 4, 4, 80).unwrap();
        assert!(jpeg.len() > 2);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_jpeg_rejects_wrong_buffer_size() {
        let rgb = vec![0u8; 10];
        assert!(encode_jpeg(&rgb, 4, 4, 80).is_err());
    }

    #[test]
    fn test_mjpeg_part_layout() {
        let frame = frame_with_payload(b"JPEGDATA");
        let part = mjpeg_part(&frame);
        assert_eq!(
            &part[..],
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJPEGDATA\r\n"
        );
    }
}
