//! V4L2 capture backend
//!
//! Opens `/dev/video{index}` with a memory-mapped stream. MJPG is preferred
//! since those frames pass through without re-encoding; YUYV devices are
//! converted to RGB before JPEG encoding.

use super::source::{FramePixels, RawFrame};
use super::worker::{pump, FrameSender, SessionEnd, WorkerOptions};
use super::CaptureShared;
use crate::error::{Error, Result};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

pub(super) fn run_session(
    shared: &CaptureShared,
    tx: &FrameSender,
    index: i32,
    width: u32,
    height: u32,
    opts: &WorkerOptions,
) -> SessionEnd {
    let (dev, format) = match open_device(index, width, height) {
        Ok(pair) => pair,
        Err(e) => return SessionEnd::Fault(e),
    };

    let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, 4) {
        Ok(s) => s,
        Err(e) => {
            return SessionEnd::Fault(Error::Capture(format!(
                "failed to start stream on camera {index}: {e}"
            )))
        }
    };

    tracing::info!(
        camera_index = index,
        width = format.width,
        height = format.height,
        fourcc = ?format.fourcc,
        "Camera opened"
    );
    shared.mark_ready();

    let fourcc = format.fourcc;
    let (fw, fh) = (format.width, format.height);
    pump(shared, tx, width, height, opts, || {
        let (buf, _meta) = stream
            .next()
            .map_err(|e| Error::Capture(format!("frame read failed: {e}")))?;
        Ok(decode_frame(buf, fourcc, fw, fh))
    })
}

/// Open the device and negotiate a format.
///
/// The driver may clamp the requested size; the returned format carries the
/// actual dimensions, while the control block keeps the requested ones.
fn open_device(index: i32, width: u32, height: u32) -> Result<(Device, Format)> {
    if index < 0 {
        return Err(Error::Capture(format!("invalid camera index {index}")));
    }
    let dev = Device::new(index as usize)
        .map_err(|e| Error::Capture(format!("failed to open camera {index}: {e}")))?;

    let mjpg = FourCC::new(b"MJPG");
    let yuyv = FourCC::new(b"YUYV");

    let mut format = dev
        .set_format(&Format::new(width, height, mjpg))
        .map_err(|e| Error::Capture(format!("failed to set format on camera {index}: {e}")))?;
    if format.fourcc != mjpg {
        format = dev
            .set_format(&Format::new(width, height, yuyv))
            .map_err(|e| Error::Capture(format!("failed to set format on camera {index}: {e}")))?;
        if format.fourcc != yuyv {
            return Err(Error::Capture(format!(
                "camera {index} offers unsupported pixel format {:?}",
                format.fourcc
            )));
        }
    }

    Ok((dev, format))
}

fn decode_frame(buf: &[u8], fourcc: FourCC, width: u32, height: u32) -> Option<RawFrame> {
    if buf.is_empty() {
        return None;
    }
    if fourcc == FourCC::new(b"MJPG") {
        return Some(RawFrame {
            width,
            height,
            pixels: FramePixels::Jpeg(buf.to_vec()),
        });
    }

    let expected = (width as usize) * (height as usize) * 2;
    if buf.len() < expected {
        return None;
    }
    Some(RawFrame {
        width,
        height,
        pixels: FramePixels::Rgb(yuyv_to_rgb(buf, width, height)),
    })
}

/// BT.601 YUYV 4:2:2 to packed RGB
fn yuyv_to_rgb(buf: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut rgb = Vec::with_capacity(w * h * 3);
    for chunk in buf[..w * h * 2].chunks_exact(4) {
        let (y0, u, y1, v) = (
            chunk[0] as i32,
            chunk[1] as i32,
            chunk[2] as i32,
            chunk[3] as i32,
        );
        for y in [y0, y1] {
            let c = y - 16;
            let d = u - 128;
            let e = v - 128;
            rgb.push(clamp((298 * c + 409 * e + 128) >> 8));
            rgb.push(clamp((298 * c - 100 * d - 208 * e + 128) >> 8));
            rgb.push(clamp((298 * c + 516 * d + 128) >> 8));
        }
    }
    rgb
}

fn clamp(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_mid_gray() {
        // Y=128, U=V=128 is a mid gray; all channels land near 130
        let buf = [128u8, 128, 128, 128];
        let rgb = yuyv_to_rgb(&buf, 2, 1);
        assert_eq!(rgb.len(), 6);
        for &ch in &rgb {
            assert!((125..=135).contains(&ch), "channel {ch} not gray");
        }
    }

    #[test]
    fn test_yuyv_black_and_white() {
        // First pixel Y=16 (black), second Y=235 (white)
        let buf = [16u8, 128, 235, 128];
        let rgb = yuyv_to_rgb(&buf, 2, 1);
        assert!(rgb[..3].iter().all(|&c| c < 8));
        assert!(rgb[3..].iter().all(|&c| c > 247));
    }

    #[test]
    fn test_decode_frame_empty_is_none() {
        assert!(decode_frame(&[], FourCC::new(b"MJPG"), 640, 480).is_none());
    }

    #[test]
    fn test_decode_frame_mjpg_passthrough() {
        let frame = decode_frame(&[0xFF, 0xD8, 0xFF], FourCC::new(b"MJPG"), 640, 480).unwrap();
        match frame.pixels {
            FramePixels::Jpeg(data) => assert_eq!(data, vec![0xFF, 0xD8, 0xFF]),
            FramePixels::Rgb(_) => panic!("MJPG must pass through"),
        }
    }

    #[test]
    fn test_decode_frame_short_yuyv_is_none() {
        let buf = vec![0u8; 16];
        assert!(decode_frame(&buf, FourCC::new(b"YUYV"), 640, 480).is_none());
    }
}
