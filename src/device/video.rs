//! Camera (nokhwa) and screen (xcap) frame grabbers, plus the bounded
//! JPEG encoder shared by both.
//!
//! Grabbers hand back raw RGB frames; resizing and compression happen
//! in [`encode_jpeg_bounded`] so payload size stays predictable
//! regardless of the source resolution.

use bytes::Bytes;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use xcap::Monitor;

use super::{RawFrame, VideoGrabber};
use crate::errors::DeviceError;

/// JPEG quality for outbound frames.
const JPEG_QUALITY: u8 = 80;

/// Downscale a frame to fit `max_edge` x `max_edge` and JPEG-encode it.
pub fn encode_jpeg_bounded(frame: &RawFrame, max_edge: u32) -> Result<Bytes, DeviceError> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone())
        .ok_or_else(|| DeviceError::Encode("frame buffer size mismatch".to_string()))?;

    let (width, height) = (frame.width, frame.height);
    let image = if width > max_edge || height > max_edge {
        let scale = (max_edge as f64 / width as f64).min(max_edge as f64 / height as f64);
        let new_width = ((width as f64 * scale) as u32).max(1);
        let new_height = ((height as f64 * scale) as u32).max(1);
        image::imageops::thumbnail(&image, new_width, new_height)
    } else {
        image
    };

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY)
        .encode_image(&image)
        .map_err(|e| DeviceError::Encode(e.to_string()))?;
    Ok(Bytes::from(encoded))
}

/// Default camera as a frame grabber.
pub struct CameraGrabber {
    camera: Camera,
}

impl CameraGrabber {
    /// Open the default (index 0) camera and start its stream.
    pub fn open_default() -> Result<Self, DeviceError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let mut camera = Camera::new(CameraIndex::Index(0), requested)
            .map_err(|e| DeviceError::Video(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| DeviceError::Video(e.to_string()))?;
        Ok(Self { camera })
    }
}

impl VideoGrabber for CameraGrabber {
    fn grab(&mut self) -> Result<Option<RawFrame>, DeviceError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| DeviceError::Video(e.to_string()))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| DeviceError::Video(e.to_string()))?;
        Ok(Some(RawFrame {
            width: decoded.width(),
            height: decoded.height(),
            rgb: decoded.into_raw(),
        }))
    }
}

/// Whole-screen grabber for the first monitor.
pub struct ScreenGrabber {
    monitor: Monitor,
}

impl ScreenGrabber {
    pub fn open_primary() -> Result<Self, DeviceError> {
        let monitor = Monitor::all()
            .map_err(|e| DeviceError::Video(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| DeviceError::Video("no monitor found".to_string()))?;
        Ok(Self { monitor })
    }
}

impl VideoGrabber for ScreenGrabber {
    fn grab(&mut self) -> Result<Option<RawFrame>, DeviceError> {
        let shot = self
            .monitor
            .capture_image()
            .map_err(|e| DeviceError::Video(e.to_string()))?;
        let (width, height) = (shot.width(), shot.height());
        let rgba = shot.into_raw();

        // Strip the alpha channel; the encoder wants packed RGB.
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        for pixel in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&pixel[..3]);
        }
        Ok(Some(RawFrame { width, height, rgb }))
    }
}
