use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

use crate::{CaptureConfig, Result, TimelapseError};

/// A source of still frames, usually a physical capture device.
///
/// `read_frame` blocks on device I/O. A read error is not automatically
/// fatal for the device; the caller decides whether to retry or abort.
pub trait FrameSource {
    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<RgbImage>;

    /// Effective frame resolution after any device-side clamping.
    fn resolution(&self) -> (u32, u32);

    /// Releases the underlying device. Idempotent.
    fn release(&mut self);
}

/// Webcam-backed frame source.
pub struct CameraSource {
    camera: Option<Camera>,
    resolution: (u32, u32),
}

impl CameraSource {
    /// Opens the capture device named by `config` and starts its stream.
    ///
    /// The requested format is best-effort: the driver picks the closest
    /// mode it supports, so [`FrameSource::resolution`] reports what was
    /// actually negotiated rather than what was asked for.
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.frame_rate.round() as u32,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let device_unavailable = |e: nokhwa::NokhwaError| TimelapseError::DeviceUnavailable {
            index: config.device_index,
            reason: e.to_string(),
        };

        let mut camera = Camera::new(CameraIndex::Index(config.device_index), requested)
            .map_err(device_unavailable)?;
        camera.open_stream().map_err(device_unavailable)?;

        let resolution = camera.resolution();
        tracing::debug!(
            width = resolution.width(),
            height = resolution.height(),
            "camera stream opened"
        );
        Ok(Self {
            camera: Some(camera),
            resolution: (resolution.width(), resolution.height()),
        })
    }
}

impl FrameSource for CameraSource {
    fn read_frame(&mut self) -> Result<RgbImage> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| TimelapseError::ReadFailure("device already released".to_string()))?;
        let buffer = camera
            .frame()
            .map_err(|e| TimelapseError::ReadFailure(e.to_string()))?;
        buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| TimelapseError::ReadFailure(e.to_string()))
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "failed to stop camera stream");
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}
