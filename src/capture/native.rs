//! Hardware camera backed by nokhwa.

use super::{Camera, CameraError, CaptureConfig, Facing, Frame, PixelFormat};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::NokhwaError;

/// Device name fragments that identify a rear-facing camera.
const REAR_MARKERS: &[&str] = &["back", "rear", "environment", "world"];

/// Native camera using the platform capture backend.
#[derive(Default)]
pub struct NativeCamera {
    device: Option<nokhwa::Camera>,
    sequence: u64,
}

impl NativeCamera {
    /// A closed camera; the device is chosen on open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the device to open: a rear-facing one when requested and
    /// available, otherwise the configured index.
    fn select_index(config: &CaptureConfig) -> Result<CameraIndex, CameraError> {
        let devices = nokhwa::query(ApiBackend::Auto).map_err(map_open_error)?;
        if devices.is_empty() {
            return Err(CameraError::DeviceNotFound("no video devices".into()));
        }

        if config.facing == Facing::Environment {
            let rear = devices.iter().find(|info| {
                let name = info.human_name().to_lowercase();
                REAR_MARKERS.iter().any(|marker| name.contains(marker))
            });
            if let Some(info) = rear {
                tracing::debug!(device = %info.human_name(), "Selected rear-facing camera");
                return Ok(info.index().clone());
            }
        }

        Ok(CameraIndex::Index(config.device_id))
    }
}

impl Camera for NativeCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.close();

        let index = Self::select_index(config)?;
        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                config.fps,
            ),
        ));

        let mut device = nokhwa::Camera::new(index, format).map_err(map_open_error)?;
        device.open_stream().map_err(map_open_error)?;

        tracing::info!(
            device = %device.info().human_name(),
            resolution = ?device.resolution(),
            "Camera stream opened"
        );
        self.device = Some(device);
        self.sequence = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let device = self.device.as_mut().ok_or(CameraError::NotInitialized)?;

        let buffer = device
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        self.sequence += 1;
        let (width, height) = decoded.dimensions();
        Ok(Frame::new(
            decoded.into_raw(),
            width,
            height,
            PixelFormat::Rgb8,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.stop_stream() {
                tracing::warn!("Failed to stop camera stream cleanly: {}", e);
            }
            tracing::info!("Camera stream closed");
        }
    }
}

impl Drop for NativeCamera {
    fn drop(&mut self) {
        self.close();
    }
}

fn map_open_error(error: NokhwaError) -> CameraError {
    let message = error.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("not authorized") {
        CameraError::PermissionDenied(message)
    } else {
        CameraError::OpenFailed(message)
    }
}
