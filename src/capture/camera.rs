//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and mock implementations for testing.

use super::{CaptureConfig, Frame, PixelFormat};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    /// The platform refused access to the camera.
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    /// No matching device is attached.
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    /// The device exists but could not be opened.
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    /// The device rejected the requested format.
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    /// Reading a frame failed.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// Capture was attempted on a closed camera.
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for camera implementations.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait Camera {
    /// Opens and starts streaming with the given configuration.
    ///
    /// On error the camera must be left closed.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Reads the current frame without stopping the stream.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Stops the stream and releases the device. Closing a closed camera
    /// does nothing.
    fn close(&mut self);
}

/// Mock camera for testing that generates synthetic frames.
///
/// Frames contain vertical bars so that downstream encoding has
/// something other than a flat field to compress.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
    open_failure: Option<CameraError>,
}

impl MockCamera {
    /// A mock camera that opens successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera whose every `open` fails with the given error.
    pub fn failing(error: CameraError) -> Self {
        Self {
            open_failure: Some(error),
            ..Self::default()
        }
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        if let Some(error) = &self.open_failure {
            return Err(error.clone());
        }
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!("MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;

        let width = config.width as usize;
        let pixel_count = width * config.height as usize;
        let pixels: Vec<u8> = (0..pixel_count)
            .map(|i| {
                let column = i % width;
                if (column / 4 + self.sequence as usize) % 3 == 0 {
                    0x10
                } else {
                    0xF0
                }
            })
            .collect();

        self.sequence += 1;
        Ok(Frame::new(
            pixels,
            config.width,
            config.height,
            PixelFormat::Luma8,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            tracing::info!("MockCamera closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig::default();

        assert!(!camera.is_open());

        camera.open(&config).unwrap();
        assert!(camera.is_open());

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.sequence(), 2);
        assert_ne!(frame.pixels(), frame2.pixels());

        camera.close();
        assert!(!camera.is_open());
        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_failing_camera_stays_closed() {
        let mut camera = MockCamera::failing(CameraError::PermissionDenied("blocked".into()));
        let result = camera.open(&CaptureConfig::default());

        assert!(matches!(result, Err(CameraError::PermissionDenied(_))));
        assert!(!camera.is_open());
    }
}
