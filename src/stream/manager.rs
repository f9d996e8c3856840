//! Scoped ownership of the live camera stream.

use crate::capture::{Camera, CameraError, CaptureConfig, Frame};
use crate::error::CaptureError;

/// Opaque token for an open camera stream.
///
/// Handles are neither `Clone` nor `Copy`: exactly one exists per
/// acquisition, and releasing it twice is a no-op.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamHandle {
    id: u64,
    released: bool,
}

impl StreamHandle {
    /// Identity of the acquisition this handle belongs to.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the handle has already been released.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

/// Acquires and releases the camera on behalf of the capture session.
///
/// The manager is the only owner of the camera device. At most one stream
/// is live at a time; a new one cannot be acquired until the previous
/// handle has been released.
pub struct StreamManager {
    camera: Box<dyn Camera>,
    config: CaptureConfig,
    live: Option<u64>,
    next_id: u64,
    acquisitions: u64,
    releases: u64,
}

impl StreamManager {
    /// Creates a manager over the given camera backend.
    pub fn new(camera: Box<dyn Camera>, config: CaptureConfig) -> Self {
        Self {
            camera,
            config,
            live: None,
            next_id: 1,
            acquisitions: 0,
            releases: 0,
        }
    }

    /// Opens the camera and returns a handle to the live stream.
    ///
    /// On failure the camera is closed and no handle exists.
    pub fn acquire(&mut self) -> Result<StreamHandle, CaptureError> {
        if self.live.is_some() {
            return Err(CaptureError::StreamBusy);
        }

        if let Err(e) = self.camera.open(&self.config) {
            self.camera.close();
            tracing::warn!(facing = ?self.config.facing, "Camera acquisition failed: {}", e);
            return Err(classify(e));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.live = Some(id);
        self.acquisitions += 1;
        tracing::info!(stream = id, facing = ?self.config.facing, "Camera stream acquired");

        Ok(StreamHandle { id, released: false })
    }

    /// Reads the current frame of a live stream without stopping it.
    pub fn grab(&mut self, handle: &StreamHandle) -> Result<Frame, CaptureError> {
        if handle.released || self.live != Some(handle.id) {
            return Err(CaptureError::NoActiveStream);
        }
        self.camera
            .capture()
            .map_err(|e| CaptureError::FrameCapture(e.to_string()))
    }

    /// Stops the stream behind `handle`. Releasing an already-released
    /// handle does nothing.
    pub fn release(&mut self, handle: &mut StreamHandle) {
        if handle.released {
            tracing::trace!(stream = handle.id, "Stream already released");
            return;
        }
        handle.released = true;

        if self.live == Some(handle.id) {
            self.camera.close();
            self.live = None;
            self.releases += 1;
            tracing::info!(stream = handle.id, "Camera stream released");
        }
    }

    /// Whether a stream is currently live.
    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Total successful acquisitions.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }

    /// Total releases that actually stopped a stream.
    pub fn releases(&self) -> u64 {
        self.releases
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        if self.live.take().is_some() {
            tracing::warn!("Stream manager dropped with a live stream; closing camera");
            self.camera.close();
        }
    }
}

fn classify(error: CameraError) -> CaptureError {
    match error {
        CameraError::PermissionDenied(msg) => CaptureError::PermissionDenied(msg),
        other => CaptureError::DeviceUnavailable(other.to_string()),
    }
}
