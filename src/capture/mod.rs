//! Camera input and frame handling.
//!
//! This module provides abstractions for reading frames from a camera
//! and managing camera configuration. Stream ownership lives one layer up,
//! in [`crate::stream`].

mod camera;
mod config;
mod frame;
#[cfg(feature = "camera")]
mod native;

pub use camera::{Camera, CameraError, MockCamera};
pub use config::{CaptureConfig, ConfigError, Facing, FileConfig, OutputConfig};
pub use frame::{Frame, PixelFormat};
#[cfg(feature = "camera")]
pub use native::NativeCamera;
