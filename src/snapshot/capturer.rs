//! Rasterizes one live frame into a PNG still.

use super::encoded::{EncodedImage, ImageFormat};
use crate::capture::{Frame, PixelFormat};
use crate::error::CaptureError;
use crate::stream::{StreamHandle, StreamManager};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

/// Takes still frames from a live stream.
///
/// Capturing never stops the stream; the caller decides when to release.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCapturer;

impl FrameCapturer {
    /// Creates a capturer.
    pub fn new() -> Self {
        Self
    }

    /// Snapshots the current frame of `handle` at its native resolution.
    pub fn capture(
        &self,
        streams: &mut StreamManager,
        handle: &StreamHandle,
    ) -> Result<EncodedImage, CaptureError> {
        let frame = streams.grab(handle)?;
        let image = rasterize(&frame)?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            encoded_bytes = image.bytes().len(),
            "Frame captured"
        );
        Ok(image)
    }
}

/// Encodes a raw frame as PNG.
pub fn rasterize(frame: &Frame) -> Result<EncodedImage, CaptureError> {
    if !frame.is_valid() {
        return Err(CaptureError::Encode(format!(
            "buffer of {} bytes does not match {}x{} {:?}",
            frame.pixels().len(),
            frame.width(),
            frame.height(),
            frame.format()
        )));
    }

    let color = match frame.format() {
        PixelFormat::Luma8 => ColorType::L8,
        PixelFormat::Rgb8 => ColorType::Rgb8,
    };

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(frame.pixels(), frame.width(), frame.height(), color)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    Ok(EncodedImage::new(
        frame.width(),
        frame.height(),
        ImageFormat::Png,
        bytes,
        frame.sequence(),
    ))
}
