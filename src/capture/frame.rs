//! Frame type representing a raw image read from a live stream.

use std::time::Instant;

/// Pixel layout of a raw frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel, grayscale.
    Luma8,
    /// Three bytes per pixel, packed RGB.
    Rgb8,
}

impl PixelFormat {
    /// Bytes used by a single pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A single raw frame from the camera.
///
/// Frames are short-lived: the frame capturer rasterizes one into an
/// [`EncodedImage`](crate::snapshot::EncodedImage) and drops it.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    timestamp: Instant,
    /// Monotonic sequence number within the stream.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, format: PixelFormat, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel layout.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions and layout.
    pub fn is_valid(&self) -> bool {
        self.pixel_count() > 0 && self.pixels.len() == self.pixel_count() * self.format.channels()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(vec![0u8; 640 * 480 * 3], 640, 480, PixelFormat::Rgb8, 1);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        // Grayscale-sized buffer declared as RGB
        let frame = Frame::new(vec![0u8; 640 * 480], 640, 480, PixelFormat::Rgb8, 1);
        assert!(!frame.is_valid());

        let empty = Frame::new(Vec::new(), 0, 0, PixelFormat::Luma8, 1);
        assert!(!empty.is_valid());
    }
}
