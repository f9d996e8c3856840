//! Immutable encoded still frame.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};

/// Container format of an encoded still.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Portable Network Graphics.
    Png,
}

impl ImageFormat {
    /// MIME type used in data URIs.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
        }
    }
}

/// A still frame in a portable, self-describing encoding.
///
/// Produced once per capture and never mutated afterwards; it is shared
/// behind an `Arc` between the session, the decode attempt and the host.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    width: u32,
    height: u32,
    format: ImageFormat,
    bytes: Vec<u8>,
    captured_at: DateTime<Utc>,
    sequence: u64,
}

impl EncodedImage {
    pub(crate) fn new(
        width: u32,
        height: u32,
        format: ImageFormat,
        bytes: Vec<u8>,
        sequence: u64,
    ) -> Self {
        Self {
            width,
            height,
            format,
            bytes,
            captured_at: Utc::now(),
            sequence,
        }
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoding of [`bytes`](Self::bytes).
    #[inline]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The encoded payload.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Wall-clock time the frame was encoded.
    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Sequence number of the source frame within its stream.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Renders the payload as a `data:` URI for the host image field.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("encoded_bytes", &self.bytes.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_prefix_and_payload() {
        let image = EncodedImage::new(2, 1, ImageFormat::Png, vec![0x89, b'P', b'N', b'G'], 1);
        let uri = image.to_data_uri();

        let payload = uri.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), image.bytes());
    }

    #[test]
    fn test_debug_omits_payload() {
        let image = EncodedImage::new(1, 1, ImageFormat::Png, vec![7; 1024], 3);
        let debug = format!("{:?}", image);
        assert!(debug.contains("encoded_bytes: 1024"));
    }
}
