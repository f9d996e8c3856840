//! Still-frame capture.
//!
//! Turns the current frame of a live stream into an [`EncodedImage`]:
//! a PNG at the stream's native resolution, suitable for handing to the
//! host as a data URI or to a barcode decoder.

mod capturer;
mod encoded;

pub use capturer::{rasterize, FrameCapturer};
pub use encoded::{EncodedImage, ImageFormat};
