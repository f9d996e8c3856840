//! Barcode recognition on captured stills.
//!
//! The recognition algorithm lives behind [`BarcodeDecoder`]. The
//! [`DecodeAdapter`] runs one attempt per still and normalizes every
//! failure to [`DecodeResult::NotFound`]: a missed decode is expected,
//! not exceptional.

mod adapter;
mod config;
mod mock;
mod multi;
mod qr;

pub use adapter::{BarcodeDecoder, DecodeAdapter, DecodeError, DecodeOutcome, DecodeResult};
pub use config::{DecodeConfig, Symbology};
pub use mock::{DecodeGate, MockDecoder};
pub use multi::MultiFormatDecoder;
pub use qr::QrDecoder;
