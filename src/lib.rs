//! Barcode Capture Library
//!
//! A camera capture workflow for inventory forms: open a viewfinder,
//! take a still, try to read a barcode from it, then accept the still
//! (and any recognized code) into the form or discard it and retry.
//!
//! # Architecture
//!
//! Control flows from the session down; results flow back up:
//!
//! ```text
//!            session (CaptureMachine)
//!          ↙          ↓           ↘
//!     stream      snapshot      decode
//!   (acquire/     (still →     (still → code,
//!    release)      PNG)         off-thread)
//!       ↓
//!    capture (camera backends)
//! ```
//!
//! # Design Principles
//!
//! - **No leaked hardware**: the stream is released on every exit from live
//! - **Still xor stream**: a session never holds both at once
//! - **Misses are normal**: a failed decode only means no code was filled in
//! - **Stale results are dropped**: decodes are keyed by capture identity
//!
//! # Example
//!
//! ```no_run
//! use barcode_capture::{
//!     capture::{CaptureConfig, MockCamera},
//!     decode::{DecodeAdapter, DecodeConfig, MockDecoder},
//!     session::{CaptureMachine, RecordingHost},
//!     stream::StreamManager,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let streams = StreamManager::new(Box::new(MockCamera::new()), CaptureConfig::default());
//! let decoder = DecodeAdapter::new(Arc::new(MockDecoder::found("SKU-1001")), DecodeConfig::default());
//! let mut machine = CaptureMachine::new(streams, decoder, RecordingHost::new());
//!
//! machine.open().unwrap();
//! machine.capture_frame().unwrap();
//! machine.settle_decode().await;
//! assert_eq!(machine.session().decoded_code(), Some("SKU-1001"));
//! machine.accept().unwrap();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod session;
pub mod snapshot;
pub mod stream;

// Re-export commonly used types at crate root
pub use capture::{Camera, CaptureConfig, FileConfig, Frame, MockCamera};
pub use decode::{BarcodeDecoder, DecodeAdapter, DecodeConfig, DecodeResult, Symbology};
pub use error::CaptureError;
pub use session::{CaptureHost, CaptureMachine, CaptureOutcome, CaptureSession, CaptureState, HostEvent};
pub use snapshot::EncodedImage;
pub use stream::{StreamHandle, StreamManager};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
