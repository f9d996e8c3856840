//! Prometheus exporter for capture activity.
//!
//! # Metrics Exposed
//!
//! ## Stream
//! - `barcode_capture_stream_live` - Whether a camera stream is live
//! - `barcode_capture_stream_acquisitions_total` - Streams acquired
//! - `barcode_capture_acquisition_failures_total` - Acquisitions refused
//!
//! ## Session
//! - `barcode_capture_sessions_opened_total` - Sessions opened
//! - `barcode_capture_captures_total` - Stills captured
//! - `barcode_capture_retries_total` - Stills discarded with retry
//! - `barcode_capture_commits_total` - Stills accepted
//! - `barcode_capture_cancels_total` - Sessions cancelled or dismissed
//!
//! ## Decode
//! - `barcode_capture_decodes_found_total` - Codes recognized
//! - `barcode_capture_decodes_missed_total` - Stills without a code
//! - `barcode_capture_stale_decodes_total` - Results dropped as stale
//!
//! With the `metrics` feature the registry is served over HTTP by
//! `MetricsServer`.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
