//! Capture session lifecycle.
//!
//! [`CaptureMachine`] owns the only [`CaptureSession`] and drives it through
//! idle → requesting → live → captured → committed, calling the stream
//! manager, frame capturer and decode adapter along the way. The host UI
//! talks to it through [`CaptureHost`] and [`HostEvent`].

mod host;
mod machine;
mod state;
mod stats;

pub use host::{
    CaptureHost, CaptureOutcome, HostEvent, ParseEventError, RecordingHost, Surface, TracingHost,
};
pub use machine::CaptureMachine;
pub use state::{CaptureId, CaptureSession, CaptureState, Control, Operation};
pub use stats::CaptureStats;
