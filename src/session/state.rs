//! Session state and the data each state owns.

use crate::error::CaptureError;
use crate::snapshot::EncodedImage;
use crate::stream::StreamHandle;
use std::fmt;
use std::sync::Arc;

/// Identity of one captured still, used to match decode results to the
/// capture they were computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureId(u64);

impl CaptureId {
    /// Wraps a raw capture number.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw capture number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capture#{}", self.0)
    }
}

/// Lifecycle state of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No dialog, no stream.
    Idle,
    /// Waiting for the camera.
    Requesting,
    /// Streaming into the live surface.
    Live,
    /// Holding a still; the stream is stopped.
    Captured,
    /// The still was handed to the host. Terminal for this session.
    Committed,
}

impl CaptureState {
    /// Controls the host should offer in this state.
    pub fn controls(self) -> &'static [Control] {
        match self {
            CaptureState::Live => &[Control::Capture],
            CaptureState::Captured => &[Control::Retry, Control::Accept],
            _ => &[],
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Requesting => "requesting",
            CaptureState::Live => "live",
            CaptureState::Captured => "captured",
            CaptureState::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// Buttons shown alongside the capture surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Take a still from the live stream.
    Capture,
    /// Discard the still and go live again.
    Retry,
    /// Keep the still.
    Accept,
}

/// Public operations of the state machine, named in transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// [`CaptureMachine::open`](super::CaptureMachine::open)
    Open,
    /// [`CaptureMachine::capture_frame`](super::CaptureMachine::capture_frame)
    Capture,
    /// [`CaptureMachine::retry`](super::CaptureMachine::retry)
    Retry,
    /// [`CaptureMachine::accept`](super::CaptureMachine::accept)
    Accept,
    /// [`CaptureMachine::cancel`](super::CaptureMachine::cancel)
    Cancel,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Open => "open",
            Operation::Capture => "capture",
            Operation::Retry => "retry",
            Operation::Accept => "accept",
            Operation::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

/// State together with the resources only that state may hold.
///
/// Keeping the stream inside `Live` and the still inside `Captured` makes
/// it impossible to hold both at once. `Committed` keeps only the identity
/// and code of the accepted still, so a decode that resolves after accept
/// can still be matched.
#[derive(Debug)]
pub(crate) enum Phase {
    Idle,
    Requesting,
    Live {
        stream: StreamHandle,
    },
    Captured {
        capture: CaptureId,
        image: Arc<EncodedImage>,
        code: Option<String>,
    },
    Committed {
        capture: CaptureId,
        code: Option<String>,
    },
}

/// One capture interaction, from opening the dialog to commit or cancel.
#[derive(Debug)]
pub struct CaptureSession {
    pub(crate) phase: Phase,
    pub(crate) last_error: Option<CaptureError>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    /// A fresh idle session.
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            last_error: None,
        }
    }

    /// An idle session that remembers why the previous one ended.
    pub(crate) fn failed(error: CaptureError) -> Self {
        Self {
            phase: Phase::Idle,
            last_error: Some(error),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        match self.phase {
            Phase::Idle => CaptureState::Idle,
            Phase::Requesting => CaptureState::Requesting,
            Phase::Live { .. } => CaptureState::Live,
            Phase::Captured { .. } => CaptureState::Captured,
            Phase::Committed { .. } => CaptureState::Committed,
        }
    }

    /// The live stream, present only while `Live`.
    pub fn active_stream(&self) -> Option<&StreamHandle> {
        match &self.phase {
            Phase::Live { stream } => Some(stream),
            _ => None,
        }
    }

    /// The held still, present only while `Captured`.
    pub fn captured_image(&self) -> Option<&Arc<EncodedImage>> {
        match &self.phase {
            Phase::Captured { image, .. } => Some(image),
            _ => None,
        }
    }

    /// Identity of the held or committed still.
    pub fn capture_id(&self) -> Option<CaptureId> {
        match &self.phase {
            Phase::Captured { capture, .. } | Phase::Committed { capture, .. } => Some(*capture),
            _ => None,
        }
    }

    /// Code recognized in the held or committed still, once its decode
    /// has resolved.
    pub fn decoded_code(&self) -> Option<&str> {
        match &self.phase {
            Phase::Captured { code, .. } | Phase::Committed { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Error that ended the previous attempt, if any.
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }
}
