//! Error taxonomy for the capture workflow.

use crate::session::{CaptureState, Operation};
use thiserror::Error;

/// Errors surfaced by the capture subsystem.
///
/// Acquisition and capture-time failures are user-facing and reported to
/// the host. Contract violations (`NoActiveStream`, `StreamBusy`,
/// `InvalidTransition`) indicate a defect in the caller or in the state
/// machine and are logged rather than shown.
///
/// A missed barcode decode is not an error and has no variant here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The user or platform refused camera access.
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    /// No usable camera, or it could not be opened.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    /// A frame was requested from a released or foreign stream handle.
    #[error("no active camera stream")]
    NoActiveStream,
    /// A stream was requested while another one is live.
    #[error("a camera stream is already live")]
    StreamBusy,
    /// The live stream failed to deliver a frame.
    #[error("failed to read frame: {0}")]
    FrameCapture(String),
    /// The frame could not be encoded as a still.
    #[error("failed to encode frame: {0}")]
    Encode(String),
    /// An operation was called outside the states it is valid in.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        /// The rejected operation.
        operation: Operation,
        /// State the machine was in.
        state: CaptureState,
    },
}

impl CaptureError {
    /// Whether the host should show this error to the user.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CaptureError::PermissionDenied(_)
                | CaptureError::DeviceUnavailable(_)
                | CaptureError::FrameCapture(_)
                | CaptureError::Encode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_split() {
        assert!(CaptureError::PermissionDenied("no".into()).is_user_facing());
        assert!(CaptureError::DeviceUnavailable("none".into()).is_user_facing());
        assert!(!CaptureError::NoActiveStream.is_user_facing());
        assert!(!CaptureError::StreamBusy.is_user_facing());
    }

    #[test]
    fn test_transition_message() {
        let error = CaptureError::InvalidTransition {
            operation: Operation::Accept,
            state: CaptureState::Live,
        };
        assert_eq!(error.to_string(), "cannot accept while live");
    }
}
