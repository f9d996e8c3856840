//! The host UI as seen from the capture subsystem.

use super::CaptureId;
use crate::error::CaptureError;
use crate::snapshot::EncodedImage;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// How a capture interaction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The user accepted the still.
    Committed {
        /// Identity of the accepted still.
        capture: CaptureId,
        /// The accepted still.
        image: Arc<EncodedImage>,
        /// Code recognized before accept. A code that resolves later is
        /// delivered through [`CaptureHost::set_code`] only.
        code: Option<String>,
    },
    /// The user cancelled or dismissed the dialog.
    Cancelled,
    /// The camera could not be used.
    Failed(CaptureError),
}

/// Dialog, surfaces and form fields the capture subsystem drives.
pub trait CaptureHost {
    /// Shows the capture dialog.
    fn show_dialog(&mut self);

    /// Hides the capture dialog. May be called when it is already hidden.
    fn hide_dialog(&mut self);

    /// Shows the live video surface with the Capture control.
    fn show_live(&mut self);

    /// Shows the still surface with the Retry and Accept controls.
    fn show_still(&mut self, image: &EncodedImage);

    /// Image-data form field; receives a data URI on accept.
    fn set_image_data(&mut self, data_uri: String);

    /// Code form field; receives a recognized code as soon as it resolves,
    /// even after the still was accepted.
    fn set_code(&mut self, code: &str);

    /// Shows a dismissible error notification.
    fn notify_error(&mut self, error: &CaptureError);

    /// Called once per interaction with its outcome.
    fn on_outcome(&mut self, _outcome: &CaptureOutcome) {}
}

/// Inbound requests from the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// Open the dialog and start the camera.
    Open,
    /// Take a still.
    Capture,
    /// Discard the still.
    Retry,
    /// Keep the still.
    Accept,
    /// Close the dialog without keeping anything.
    Cancel,
    /// The dialog was closed by the host itself.
    Dismissed,
    /// The host is going away; tear down and stop.
    Shutdown,
}

/// A command line that names no [`HostEvent`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown command: {0}")]
pub struct ParseEventError(String);

impl FromStr for HostEvent {
    type Err = ParseEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(HostEvent::Open),
            "capture" | "snap" => Ok(HostEvent::Capture),
            "retry" => Ok(HostEvent::Retry),
            "accept" | "use" => Ok(HostEvent::Accept),
            "cancel" => Ok(HostEvent::Cancel),
            "dismiss" | "close" => Ok(HostEvent::Dismissed),
            "quit" | "exit" => Ok(HostEvent::Shutdown),
            other => Err(ParseEventError(other.to_string())),
        }
    }
}

/// Which capture surface is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    /// Dialog closed.
    #[default]
    Hidden,
    /// Live viewfinder.
    Live,
    /// Captured still.
    Still,
}

/// Host that keeps the UI state in memory. Used by tests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Whether the dialog is open.
    pub dialog_visible: bool,
    /// Visible surface.
    pub surface: Surface,
    /// Last value of the image-data field.
    pub image_data: Option<String>,
    /// Last value of the code field.
    pub code: Option<String>,
    /// Every error notification shown.
    pub errors: Vec<CaptureError>,
    /// Every reported outcome, oldest first.
    pub outcomes: Vec<CaptureOutcome>,
}

impl RecordingHost {
    /// A host with the dialog closed and empty fields.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureHost for RecordingHost {
    fn show_dialog(&mut self) {
        self.dialog_visible = true;
    }

    fn hide_dialog(&mut self) {
        self.dialog_visible = false;
        self.surface = Surface::Hidden;
    }

    fn show_live(&mut self) {
        self.surface = Surface::Live;
    }

    fn show_still(&mut self, _image: &EncodedImage) {
        self.surface = Surface::Still;
    }

    fn set_image_data(&mut self, data_uri: String) {
        self.image_data = Some(data_uri);
    }

    fn set_code(&mut self, code: &str) {
        self.code = Some(code.to_string());
    }

    fn notify_error(&mut self, error: &CaptureError) {
        self.errors.push(error.clone());
    }

    fn on_outcome(&mut self, outcome: &CaptureOutcome) {
        self.outcomes.push(outcome.clone());
    }
}

/// Host that reports every UI change through tracing.
#[derive(Debug, Default)]
pub struct TracingHost {
    dialog_visible: bool,
}

impl TracingHost {
    /// A host with the dialog closed.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureHost for TracingHost {
    fn show_dialog(&mut self) {
        self.dialog_visible = true;
        tracing::info!("Capture dialog shown");
    }

    fn hide_dialog(&mut self) {
        if std::mem::take(&mut self.dialog_visible) {
            tracing::info!("Capture dialog hidden");
        }
    }

    fn show_live(&mut self) {
        tracing::info!("Viewfinder live; commands: capture, cancel");
    }

    fn show_still(&mut self, image: &EncodedImage) {
        tracing::info!(
            width = image.width(),
            height = image.height(),
            "Still captured; commands: retry, accept"
        );
    }

    fn set_image_data(&mut self, data_uri: String) {
        tracing::info!(chars = data_uri.len(), "Image data field set");
    }

    fn set_code(&mut self, code: &str) {
        tracing::info!(code, "Barcode field set");
    }

    fn notify_error(&mut self, error: &CaptureError) {
        tracing::warn!("Unable to access camera: {}", error);
    }

    fn on_outcome(&mut self, outcome: &CaptureOutcome) {
        match outcome {
            CaptureOutcome::Committed { capture, code, .. } => {
                tracing::info!(%capture, code = ?code, "Capture committed")
            }
            CaptureOutcome::Cancelled => tracing::info!("Capture cancelled"),
            CaptureOutcome::Failed(e) => tracing::info!("Capture failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("open".parse(), Ok(HostEvent::Open));
        assert_eq!(" Capture\n".parse(), Ok(HostEvent::Capture));
        assert_eq!("dismiss".parse(), Ok(HostEvent::Dismissed));
        assert_eq!("quit".parse(), Ok(HostEvent::Shutdown));
        assert!("zoom".parse::<HostEvent>().is_err());
    }

    #[test]
    fn test_recording_host_hide_clears_surface() {
        let mut host = RecordingHost::new();
        host.show_dialog();
        host.show_live();
        host.hide_dialog();

        assert!(!host.dialog_visible);
        assert_eq!(host.surface, Surface::Hidden);
    }
}
