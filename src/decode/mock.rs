//! Scripted decoder for tests and demos.

use super::{BarcodeDecoder, DecodeConfig, DecodeError};
use crate::snapshot::EncodedImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};

/// Decoder that answers every attempt with a fixed response.
///
/// A gated decoder blocks each attempt until its [`DecodeGate`] is
/// released, which lets tests decide exactly when a result arrives.
#[derive(Debug)]
pub struct MockDecoder {
    response: Result<Option<String>, DecodeError>,
    gate: Option<Mutex<mpsc::Receiver<()>>>,
    calls: AtomicUsize,
}

/// Releases attempts blocked in a gated [`MockDecoder`].
///
/// Dropping the gate lets every pending and future attempt through.
#[derive(Debug)]
pub struct DecodeGate(mpsc::Sender<()>);

impl DecodeGate {
    /// Lets one blocked attempt finish.
    pub fn release(&self) {
        let _ = self.0.send(());
    }
}

impl MockDecoder {
    fn with_response(response: Result<Option<String>, DecodeError>) -> Self {
        Self {
            response,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always recognizes `code`.
    pub fn found(code: impl Into<String>) -> Self {
        Self::with_response(Ok(Some(code.into())))
    }

    /// Never recognizes anything.
    pub fn not_found() -> Self {
        Self::with_response(Ok(None))
    }

    /// Always fails with `error`.
    pub fn failing(error: DecodeError) -> Self {
        Self::with_response(Err(error))
    }

    /// Makes every attempt wait for the returned gate.
    pub fn gated(mut self) -> (Self, DecodeGate) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(Mutex::new(rx));
        (self, DecodeGate(tx))
    }

    /// Number of attempts started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BarcodeDecoder for MockDecoder {
    fn decode(
        &self,
        _image: &EncodedImage,
        _config: &DecodeConfig,
    ) -> Result<Option<String>, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let rx = gate
                .lock()
                .map_err(|_| DecodeError::Collaborator("gate poisoned".into()))?;
            // A dropped gate means "never block again".
            let _ = rx.recv();
        }
        self.response.clone()
    }
}
