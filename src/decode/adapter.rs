//! Boundary between the capture session and the barcode decoder.

use super::{DecodeConfig, Symbology};
use crate::session::CaptureId;
use crate::snapshot::EncodedImage;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a decoding collaborator may report.
///
/// None of these reach the capture flow: the adapter turns every one of
/// them into [`DecodeResult::NotFound`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The decoder cannot read the configured symbology.
    #[error("{0} is not supported by this decoder")]
    Unsupported(Symbology),
    /// The still is not a readable image.
    #[error("image could not be read: {0}")]
    InvalidImage(String),
    /// Any other failure inside the collaborator.
    #[error("decoder failed: {0}")]
    Collaborator(String),
}

/// An external single-shot barcode recognizer.
///
/// Implementations run synchronously on a blocking thread and bound their
/// own latency. `Ok(None)` means nothing was recognized.
pub trait BarcodeDecoder: Send + Sync {
    /// Attempts to read one barcode from `image`.
    fn decode(&self, image: &EncodedImage, config: &DecodeConfig)
        -> Result<Option<String>, DecodeError>;
}

/// Normalized outcome of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// Nothing recognized, or the attempt failed.
    NotFound,
    /// A recognized, trimmed code.
    Found(String),
}

impl DecodeResult {
    /// Normalizes a collaborator answer. Errors and blank codes are misses;
    /// found codes are trimmed.
    pub fn from_attempt(attempt: Result<Option<String>, DecodeError>) -> Self {
        match attempt {
            Ok(Some(code)) => {
                let code = code.trim();
                if code.is_empty() {
                    tracing::debug!("Decoder returned a blank code");
                    DecodeResult::NotFound
                } else {
                    DecodeResult::Found(code.to_string())
                }
            }
            Ok(None) => {
                tracing::debug!("No barcode detected");
                DecodeResult::NotFound
            }
            Err(e) => {
                tracing::debug!("Decode attempt failed: {}", e);
                DecodeResult::NotFound
            }
        }
    }

    /// The recognized code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            DecodeResult::Found(code) => Some(code),
            DecodeResult::NotFound => None,
        }
    }
}

/// A decode result tagged with the capture it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Capture the attempt was dispatched for.
    pub capture: CaptureId,
    /// Normalized result.
    pub result: DecodeResult,
}

/// Submits stills to the decoder and collects their outcomes.
///
/// Attempts run on tokio's blocking pool; outcomes are queued on a channel
/// and only applied when the session pulls them, so the session decides
/// whether a result is still relevant.
pub struct DecodeAdapter {
    decoder: Arc<dyn BarcodeDecoder>,
    config: DecodeConfig,
    tx: mpsc::UnboundedSender<DecodeOutcome>,
    rx: mpsc::UnboundedReceiver<DecodeOutcome>,
    dispatched: u64,
}

impl DecodeAdapter {
    /// Creates an adapter over `decoder` with a fixed configuration.
    pub fn new(decoder: Arc<dyn BarcodeDecoder>, config: DecodeConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            decoder,
            config,
            tx,
            rx,
            dispatched: 0,
        }
    }

    /// The configuration passed to every attempt.
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Starts one decode attempt for `capture`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&mut self, capture: CaptureId, image: Arc<EncodedImage>) {
        let decoder = Arc::clone(&self.decoder);
        let config = self.config.clone();
        let tx = self.tx.clone();
        self.dispatched += 1;

        tracing::debug!(%capture, symbology = %config.symbology, "Dispatching decode attempt");
        tokio::task::spawn_blocking(move || {
            let result = match catch_unwind(AssertUnwindSafe(|| decoder.decode(&image, &config))) {
                Ok(attempt) => DecodeResult::from_attempt(attempt),
                Err(_) => {
                    tracing::warn!(%capture, "Decoder panicked; treating as no barcode");
                    DecodeResult::NotFound
                }
            };
            // The receiver lives as long as the adapter; a closed channel
            // means the session is gone and the result is irrelevant.
            let _ = tx.send(DecodeOutcome { capture, result });
        });
    }

    /// Waits for the next finished attempt.
    pub async fn next_outcome(&mut self) -> Option<DecodeOutcome> {
        self.rx.recv().await
    }

    /// Returns a finished attempt if one is already queued.
    pub fn try_next_outcome(&mut self) -> Option<DecodeOutcome> {
        self.rx.try_recv().ok()
    }

    /// Finished attempts waiting to be applied.
    pub fn queued(&self) -> usize {
        self.rx.len()
    }

    /// Attempts dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::MockDecoder;
    use crate::snapshot::ImageFormat;

    fn still() -> Arc<EncodedImage> {
        Arc::new(EncodedImage::new(1, 1, ImageFormat::Png, vec![1, 2, 3], 1))
    }

    #[test]
    fn test_normalization() {
        assert_eq!(
            DecodeResult::from_attempt(Ok(Some("  SKU-42\n".into()))),
            DecodeResult::Found("SKU-42".into())
        );
        assert_eq!(DecodeResult::from_attempt(Ok(Some("   ".into()))), DecodeResult::NotFound);
        assert_eq!(DecodeResult::from_attempt(Ok(None)), DecodeResult::NotFound);
        assert_eq!(
            DecodeResult::from_attempt(Err(DecodeError::Collaborator("boom".into()))),
            DecodeResult::NotFound
        );
    }

    #[tokio::test]
    async fn test_outcome_carries_capture_id() {
        let decoder = Arc::new(MockDecoder::found("ABC123"));
        let mut adapter = DecodeAdapter::new(decoder.clone(), DecodeConfig::default());

        adapter.dispatch(CaptureId::new(7), still());
        let outcome = adapter.next_outcome().await.unwrap();

        assert_eq!(outcome.capture, CaptureId::new(7));
        assert_eq!(outcome.result.code(), Some("ABC123"));
        assert_eq!(decoder.calls(), 1);
        assert_eq!(adapter.dispatched(), 1);
        assert_eq!(adapter.queued(), 0);
    }

    #[tokio::test]
    async fn test_collaborator_error_becomes_not_found() {
        let decoder = Arc::new(MockDecoder::failing(DecodeError::InvalidImage("truncated".into())));
        let mut adapter = DecodeAdapter::new(decoder, DecodeConfig::default());

        adapter.dispatch(CaptureId::new(1), still());
        let outcome = adapter.next_outcome().await.unwrap();
        assert_eq!(outcome.result, DecodeResult::NotFound);
    }

    struct PanickingDecoder;

    impl BarcodeDecoder for PanickingDecoder {
        fn decode(&self, _: &EncodedImage, _: &DecodeConfig) -> Result<Option<String>, DecodeError> {
            panic!("decoder bug");
        }
    }

    #[tokio::test]
    async fn test_panicking_collaborator_becomes_not_found() {
        let mut adapter = DecodeAdapter::new(Arc::new(PanickingDecoder), DecodeConfig::default());

        adapter.dispatch(CaptureId::new(3), still());
        let outcome = adapter.next_outcome().await.unwrap();
        assert_eq!(outcome.result, DecodeResult::NotFound);
    }
}
