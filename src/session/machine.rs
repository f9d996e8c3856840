//! The capture state machine.

use super::host::{CaptureHost, CaptureOutcome, HostEvent};
use super::state::{CaptureId, CaptureSession, CaptureState, Operation, Phase};
use super::stats::CaptureStats;
use crate::decode::{DecodeAdapter, DecodeOutcome, DecodeResult};
use crate::error::CaptureError;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::snapshot::FrameCapturer;
use crate::stream::StreamManager;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Sequences stream, capturer and decoder for one host dialog.
///
/// Every operation takes `&mut self` and completes before returning, so
/// transitions never interleave. Decode results are applied only through
/// [`apply_decode`](Self::apply_decode), and only when they belong to the
/// still currently held or just committed; results for a still that was
/// retried or cancelled are dropped.
pub struct CaptureMachine<H: CaptureHost> {
    streams: StreamManager,
    capturer: FrameCapturer,
    decoder: DecodeAdapter,
    host: H,
    session: CaptureSession,
    next_capture: u64,
    stats: CaptureStats,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<H: CaptureHost> CaptureMachine<H> {
    /// Creates an idle machine.
    pub fn new(streams: StreamManager, decoder: DecodeAdapter, host: H) -> Self {
        Self {
            streams,
            capturer: FrameCapturer::new(),
            decoder,
            host,
            session: CaptureSession::new(),
            next_capture: 1,
            stats: CaptureStats::default(),
            metrics: None,
        }
    }

    /// Publishes counters to `registry` after every handled event.
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        self.session.state()
    }

    /// The session being driven.
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// The host surface.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The stream manager, for acquisition counters.
    pub fn streams(&self) -> &StreamManager {
        &self.streams
    }

    /// Counters since the machine was created.
    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Opens the dialog and starts the camera.
    ///
    /// Valid when idle or after a commit. On acquisition failure the dialog
    /// is hidden, the host is notified and the machine is idle again, with
    /// the error kept as the session's `last_error`.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        match self.state() {
            CaptureState::Idle | CaptureState::Committed => {}
            state => return Err(reject(Operation::Open, state)),
        }

        self.session = CaptureSession::new();
        self.stats.sessions_opened += 1;
        info!("Opening capture session");
        self.host.show_dialog();
        self.start_stream()
    }

    /// Takes a still from the live stream, stops the stream and starts a
    /// decode attempt. Valid only while live.
    pub fn capture_frame(&mut self) -> Result<CaptureId, CaptureError> {
        let mut stream = match std::mem::replace(&mut self.session.phase, Phase::Idle) {
            Phase::Live { stream } => stream,
            other => {
                self.session.phase = other;
                return Err(reject(Operation::Capture, self.state()));
            }
        };

        let captured = self.capturer.capture(&mut self.streams, &stream);
        self.streams.release(&mut stream);
        let image = match captured {
            Ok(image) => Arc::new(image),
            Err(e) => return Err(self.abort(e)),
        };

        let capture = CaptureId::new(self.next_capture);
        self.next_capture += 1;
        self.stats.captures += 1;

        self.session.phase = Phase::Captured {
            capture,
            image: Arc::clone(&image),
            code: None,
        };
        info!(%capture, width = image.width(), height = image.height(), "Still captured");
        self.host.show_still(&image);
        self.decoder.dispatch(capture, image);

        Ok(capture)
    }

    /// Discards the still and goes back to the live viewfinder.
    /// Valid only while a still is held.
    pub fn retry(&mut self) -> Result<(), CaptureError> {
        match std::mem::replace(&mut self.session.phase, Phase::Idle) {
            Phase::Captured { capture, .. } => {
                self.stats.retries += 1;
                info!(%capture, "Retrying capture");
                self.start_stream()
            }
            other => {
                self.session.phase = other;
                Err(reject(Operation::Retry, self.state()))
            }
        }
    }

    /// Hands the still (and any recognized code) to the host and commits.
    /// Valid only while a still is held.
    ///
    /// A decode still running for the accepted still is not invalidated:
    /// when it resolves, its code goes to the host's code sink.
    pub fn accept(&mut self) -> Result<(), CaptureError> {
        match std::mem::replace(&mut self.session.phase, Phase::Idle) {
            Phase::Captured {
                capture,
                image,
                code,
            } => {
                self.host.set_image_data(image.to_data_uri());
                self.host.hide_dialog();
                self.session.phase = Phase::Committed {
                    capture,
                    code: code.clone(),
                };
                self.stats.commits += 1;
                info!(%capture, code = ?code, "Capture accepted");
                self.host.on_outcome(&CaptureOutcome::Committed {
                    capture,
                    image,
                    code,
                });
                Ok(())
            }
            other => {
                self.session.phase = other;
                Err(reject(Operation::Accept, self.state()))
            }
        }
    }

    /// Releases everything and returns to idle. Does nothing when idle or
    /// committed.
    pub fn cancel(&mut self) {
        self.close(true);
    }

    /// The host closed the dialog itself. Same as [`cancel`](Self::cancel),
    /// without asking the host to hide it again.
    pub fn dismissed(&mut self) {
        self.close(false);
    }

    /// Applies a finished decode attempt. Returns `false` when the result
    /// was stale and dropped.
    ///
    /// Results for the held still and for the still just committed are
    /// applied; a found code reaches the host either way.
    pub fn apply_decode(&mut self, outcome: DecodeOutcome) -> bool {
        match &mut self.session.phase {
            Phase::Captured { capture, code, .. } | Phase::Committed { capture, code }
                if *capture == outcome.capture =>
            {
                match outcome.result {
                    DecodeResult::Found(found) => {
                        self.stats.decodes_found += 1;
                        info!(capture = %outcome.capture, code = %found, "Barcode recognized");
                        self.host.set_code(&found);
                        *code = Some(found);
                    }
                    DecodeResult::NotFound => {
                        self.stats.decodes_missed += 1;
                        debug!(capture = %outcome.capture, "No barcode recognized");
                    }
                }
                true
            }
            _ => {
                self.stats.stale_decodes += 1;
                debug!(capture = %outcome.capture, "Dropping decode result for a stale capture");
                false
            }
        }
    }

    /// Waits for the next decode attempt to finish and applies it.
    pub async fn settle_decode(&mut self) -> bool {
        match self.decoder.next_outcome().await {
            Some(outcome) => self.apply_decode(outcome),
            None => false,
        }
    }

    /// Applies a decode result if one has already finished.
    pub fn try_settle_decode(&mut self) -> Option<bool> {
        let outcome = self.decoder.try_next_outcome()?;
        Some(self.apply_decode(outcome))
    }

    /// Dispatches one host event.
    pub fn handle(&mut self, event: HostEvent) -> Result<(), CaptureError> {
        let result = match event {
            HostEvent::Open => self.open(),
            HostEvent::Capture => self.capture_frame().map(|_| ()),
            HostEvent::Retry => self.retry(),
            HostEvent::Accept => self.accept(),
            HostEvent::Cancel | HostEvent::Shutdown => {
                self.cancel();
                Ok(())
            }
            HostEvent::Dismissed => {
                self.dismissed();
                Ok(())
            }
        };
        self.publish_metrics();
        result
    }

    /// Processes host events and decode results one at a time until the
    /// host shuts down or its event channel closes. The session is always
    /// torn down before returning.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<HostEvent>) {
        loop {
            // Host events queued before a decode finished run first, so a
            // retry or cancel always invalidates the result it overtook.
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(HostEvent::Shutdown) | None => {
                        self.cancel();
                        self.publish_metrics();
                        break;
                    }
                    Some(event) => {
                        if let Err(e) = self.handle(event) {
                            debug!(?event, "Event not applied: {}", e);
                        }
                    }
                },
                Some(outcome) = self.decoder.next_outcome() => {
                    self.apply_decode(outcome);
                    self.publish_metrics();
                }
            }
        }
        info!("Capture event loop stopped");
    }

    /// Acquires the stream for a fresh or retried session.
    fn start_stream(&mut self) -> Result<(), CaptureError> {
        self.session.phase = Phase::Requesting;
        match self.streams.acquire() {
            Ok(stream) => {
                self.session.phase = Phase::Live { stream };
                self.session.last_error = None;
                self.host.show_live();
                Ok(())
            }
            Err(e) => {
                self.stats.acquisition_failures += 1;
                warn!("Camera unavailable: {}", e);
                self.session = CaptureSession::failed(e.clone());
                self.host.hide_dialog();
                self.host.notify_error(&e);
                self.host.on_outcome(&CaptureOutcome::Failed(e.clone()));
                Err(e)
            }
        }
    }

    /// Ends the session after a capture-time failure.
    fn abort(&mut self, e: CaptureError) -> CaptureError {
        if let Phase::Live { mut stream } = std::mem::replace(&mut self.session.phase, Phase::Idle) {
            self.streams.release(&mut stream);
        }
        self.session = CaptureSession::failed(e.clone());
        self.host.hide_dialog();
        if e.is_user_facing() {
            warn!("Capture failed: {}", e);
            self.host.notify_error(&e);
        } else {
            error!("Capture invariant violated: {}", e);
        }
        self.host.on_outcome(&CaptureOutcome::Failed(e.clone()));
        e
    }

    fn close(&mut self, hide: bool) {
        match std::mem::replace(&mut self.session.phase, Phase::Idle) {
            Phase::Idle => {
                debug!("Cancel ignored: no open session");
                return;
            }
            committed @ Phase::Committed { .. } => {
                self.session.phase = committed;
                debug!("Cancel ignored: session already committed");
                return;
            }
            Phase::Live { mut stream } => self.streams.release(&mut stream),
            Phase::Requesting | Phase::Captured { .. } => {}
        }

        self.session = CaptureSession::new();
        if hide {
            self.host.hide_dialog();
        }
        self.stats.cancels += 1;
        info!("Capture cancelled");
        self.host.on_outcome(&CaptureOutcome::Cancelled);
    }

    fn publish_metrics(&self) {
        if let Some(registry) = &self.metrics {
            registry.update(&MetricsSnapshot::from_machine(&self.stats, &self.streams));
        }
    }
}

fn reject(operation: Operation, state: CaptureState) -> CaptureError {
    let e = CaptureError::InvalidTransition { operation, state };
    debug!("Rejected: {}", e);
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CameraError, CaptureConfig, MockCamera};
    use crate::decode::{DecodeConfig, MockDecoder};
    use crate::session::{RecordingHost, Surface};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use proptest::prelude::*;
    use std::time::Duration;

    fn machine_with(camera: MockCamera, decoder: MockDecoder) -> CaptureMachine<RecordingHost> {
        let streams = StreamManager::new(Box::new(camera), CaptureConfig::with_dimensions(32, 24));
        let decoder = DecodeAdapter::new(Arc::new(decoder), DecodeConfig::default());
        CaptureMachine::new(streams, decoder, RecordingHost::new())
    }

    fn machine(decoder: MockDecoder) -> CaptureMachine<RecordingHost> {
        machine_with(MockCamera::new(), decoder)
    }

    fn assert_exclusive(machine: &CaptureMachine<RecordingHost>) {
        let session = machine.session();
        assert!(
            !(session.active_stream().is_some() && session.captured_image().is_some()),
            "stream and still held together"
        );
        assert_eq!(session.active_stream().is_some(), machine.streams().is_live());
    }

    #[tokio::test]
    async fn test_code_available_before_accept() {
        let mut machine = machine(MockDecoder::found("ABC123"));

        machine.open().unwrap();
        assert_eq!(machine.state(), CaptureState::Live);
        assert!(machine.host().dialog_visible);
        assert_eq!(machine.host().surface, Surface::Live);

        machine.capture_frame().unwrap();
        assert_eq!(machine.state(), CaptureState::Captured);
        assert!(!machine.streams().is_live());
        assert_eq!(machine.host().surface, Surface::Still);

        assert!(machine.settle_decode().await);
        assert_eq!(machine.session().decoded_code(), Some("ABC123"));
        assert_eq!(machine.host().code.as_deref(), Some("ABC123"));

        machine.accept().unwrap();
        assert_eq!(machine.state(), CaptureState::Committed);
        match machine.host().outcomes.last() {
            Some(CaptureOutcome::Committed { code, .. }) => assert_eq!(code.as_deref(), Some("ABC123")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unavailable_device_returns_to_idle() {
        let camera = MockCamera::failing(CameraError::DeviceNotFound("no camera".into()));
        let mut machine = machine_with(camera, MockDecoder::not_found());

        let result = machine.open();
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
        assert_eq!(machine.state(), CaptureState::Idle);
        assert!(machine.session().active_stream().is_none());
        assert!(!machine.streams().is_live());
        assert!(matches!(
            machine.session().last_error(),
            Some(CaptureError::DeviceUnavailable(_))
        ));

        let host = machine.host();
        assert!(!host.dialog_visible);
        assert_eq!(host.errors.len(), 1);
        assert!(matches!(host.outcomes.last(), Some(CaptureOutcome::Failed(_))));
        assert_eq!(machine.stats().acquisition_failures, 1);
    }

    #[tokio::test]
    async fn test_late_decode_after_retry_is_dropped() {
        let (decoder, gate) = MockDecoder::found("XYZ").gated();
        let mut machine = machine(decoder);

        machine.open().unwrap();
        let first = machine.capture_frame().unwrap();
        machine.retry().unwrap();
        assert_eq!(machine.state(), CaptureState::Live);

        gate.release();
        assert!(!machine.settle_decode().await);

        assert!(machine.session().decoded_code().is_none());
        assert!(machine.host().code.is_none());
        assert_eq!(machine.stats().stale_decodes, 1);

        // The next still gets its own identity.
        let second = machine.capture_frame().unwrap();
        assert_ne!(first, second);
        gate.release();
        assert!(machine.settle_decode().await);
        assert_eq!(machine.session().decoded_code(), Some("XYZ"));
    }

    #[tokio::test]
    async fn test_late_decode_after_cancel_is_dropped() {
        let (decoder, gate) = MockDecoder::found("LATE").gated();
        let mut machine = machine(decoder);

        machine.open().unwrap();
        machine.capture_frame().unwrap();
        machine.cancel();
        gate.release();

        assert!(!machine.settle_decode().await);
        assert_eq!(machine.state(), CaptureState::Idle);
        assert!(machine.host().code.is_none());
    }

    #[tokio::test]
    async fn test_code_resolving_after_accept_reaches_host() {
        let (decoder, gate) = MockDecoder::found("ABC123").gated();
        let mut machine = machine(decoder);

        machine.open().unwrap();
        let capture = machine.capture_frame().unwrap();
        machine.accept().unwrap();
        assert!(machine.host().code.is_none());
        assert!(!machine.host().dialog_visible);

        gate.release();
        assert!(machine.settle_decode().await);

        assert_eq!(machine.host().code.as_deref(), Some("ABC123"));
        assert_eq!(machine.state(), CaptureState::Committed);
        assert_eq!(machine.session().capture_id(), Some(capture));
        assert_eq!(machine.session().decoded_code(), Some("ABC123"));
        assert_eq!(machine.stats().decodes_found, 1);
        assert_eq!(machine.stats().stale_decodes, 0);
    }

    #[tokio::test]
    async fn test_accept_delivers_captured_bytes() {
        let mut machine = machine(MockDecoder::not_found());

        machine.open().unwrap();
        machine.capture_frame().unwrap();
        let captured = machine.session().captured_image().unwrap().bytes().to_vec();
        machine.accept().unwrap();

        let uri = machine.host().image_data.as_deref().unwrap();
        let payload = uri.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), captured);

        assert!(machine.session().active_stream().is_none());
        assert!(!machine.streams().is_live());
        assert!(!machine.host().dialog_visible);
        assert!(machine.host().code.is_none());
    }

    #[tokio::test]
    async fn test_cancel_releases_live_stream() {
        let mut machine = machine(MockDecoder::not_found());

        machine.open().unwrap();
        machine.cancel();

        assert_eq!(machine.state(), CaptureState::Idle);
        assert!(!machine.streams().is_live());
        assert_eq!(machine.streams().releases(), 1);
        assert_eq!(machine.host().outcomes, vec![CaptureOutcome::Cancelled]);
    }

    #[tokio::test]
    async fn test_cancel_while_idle_is_noop() {
        let mut machine = machine(MockDecoder::not_found());

        machine.cancel();
        machine.dismissed();

        assert_eq!(machine.state(), CaptureState::Idle);
        assert!(machine.host().outcomes.is_empty());
        assert!(machine.host().errors.is_empty());
        assert_eq!(machine.stats().cancels, 0);
    }

    #[tokio::test]
    async fn test_dismissal_behaves_like_cancel() {
        let mut machine = machine(MockDecoder::not_found());

        machine.open().unwrap();
        machine.capture_frame().unwrap();
        machine.handle(HostEvent::Dismissed).unwrap();

        assert_eq!(machine.state(), CaptureState::Idle);
        assert!(machine.session().captured_image().is_none());
        assert_eq!(machine.host().outcomes, vec![CaptureOutcome::Cancelled]);
    }

    #[tokio::test]
    async fn test_operations_rejected_outside_their_states() {
        let mut machine = machine(MockDecoder::not_found());

        assert!(matches!(
            machine.capture_frame(),
            Err(CaptureError::InvalidTransition { operation: Operation::Capture, state: CaptureState::Idle })
        ));
        assert!(machine.retry().is_err());
        assert!(machine.accept().is_err());

        machine.open().unwrap();
        assert!(machine.open().is_err());
        assert!(machine.accept().is_err());
        assert_eq!(machine.state(), CaptureState::Live);
        assert!(machine.streams().is_live());

        machine.capture_frame().unwrap();
        assert!(machine.capture_frame().is_err());
        assert_eq!(machine.state(), CaptureState::Captured);
    }

    #[tokio::test]
    async fn test_reopen_after_commit() {
        let mut machine = machine(MockDecoder::found("A1"));

        machine.open().unwrap();
        machine.capture_frame().unwrap();
        machine.accept().unwrap();
        machine.cancel();
        assert_eq!(machine.state(), CaptureState::Committed);

        machine.open().unwrap();
        assert_eq!(machine.state(), CaptureState::Live);
        assert_eq!(machine.streams().acquisitions(), 2);
        assert!(!machine.settle_decode().await, "decode for the committed still is stale");
    }

    #[tokio::test]
    async fn test_permission_denied_on_retry_cleans_up() {
        let mut machine = machine(MockDecoder::not_found());
        machine.open().unwrap();
        machine.capture_frame().unwrap();

        // Swap in a camera that now refuses access.
        machine.streams = StreamManager::new(
            Box::new(MockCamera::failing(CameraError::PermissionDenied("revoked".into()))),
            CaptureConfig::default(),
        );
        let result = machine.retry();

        assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
        assert_eq!(machine.state(), CaptureState::Idle);
        assert!(machine.session().captured_image().is_none());
        assert!(!machine.host().dialog_visible);
    }

    #[tokio::test]
    async fn test_run_loop_applies_events_in_order() {
        let mut machine = machine(MockDecoder::found("RUN-1"));
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(HostEvent::Open).unwrap();
        tx.send(HostEvent::Capture).unwrap();
        tx.send(HostEvent::Accept).unwrap();
        tx.send(HostEvent::Shutdown).unwrap();
        machine.run(rx).await;

        assert_eq!(machine.state(), CaptureState::Committed);
        assert!(!machine.streams().is_live());
        assert!(machine.host().image_data.is_some());
    }

    #[tokio::test]
    async fn test_run_loop_handles_queued_retry_before_finished_decode() {
        let (decoder, gate) = MockDecoder::found("XYZ").gated();
        let mut machine = machine(decoder);
        let (tx, rx) = mpsc::unbounded_channel();

        machine.open().unwrap();
        machine.capture_frame().unwrap();
        tx.send(HostEvent::Retry).unwrap();
        tx.send(HostEvent::Shutdown).unwrap();

        // Let the decode finish while both events are still waiting.
        gate.release();
        while machine.decoder.queued() == 0 {
            std::thread::sleep(Duration::from_millis(5));
        }
        machine.run(rx).await;

        assert!(machine.host().code.is_none());
        assert!(machine.session().decoded_code().is_none());
        assert_eq!(machine.state(), CaptureState::Idle);
        assert_eq!(machine.stats().retries, 1);

        // The overtaken result is still queued and is dropped as stale.
        assert!(!machine.settle_decode().await);
        assert!(machine.host().code.is_none());
        assert_eq!(machine.stats().stale_decodes, 1);
    }

    #[tokio::test]
    async fn test_run_loop_tears_down_when_host_disappears() {
        let mut machine = machine(MockDecoder::not_found());
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(HostEvent::Open).unwrap();
        drop(tx);
        machine.run(rx).await;

        assert_eq!(machine.state(), CaptureState::Idle);
        assert!(!machine.streams().is_live());
    }

    #[tokio::test]
    async fn test_metrics_follow_machine() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let mut machine = machine(MockDecoder::not_found()).with_metrics(Arc::clone(&registry));

        machine.handle(HostEvent::Open).unwrap();
        machine.handle(HostEvent::Capture).unwrap();
        machine.handle(HostEvent::Cancel).unwrap();

        let output = registry.encode().unwrap();
        assert!(output.contains("barcode_capture_sessions_opened_total 1"));
        assert!(output.contains("barcode_capture_captures_total 1"));
        assert!(output.contains("barcode_capture_cancels_total 1"));
        assert!(output.contains("barcode_capture_stream_live 0"));
    }

    #[derive(Debug, Clone)]
    enum Step {
        Event(HostEvent),
        Deliver,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Event(HostEvent::Open)),
            Just(Step::Event(HostEvent::Capture)),
            Just(Step::Event(HostEvent::Retry)),
            Just(Step::Event(HostEvent::Accept)),
            Just(Step::Event(HostEvent::Cancel)),
            Just(Step::Event(HostEvent::Dismissed)),
            Just(Step::Deliver),
        ]
    }

    proptest! {
        #[test]
        fn prop_any_sequence_ends_clean(steps in prop::collection::vec(step(), 0..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let mut machine = machine(MockDecoder::found("P-1"));
                for step in steps {
                    match step {
                        Step::Event(event) => {
                            let _ = machine.handle(event);
                        }
                        Step::Deliver => {
                            let _ = machine.try_settle_decode();
                        }
                    }
                    assert_exclusive(&machine);
                    if machine.session().decoded_code().is_some() {
                        assert!(
                            machine.session().captured_image().is_some()
                                || machine.state() == CaptureState::Committed
                        );
                    }
                }

                machine.cancel();
                let state = machine.state();
                assert!(state == CaptureState::Idle || state == CaptureState::Committed);
                assert!(machine.session().active_stream().is_none());
                assert!(!machine.streams().is_live());
                assert_eq!(machine.streams().acquisitions(), machine.streams().releases());
            });
        }
    }
}
