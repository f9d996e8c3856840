//! Metrics collection and registry.

use crate::session::CaptureStats;
use crate::stream::StreamManager;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering or encoding a metric failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of capture activity for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Machine counters.
    pub stats: CaptureStats,
    /// Whether a camera stream is live right now.
    pub stream_live: bool,
    /// Total stream acquisitions.
    pub stream_acquisitions: u64,
}

impl MetricsSnapshot {
    /// Creates a snapshot from a machine's counters and its stream manager.
    pub fn from_machine(stats: &CaptureStats, streams: &StreamManager) -> Self {
        Self {
            stats: stats.clone(),
            stream_live: streams.is_live(),
            stream_acquisitions: streams.acquisitions(),
        }
    }
}

/// Prometheus metrics registry for capture monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    sessions_opened: IntCounter,
    acquisition_failures: IntCounter,
    stream_acquisitions: IntCounter,
    stream_live: IntGauge,

    captures: IntCounter,
    retries: IntCounter,
    decodes_found: IntCounter,
    decodes_missed: IntCounter,
    stale_decodes: IntCounter,

    commits: IntCounter,
    cancels: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Counters only move forward, so catch up by the difference.
fn catch_up(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let stream_live = IntGauge::new(
            "barcode_capture_stream_live",
            "Whether a camera stream is currently live (1=live, 0=stopped)",
        )?;
        registry.register(Box::new(stream_live.clone()))?;

        Ok(Self {
            sessions_opened: counter(
                &registry,
                "barcode_capture_sessions_opened_total",
                "Capture sessions opened",
            )?,
            acquisition_failures: counter(
                &registry,
                "barcode_capture_acquisition_failures_total",
                "Camera acquisitions refused or failed",
            )?,
            stream_acquisitions: counter(
                &registry,
                "barcode_capture_stream_acquisitions_total",
                "Camera streams successfully acquired",
            )?,
            stream_live,
            captures: counter(&registry, "barcode_capture_captures_total", "Stills captured")?,
            retries: counter(
                &registry,
                "barcode_capture_retries_total",
                "Stills discarded with retry",
            )?,
            decodes_found: counter(
                &registry,
                "barcode_capture_decodes_found_total",
                "Decode attempts that recognized a code",
            )?,
            decodes_missed: counter(
                &registry,
                "barcode_capture_decodes_missed_total",
                "Decode attempts that recognized nothing",
            )?,
            stale_decodes: counter(
                &registry,
                "barcode_capture_stale_decodes_total",
                "Decode results dropped because their capture was superseded",
            )?,
            commits: counter(&registry, "barcode_capture_commits_total", "Stills accepted")?,
            cancels: counter(
                &registry,
                "barcode_capture_cancels_total",
                "Sessions cancelled or dismissed",
            )?,
            registry,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        let stats = &snapshot.stats;

        catch_up(&self.sessions_opened, stats.sessions_opened);
        catch_up(&self.acquisition_failures, stats.acquisition_failures);
        catch_up(&self.stream_acquisitions, snapshot.stream_acquisitions);
        self.stream_live.set(if snapshot.stream_live { 1 } else { 0 });

        catch_up(&self.captures, stats.captures);
        catch_up(&self.retries, stats.retries);
        catch_up(&self.decodes_found, stats.decodes_found);
        catch_up(&self.decodes_missed, stats.decodes_missed);
        catch_up(&self.stale_decodes, stats.stale_decodes);

        catch_up(&self.commits, stats.commits);
        catch_up(&self.cancels, stats.cancels);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
