//! Running counters for a capture machine.

/// Totals since the machine was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Sessions started with `open`.
    pub sessions_opened: u64,
    /// Acquisitions that failed (permission or device).
    pub acquisition_failures: u64,
    /// Stills captured.
    pub captures: u64,
    /// Retries from a captured still.
    pub retries: u64,
    /// Decode attempts that recognized a code.
    pub decodes_found: u64,
    /// Decode attempts that recognized nothing.
    pub decodes_missed: u64,
    /// Decode results dropped because their capture was no longer current.
    pub stale_decodes: u64,
    /// Sessions committed by accept.
    pub commits: u64,
    /// Sessions cancelled or dismissed.
    pub cancels: u64,
}
