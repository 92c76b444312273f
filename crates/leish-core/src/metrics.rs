//! Global atomic counters for reconciliation.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    envelopes_processed: AtomicU64,
    envelopes_applied: AtomicU64,
    analysis_failures: AtomicU64,
    envelopes_skipped: AtomicU64,
    runs_aborted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            envelopes_processed: AtomicU64::new(0),
            envelopes_applied: AtomicU64::new(0),
            analysis_failures: AtomicU64::new(0),
            envelopes_skipped: AtomicU64::new(0),
            runs_aborted: AtomicU64::new(0),
        }
    }

    /// One envelope taken off the stream and handled, whatever the outcome.
    pub fn inc_envelopes_processed(&self) {
        self.envelopes_processed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "envelopes_processed", "counter incremented");
    }

    /// One image persisted from an envelope.
    pub fn inc_envelopes_applied(&self) {
        self.envelopes_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "envelopes_applied", "counter incremented");
    }

    /// One image recorded as `ResultError`.
    pub fn inc_analysis_failures(&self) {
        self.analysis_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "analysis_failures", "counter incremented");
    }

    /// One envelope dropped without touching the store.
    pub fn inc_envelopes_skipped(&self) {
        self.envelopes_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "envelopes_skipped", "counter incremented");
    }

    pub fn inc_runs_aborted(&self) {
        self.runs_aborted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_aborted", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            envelopes_processed = self.envelopes_processed(),
            envelopes_applied = self.envelopes_applied(),
            analysis_failures = self.analysis_failures(),
            envelopes_skipped = self.envelopes_skipped(),
            runs_aborted = self.runs_aborted(),
        );
    }

    pub fn envelopes_processed(&self) -> u64 {
        self.envelopes_processed.load(Ordering::Relaxed)
    }

    pub fn envelopes_applied(&self) -> u64 {
        self.envelopes_applied.load(Ordering::Relaxed)
    }

    pub fn analysis_failures(&self) -> u64 {
        self.analysis_failures.load(Ordering::Relaxed)
    }

    pub fn envelopes_skipped(&self) -> u64 {
        self.envelopes_skipped.load(Ordering::Relaxed)
    }

    pub fn runs_aborted(&self) -> u64 {
        self.runs_aborted.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.envelopes_processed.store(0, Ordering::Relaxed);
        self.envelopes_applied.store(0, Ordering::Relaxed);
        self.analysis_failures.store(0, Ordering::Relaxed);
        self.envelopes_skipped.store(0, Ordering::Relaxed);
        self.runs_aborted.store(0, Ordering::Relaxed);
    }
}
