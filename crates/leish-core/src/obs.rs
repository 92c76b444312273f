//! Structured observability hooks for reconciliation runs.
//!
//! - `ReconcileSpan`: run-scoped tracing span
//! - `emit_*`: one function per lifecycle event, each carrying an
//!   `event = "reconcile.*"` field for log filtering

use leish_domain::{AnalysisStage, SampleKey};
use tracing::{error, info, warn};

use crate::error::{AnalysisError, ReconcileError};
use crate::reconciler::ReconcileReport;

/// Span tagging everything a run logs with its `run_id`.
///
/// ```ignore
/// let span = ReconcileSpan::new("run-1");
/// let _guard = span.enter();
/// ```
pub struct ReconcileSpan {
    span: tracing::Span,
}

impl ReconcileSpan {
    pub fn new(run_id: &str) -> Self {
        Self {
            span: tracing::info_span!("leish.reconcile", run_id = %run_id),
        }
    }

    /// Enter the span until the guard drops. Do not hold across `.await`;
    /// use [`ReconcileSpan::span`] with `Instrument` instead.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

/// Emit event: run started.
pub fn emit_reconcile_started(run_id: &str) {
    info!(event = "reconcile.started", run_id = %run_id);
}

/// Emit event: an envelope landed in the store.
pub fn emit_envelope_applied(run_id: &str, key: &SampleKey, stage: AnalysisStage) {
    info!(
        event = "reconcile.envelope_applied",
        run_id = %run_id,
        sample = %key,
        stage = %stage,
    );
}

/// Emit event: the service reported an image as unanalyzable (warning level).
pub fn emit_analysis_failed(run_id: &str, error: &AnalysisError) {
    warn!(event = "reconcile.analysis_failed", run_id = %run_id, error = %error);
}

/// Emit event: an envelope was dropped without touching the store (warning level).
pub fn emit_envelope_skipped(run_id: &str, error: &AnalysisError) {
    match error.key() {
        Some(key) => warn!(
            event = "reconcile.envelope_skipped",
            run_id = %run_id,
            sample = %key,
            error = %error,
        ),
        None => warn!(event = "reconcile.envelope_skipped", run_id = %run_id, error = %error),
    }
}

/// Emit event: run finished (stream drained or host cancelled).
pub fn emit_reconcile_finished(run_id: &str, duration_ms: u64, report: &ReconcileReport) {
    info!(
        event = "reconcile.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        processed = report.processed,
        analyzed = report.analyzed,
        failed = report.failed,
        skipped = report.skipped,
        cancelled = report.cancelled,
    );
}

/// Emit event: run aborted and should be retried (error level).
pub fn emit_reconcile_aborted(run_id: &str, error: &ReconcileError, report: &ReconcileReport) {
    error!(
        event = "reconcile.aborted",
        run_id = %run_id,
        error = %error,
        processed = report.processed,
        retryable = error.is_retryable(),
    );
}
