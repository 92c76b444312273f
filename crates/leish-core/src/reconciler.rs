//! Folds the analysis result stream into the samples store.
//!
//! The reconciler is a single sequential consumer: envelopes for the same
//! image must land in arrival order, so nothing here runs concurrently.
//! Every envelope fully determines the final state of its image (except for
//! specialist counts, which are never touched), so replaying an envelope or
//! restarting a run from the start of the stream converges to the same store.
//!
//! A human edit racing with an in-flight envelope for the same image is not
//! guarded against beyond the repository's per-key upsert atomicity.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use leish_domain::{AnalysisStage, DiseaseRegistry, ImageSample, RemoteOutcome, SampleKey};
use leish_state::{SamplesRepository, StorageError};
use serde::Serialize;
use tracing::{debug, instrument, Instrument};
use uuid::Uuid;

use crate::envelope::{AnalysisEnvelope, Verdict};
use crate::error::{AnalysisError, ReconcileError, RunAborted, TransportError};
use crate::metrics::METRICS;
use crate::obs::{
    emit_analysis_failed, emit_envelope_applied, emit_envelope_skipped, emit_reconcile_aborted,
    emit_reconcile_finished, emit_reconcile_started, ReconcileSpan,
};

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Envelopes taken off the stream and fully handled
    pub processed: u64,
    /// Images persisted as `Analyzed`
    pub analyzed: u64,
    /// Images persisted as `ResultError`
    pub failed: u64,
    /// Envelopes dropped without touching the store
    pub skipped: u64,
    /// The host stopped the run before the stream ended
    pub cancelled: bool,
}

/// An envelope that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub key: SampleKey,
    pub stage: AnalysisStage,
    /// Service message for images recorded as `ResultError`
    pub message: Option<String>,
}

pub struct Reconciler<R: SamplesRepository + ?Sized> {
    repo: Arc<R>,
    registry: DiseaseRegistry,
}

impl<R: SamplesRepository + ?Sized> Reconciler<R> {
    /// Reconciler resolving element names against the global registry.
    pub fn new(repo: Arc<R>) -> Self {
        Self::with_registry(repo, DiseaseRegistry::global().clone())
    }

    pub fn with_registry(repo: Arc<R>, registry: DiseaseRegistry) -> Self {
        Self { repo, registry }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Drain `stream` until it ends.
    pub async fn run<S>(&self, stream: S) -> Result<ReconcileReport, RunAborted>
    where
        S: Stream<Item = Result<AnalysisEnvelope, TransportError>>,
    {
        self.run_until(stream, std::future::pending()).await
    }

    /// Drain `stream` until it ends or `shutdown` resolves.
    ///
    /// Shutdown is observed while waiting for the next envelope and while an
    /// envelope is being applied. An envelope interrupted before its upsert
    /// leaves no trace; its upsert is a single atomic write.
    pub async fn run_until<S, F>(
        &self,
        stream: S,
        shutdown: F,
    ) -> Result<ReconcileReport, RunAborted>
    where
        S: Stream<Item = Result<AnalysisEnvelope, TransportError>>,
        F: Future<Output = ()>,
    {
        let run_id = Uuid::new_v4().to_string();
        let span = ReconcileSpan::new(&run_id);
        self.drive(&run_id, stream, shutdown)
            .instrument(span.span().clone())
            .await
    }

    async fn drive<S, F>(
        &self,
        run_id: &str,
        stream: S,
        shutdown: F,
    ) -> Result<ReconcileReport, RunAborted>
    where
        S: Stream<Item = Result<AnalysisEnvelope, TransportError>>,
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let mut report = ReconcileReport::default();
        emit_reconcile_started(run_id);

        tokio::pin!(stream);
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    report.cancelled = true;
                    break;
                }
                next = stream.next() => next,
            };

            let envelope = match next {
                None => break,
                Some(Ok(envelope)) => envelope,
                Some(Err(e)) => {
                    return Err(abort(run_id, ReconcileError::Transport(e), report));
                }
            };

            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    report.cancelled = true;
                    break;
                }
                outcome = self.apply(&envelope) => outcome,
            };

            report.processed += 1;
            METRICS.inc_envelopes_processed();

            match outcome {
                Ok(applied) => {
                    METRICS.inc_envelopes_applied();
                    match applied.stage {
                        AnalysisStage::ResultError => {
                            report.failed += 1;
                            METRICS.inc_analysis_failures();
                            emit_analysis_failed(
                                run_id,
                                &AnalysisError::StructuredAnalysis {
                                    key: applied.key,
                                    message: applied.message.unwrap_or_default(),
                                },
                            );
                        }
                        _ => report.analyzed += 1,
                    }
                    emit_envelope_applied(run_id, &applied.key, applied.stage);
                }
                Err(AnalysisError::Persistence { key, source }) => {
                    let err = ReconcileError::Persistence { key, source };
                    return Err(abort(run_id, err, report));
                }
                Err(e) => {
                    report.skipped += 1;
                    METRICS.inc_envelopes_skipped();
                    emit_envelope_skipped(run_id, &e);
                }
            }
        }

        emit_reconcile_finished(run_id, millis(start.elapsed()), &report);
        METRICS.flush();
        Ok(report)
    }

    /// Fold one envelope into the store.
    ///
    /// Decoding happens before the repository is touched, so an unusable
    /// envelope never causes a read or a write.
    #[instrument(skip_all, fields(sample = ?envelope.key()))]
    pub async fn apply(&self, envelope: &AnalysisEnvelope) -> Result<Applied, AnalysisError> {
        let decoded = envelope.decode(&self.registry)?;
        let key = decoded.key;

        let (outcome, elements, message) = match decoded.verdict {
            Verdict::Analyzed(elements) => (RemoteOutcome::Analyzed, Some(elements), None),
            Verdict::Rejected(message) => (RemoteOutcome::AnalysisFailed, None, Some(message)),
            Verdict::Undelivered(message) => {
                return Err(AnalysisError::Transport { key, message });
            }
        };

        let persistence = |source: StorageError| AnalysisError::Persistence { key, source };

        let mut image = match self.repo.find(&key).await.map_err(persistence)? {
            Some(image) => image,
            None => {
                debug!(sample = %key, "no stored image, creating placeholder");
                ImageSample::placeholder(key)
            }
        };

        if let Some(elements) = elements {
            image = image.with_model_elements(elements);
        }
        let stage = image.settle(outcome);

        self.repo.upsert(&image).await.map_err(persistence)?;

        Ok(Applied {
            key,
            stage,
            message,
        })
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn abort(run_id: &str, error: ReconcileError, report: ReconcileReport) -> RunAborted {
    METRICS.inc_runs_aborted();
    emit_reconcile_aborted(run_id, &error, &report);
    METRICS.flush();
    RunAborted { error, report }
}
