//! Task body handed to the host's background scheduler.
//!
//! The scheduler owns retries, backoff and environmental constraints; this
//! module only tells it whether the run finished or must be re-invoked, and
//! describes how the work should be enqueued.

use std::future::Future;
use std::sync::Arc;

use leish_state::SamplesRepository;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::reconciler::{ReconcileReport, Reconciler};
use crate::service::AnalysisService;

/// Unique name the result worker is enqueued under.
pub const RESULTS_WORK_NAME: &str = "remote-analysis-results";

/// Scheduler contract: done, or run me again later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOutcome {
    Success,
    Retry,
}

/// Network the work may run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkRequirement {
    Any,
    Connected,
    Unmetered,
}

/// What to do when work with the same name is already queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingWorkPolicy {
    Keep,
    Replace,
}

/// Conditions the host must satisfy before running the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkConstraints {
    pub network: NetworkRequirement,
    pub battery_not_low: bool,
}

/// How the host should enqueue a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRequest {
    pub name: String,
    pub policy: ExistingWorkPolicy,
    pub constraints: WorkConstraints,
}

impl WorkRequest {
    /// The result worker: one instance at a time, on unmetered network with
    /// enough battery.
    pub fn remote_results() -> Self {
        Self {
            name: RESULTS_WORK_NAME.to_string(),
            policy: ExistingWorkPolicy::Keep,
            constraints: WorkConstraints {
                network: NetworkRequirement::Unmetered,
                battery_not_low: true,
            },
        }
    }
}

/// Opens the result stream and drains it into the store.
pub struct ReconcileWorker<A: AnalysisService + ?Sized, R: SamplesRepository + ?Sized> {
    service: Arc<A>,
    reconciler: Reconciler<R>,
}

impl<A: AnalysisService + ?Sized, R: SamplesRepository + ?Sized> ReconcileWorker<A, R> {
    pub fn new(service: Arc<A>, reconciler: Reconciler<R>) -> Self {
        Self {
            service,
            reconciler,
        }
    }

    /// Run until the stream ends.
    pub async fn run(&self) -> (WorkOutcome, ReconcileReport) {
        self.run_until(std::future::pending()).await
    }

    /// Run until the stream ends or `shutdown` resolves. A cancelled run
    /// asks to be retried, since the stream was not drained.
    pub async fn run_until<F>(&self, shutdown: F) -> (WorkOutcome, ReconcileReport)
    where
        F: Future<Output = ()>,
    {
        let stream = match self.service.results().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "could not open analysis result stream");
                return (WorkOutcome::Retry, ReconcileReport::default());
            }
        };

        match self.reconciler.run_until(stream, shutdown).await {
            Ok(report) if report.cancelled => {
                info!(processed = report.processed, "result worker cancelled");
                (WorkOutcome::Retry, report)
            }
            Ok(report) => (WorkOutcome::Success, report),
            Err(aborted) => {
                warn!(
                    error = %aborted.error,
                    processed = aborted.report.processed,
                    retryable = aborted.is_retryable(),
                    "result worker aborted"
                );
                (WorkOutcome::Retry, aborted.report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{AnalysisEnvelope, RawElement};
    use crate::error::TransportError;
    use crate::service::{EnvelopeStream, JsonLinesSource};
    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};
    use leish_domain::{AnalysisStage, SampleKey};
    use leish_state::fakes::MemorySamplesRepository;
    use uuid::Uuid;

    struct Offline;

    #[async_trait]
    impl AnalysisService for Offline {
        async fn results(&self) -> Result<EnvelopeStream, TransportError> {
            Err(TransportError::Unavailable("no network".into()))
        }
    }

    fn reconciler() -> Reconciler<MemorySamplesRepository> {
        Reconciler::new(Arc::new(MemorySamplesRepository::new()))
    }

    /// Delivers one result, then loses the connection.
    struct DropsAfterFirst {
        diagnosis: Uuid,
    }

    #[async_trait]
    impl AnalysisService for DropsAfterFirst {
        async fn results(&self) -> Result<EnvelopeStream, TransportError> {
            let items = vec![
                Ok(AnalysisEnvelope::success(
                    self.diagnosis,
                    0,
                    vec![RawElement::new("mock.dots:dot", [(1, 1)])],
                )),
                Err(TransportError::Unavailable("connection reset".into())),
            ];
            Ok(stream::iter(items).boxed())
        }
    }

    #[test]
    fn remote_results_request_matches_scheduler_contract() {
        let request = WorkRequest::remote_results();
        assert_eq!(request.name, RESULTS_WORK_NAME);
        assert_eq!(request.policy, ExistingWorkPolicy::Keep);
        assert_eq!(request.constraints.network, NetworkRequirement::Unmetered);
        assert!(request.constraints.battery_not_low);
    }

    #[tokio::test]
    async fn unreachable_service_retries() {
        let worker = ReconcileWorker::new(Arc::new(Offline), reconciler());
        let (outcome, report) = worker.run().await;
        assert_eq!(outcome, WorkOutcome::Retry);
        assert_eq!(report, ReconcileReport::default());
    }

    #[tokio::test]
    async fn drained_stream_succeeds() {
        let source = JsonLinesSource::new(std::io::Cursor::new(b"junk\n".to_vec()));
        let worker = ReconcileWorker::new(Arc::new(source), reconciler());
        let (outcome, report) = worker.run().await;
        assert_eq!(outcome, WorkOutcome::Success);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn cancelled_run_retries() {
        let source = JsonLinesSource::new(std::io::Cursor::new(Vec::<u8>::new()));
        let worker = ReconcileWorker::new(Arc::new(source), reconciler());
        let (outcome, report) = worker.run_until(std::future::ready(())).await;
        assert_eq!(outcome, WorkOutcome::Retry);
        assert!(report.cancelled);
    }

    #[tokio::test]
    async fn aborted_run_reports_what_it_committed() {
        let id = Uuid::new_v4();
        let repo = Arc::new(MemorySamplesRepository::new());
        let worker = ReconcileWorker::new(
            Arc::new(DropsAfterFirst { diagnosis: id }),
            Reconciler::new(repo.clone()),
        );

        let (outcome, report) = worker.run().await;

        assert_eq!(outcome, WorkOutcome::Retry);
        assert_eq!(report.processed, 1);
        assert_eq!(report.analyzed, 1);
        assert!(!report.cancelled);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn non_utf8_line_does_not_block_later_results() {
        let id = Uuid::new_v4();
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(
            format!(
                "{{\"status\":\"ok\",\"diagnosis\":\"{id}\",\"sample\":0,\"elements\":[{{\"name\":\"mock.dots:dot\",\"coordinates\":[[1,1]]}}]}}\n"
            )
            .as_bytes(),
        );

        let repo = Arc::new(MemorySamplesRepository::new());
        for _ in 0..3 {
            let source = JsonLinesSource::new(std::io::Cursor::new(input.clone()));
            let worker = ReconcileWorker::new(Arc::new(source), Reconciler::new(repo.clone()));
            let (outcome, report) = worker.run().await;

            assert_eq!(outcome, WorkOutcome::Success);
            assert_eq!(report.skipped, 1);
            assert_eq!(report.analyzed, 1);
        }

        let stored = repo.find(&SampleKey::new(id, 0)).await.unwrap().unwrap();
        assert_eq!(stored.stage, AnalysisStage::Analyzed);
    }
}
