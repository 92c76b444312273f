//! Leish-Core: remote analysis result reconciliation
//!
//! Drains the analysis service's result stream into the samples store:
//!
//! - `AnalysisEnvelope`: one result (success, structured failure, transport
//!   failure) and its decoding against the disease registry
//! - `AnalysisService` / `JsonLinesSource`: where envelopes come from
//! - `Reconciler`: the single sequential consumer
//! - `ReconcileWorker` / `WorkOutcome`: the task body and its contract with
//!   the host scheduler
//! - `metrics`, `obs`, `telemetry`: counters, structured events, subscriber
//!   setup

pub mod envelope;
pub mod error;
pub mod metrics;
pub mod obs;
pub mod reconciler;
pub mod service;
pub mod telemetry;
pub mod worker;

pub use envelope::{AnalysisEnvelope, DecodedEnvelope, FailureKind, RawElement, Verdict};
pub use error::{AnalysisError, ReconcileError, Result, RunAborted, TransportError};
pub use metrics::{Metrics, METRICS};
pub use obs::{
    emit_analysis_failed, emit_envelope_applied, emit_envelope_skipped, emit_reconcile_aborted,
    emit_reconcile_finished, emit_reconcile_started, ReconcileSpan,
};
pub use reconciler::{Applied, ReconcileReport, Reconciler};
pub use service::{AnalysisService, EnvelopeStream, JsonLinesSource};
pub use telemetry::init_tracing;
pub use worker::{
    ExistingWorkPolicy, NetworkRequirement, ReconcileWorker, WorkConstraints, WorkOutcome,
    WorkRequest, RESULTS_WORK_NAME,
};
