//! Error taxonomy of the result pipeline.
//!
//! Per-envelope problems are [`AnalysisError`]s; only a persistence failure
//! among them is fatal. A run that has to stop returns a [`RunAborted`]
//! carrying the [`ReconcileError`] and the envelopes committed before it;
//! the host scheduler treats it as "retry later".

use leish_domain::SampleKey;
use leish_state::StorageError;
use thiserror::Error;

use crate::reconciler::ReconcileReport;

/// The analysis service or its result stream broke.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("analysis stream I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("analysis service unavailable: {0}")]
    Unavailable(String),
}

/// Failure while folding one envelope into the store.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The service could not deliver a result for this image. The image is
    /// left untouched.
    #[error("transport failure for sample {key}: {message}")]
    Transport { key: SampleKey, message: String },

    /// The service analyzed the image and reported it as unanalyzable. The
    /// image is recorded as `ResultError`.
    #[error("analysis failed for sample {key}: {message}")]
    StructuredAnalysis { key: SampleKey, message: String },

    /// The envelope could not be decoded or names unknown elements.
    #[error("unusable envelope: {0}")]
    UnknownEnvelope(String),

    /// Reading or writing the image failed; later updates can no longer be
    /// trusted to land in order.
    #[error("persisting sample {key} failed: {source}")]
    Persistence {
        key: SampleKey,
        #[source]
        source: StorageError,
    },
}

impl AnalysisError {
    /// Whether this error must stop the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::Persistence { .. })
    }

    /// Target image, when the envelope got far enough to name one.
    pub fn key(&self) -> Option<SampleKey> {
        match self {
            AnalysisError::Transport { key, .. }
            | AnalysisError::StructuredAnalysis { key, .. }
            | AnalysisError::Persistence { key, .. } => Some(*key),
            AnalysisError::UnknownEnvelope(_) => None,
        }
    }
}

/// Why a reconciliation run stopped early.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("result stream failed: {0}")]
    Transport(#[from] TransportError),

    #[error("persisting sample {key} failed: {source}")]
    Persistence {
        key: SampleKey,
        #[source]
        source: StorageError,
    },
}

impl ReconcileError {
    /// Both kinds of abort are cured by restarting the run: every envelope
    /// fully determines its image, so a replay converges.
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// A run that stopped early, with the tally of what it committed first.
#[derive(Error, Debug)]
#[error("reconcile run aborted after {} envelopes: {}", .report.processed, .error)]
pub struct RunAborted {
    #[source]
    pub error: ReconcileError,
    pub report: ReconcileReport,
}

impl RunAborted {
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}

/// Result type for leish-core operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn key() -> SampleKey {
        SampleKey::new(Uuid::nil(), 3)
    }

    #[test]
    fn only_persistence_is_fatal() {
        let errors = [
            AnalysisError::Transport {
                key: key(),
                message: "timeout".into(),
            },
            AnalysisError::StructuredAnalysis {
                key: key(),
                message: "blurry".into(),
            },
            AnalysisError::UnknownEnvelope("garbage".into()),
        ];
        assert!(errors.iter().all(|e| !e.is_fatal()));

        let fatal = AnalysisError::Persistence {
            key: key(),
            source: StorageError::Backend("disk full".into()),
        };
        assert!(fatal.is_fatal());
        assert_eq!(fatal.key(), Some(key()));
    }

    #[test]
    fn unknown_envelope_has_no_key() {
        assert_eq!(AnalysisError::UnknownEnvelope("x".into()).key(), None);
    }

    #[test]
    fn run_aborts_are_retryable() {
        let err = ReconcileError::from(TransportError::Unavailable("offline".into()));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn aborted_run_keeps_its_report() {
        let aborted = RunAborted {
            error: TransportError::Unavailable("reset".into()).into(),
            report: ReconcileReport {
                processed: 2,
                analyzed: 2,
                ..ReconcileReport::default()
            },
        };
        assert!(aborted.is_retryable());
        assert_eq!(aborted.report.analyzed, 2);
        assert!(aborted.to_string().contains("after 2 envelopes"));
        assert!(aborted.to_string().contains("reset"));
    }
}
