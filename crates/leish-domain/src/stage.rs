//! Per-image analysis lifecycle.
//!
//! ```text
//!  NotAnalyzed --Submit--> Analyzing --Complete--> Analyzed
//!                            |  ^  \--Reject----> ResultError --Submit--> Analyzing
//!                         Defer  Submit
//!                            v  |
//!                          Deferred
//!  (any) --DeliveryFailed--> DeliverError --Submit--> Analyzing
//! ```
//!
//! Local events go through [`AnalysisStage::transition`], which rejects every
//! move not in the table. Remote analysis results go through
//! [`AnalysisStage::settle`] instead.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// Lifecycle stage of a sample image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    #[default]
    NotAnalyzed,
    Analyzing,
    Deferred,
    Analyzed,
    ResultError,
    DeliverError,
}

/// Locally originated stage events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEvent {
    /// The image was handed to the analysis service.
    Submit,
    /// The service returned a result.
    Complete,
    /// The service reported that the image could not be analyzed.
    Reject,
    /// The service postponed the request.
    Defer,
    /// Uploading or submitting the image failed.
    DeliveryFailed,
}

/// Outcome reported by the remote analysis service for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOutcome {
    Analyzed,
    AnalysisFailed,
}

impl AnalysisStage {
    /// Apply a local event. Illegal moves return an error and leave the
    /// caller's stage as it was.
    pub fn transition(self, event: StageEvent) -> Result<AnalysisStage, StageError> {
        use AnalysisStage::*;
        use StageEvent::*;

        let next = match (self, event) {
            (_, DeliveryFailed) => Some(DeliverError),
            (NotAnalyzed | Deferred | ResultError | DeliverError, Submit) => Some(Analyzing),
            (Analyzing, Complete) => Some(Analyzed),
            (Analyzing, Reject) => Some(ResultError),
            (Analyzing, Defer) => Some(Deferred),
            _ => None,
        };

        next.ok_or(StageError::IllegalTransition { from: self, event })
    }

    /// Whether `event` is accepted from this stage.
    pub fn can_transition(self, event: StageEvent) -> bool {
        self.transition(event).is_ok()
    }

    /// Land on the stage dictated by a remote result.
    ///
    /// Remote results are authoritative for their image and are accepted from
    /// every stage, so a record that was never seen locally goes straight to
    /// its final stage and replaying a result is a no-op.
    pub fn settle(self, outcome: RemoteOutcome) -> AnalysisStage {
        match outcome {
            RemoteOutcome::Analyzed => AnalysisStage::Analyzed,
            RemoteOutcome::AnalysisFailed => AnalysisStage::ResultError,
        }
    }

    /// No further progress without an external action.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AnalysisStage::Analyzed | AnalysisStage::ResultError | AnalysisStage::DeliverError
        )
    }

    /// Terminal, but the image may be submitted again.
    pub fn is_recoverable(self) -> bool {
        matches!(self, AnalysisStage::ResultError | AnalysisStage::DeliverError)
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisStage::NotAnalyzed => "not_analyzed",
            AnalysisStage::Analyzing => "analyzing",
            AnalysisStage::Deferred => "deferred",
            AnalysisStage::Analyzed => "analyzed",
            AnalysisStage::ResultError => "result_error",
            AnalysisStage::DeliverError => "deliver_error",
        };
        f.write_str(s)
    }
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageEvent::Submit => "submit",
            StageEvent::Complete => "complete",
            StageEvent::Reject => "reject",
            StageEvent::Defer => "defer",
            StageEvent::DeliveryFailed => "delivery_failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnalysisStage::*;
    use StageEvent::*;

    const ALL_STAGES: [AnalysisStage; 6] = [
        NotAnalyzed,
        Analyzing,
        Deferred,
        Analyzed,
        ResultError,
        DeliverError,
    ];
    const ALL_EVENTS: [StageEvent; 5] = [Submit, Complete, Reject, Defer, DeliveryFailed];

    #[test]
    fn default_stage_is_not_analyzed() {
        assert_eq!(AnalysisStage::default(), NotAnalyzed);
    }

    #[test]
    fn happy_path() {
        let stage = NotAnalyzed.transition(Submit).unwrap();
        assert_eq!(stage, Analyzing);
        assert_eq!(stage.transition(Complete).unwrap(), Analyzed);
    }

    #[test]
    fn deferred_round_trip() {
        let stage = Analyzing.transition(Defer).unwrap();
        assert_eq!(stage, Deferred);
        assert_eq!(stage.transition(Submit).unwrap(), Analyzing);
    }

    #[test]
    fn recoverable_stages_can_be_resubmitted() {
        assert_eq!(ResultError.transition(Submit).unwrap(), Analyzing);
        assert_eq!(DeliverError.transition(Submit).unwrap(), Analyzing);
        assert!(ResultError.is_recoverable());
        assert!(DeliverError.is_recoverable());
        assert!(!Analyzed.is_recoverable());
    }

    #[test]
    fn delivery_failure_is_legal_from_every_stage() {
        for stage in ALL_STAGES {
            assert_eq!(stage.transition(DeliveryFailed).unwrap(), DeliverError);
        }
    }

    #[test]
    fn exactly_the_documented_transitions_are_legal() {
        let legal = [
            (NotAnalyzed, Submit),
            (Deferred, Submit),
            (ResultError, Submit),
            (DeliverError, Submit),
            (Analyzing, Complete),
            (Analyzing, Reject),
            (Analyzing, Defer),
        ];

        for stage in ALL_STAGES {
            for event in ALL_EVENTS {
                let expected = event == DeliveryFailed || legal.contains(&(stage, event));
                assert_eq!(
                    stage.can_transition(event),
                    expected,
                    "{stage} --{event}-->"
                );
            }
        }
    }

    #[test]
    fn illegal_transition_reports_origin() {
        let err = Analyzed.transition(Submit).unwrap_err();
        assert_eq!(
            err,
            StageError::IllegalTransition {
                from: Analyzed,
                event: Submit
            }
        );
        assert!(NotAnalyzed.transition(Complete).is_err());
    }

    #[test]
    fn settle_is_accepted_from_every_stage() {
        for stage in ALL_STAGES {
            assert_eq!(stage.settle(RemoteOutcome::Analyzed), Analyzed);
            assert_eq!(stage.settle(RemoteOutcome::AnalysisFailed), ResultError);
        }
    }

    #[test]
    fn stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ResultError).unwrap(),
            "\"result_error\""
        );
    }
}
