//! Error types for diagnosis domain operations

use thiserror::Error;

use crate::stage::{AnalysisStage, StageEvent};

/// Rejected analysis stage change. The stage is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("illegal analysis stage transition: {from} --{event}--> ?")]
    IllegalTransition {
        from: AnalysisStage,
        event: StageEvent,
    },
}

/// A string that is not a valid `<disease>:<element>` identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElementNameError {
    #[error("element name must have the form <disease>:<element>, got {0:?}")]
    Malformed(String),

    #[error("element name {name} does not belong to disease {disease}")]
    ForeignDisease { name: String, disease: String },
}

/// Problems detected while building the disease registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("disease registered twice: {0}")]
    DuplicateDisease(String),

    #[error("diagnostic element registered twice: {0}")]
    DuplicateElement(String),

    #[error("disease {0} declares no diagnostic elements")]
    EmptyVocabulary(String),

    #[error(transparent)]
    InvalidElement(#[from] ElementNameError),
}

/// Diagnosis domain errors.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    ElementName(#[from] ElementNameError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("unknown disease: {0}")]
    UnknownDisease(String),
}

/// Result type for diagnosis domain operations
pub type Result<T> = std::result::Result<T, DomainError>;
