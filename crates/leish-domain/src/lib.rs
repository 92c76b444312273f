//! Leishmaniapp Diagnosis Domain Model
//!
//! Pure, synchronous building blocks of a diagnosis case:
//! - DiagnosticElement: a machine-detected or specialist-confirmed finding
//! - AnalysisStage: per-image analysis lifecycle and its legal transitions
//! - ImageSample: one captured image with its stage and findings
//! - Diagnosis: a case (disease + images + verdicts)
//! - Tallies: per element name, per kind aggregation over a case
//! - DiseaseRegistry: explicit table of diseases and their verdict policies
//!
//! Nothing here performs I/O; persistence and remote analysis live in
//! `leish-state` and `leish-core`.

pub mod aggregation;
pub mod completion;
pub mod diagnosis;
pub mod disease;
pub mod element;
pub mod error;
pub mod sample;
pub mod stage;

pub use aggregation::{compute_tallies, Tallies};
pub use completion::{is_completed, with_verdict};
pub use diagnosis::Diagnosis;
pub use disease::{Disease, DiseaseId, DiseaseRegistry, DiseaseRegistryBuilder, LeishmaniasisGiemsa, MockDots};
pub use element::{Coordinates, DiagnosticElement, DiagnosticElementName, ElementKind};
pub use error::{DomainError, ElementNameError, RegistryError, Result, StageError};
pub use sample::{ImageMetadata, ImageSample, SampleKey};
pub use stage::{AnalysisStage, RemoteOutcome, StageEvent};

/// Leishmaniapp domain version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
