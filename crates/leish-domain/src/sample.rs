//! Captured sample images.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::element::{Coordinates, DiagnosticElement, DiagnosticElementName};
use crate::error::StageError;
use crate::stage::{AnalysisStage, RemoteOutcome, StageEvent};

/// Repository key of an image: (diagnosis id, sample index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SampleKey {
    pub diagnosis: Uuid,
    pub sample: u32,
}

impl SampleKey {
    pub fn new(diagnosis: Uuid, sample: u32) -> Self {
        Self { diagnosis, sample }
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.diagnosis, self.sample)
    }
}

/// Identity and capture information of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Diagnosis (case) the image belongs to.
    pub diagnosis: Uuid,
    /// Sample index within the diagnosis.
    pub sample: u32,
    /// Capture time; unknown for records synthesized from remote results.
    pub captured_at: Option<DateTime<Utc>>,
}

impl ImageMetadata {
    pub fn key(&self) -> SampleKey {
        SampleKey::new(self.diagnosis, self.sample)
    }
}

/// One captured image, its analysis stage and its findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSample {
    pub metadata: ImageMetadata,
    pub stage: AnalysisStage,
    pub elements: BTreeSet<DiagnosticElement>,
}

impl ImageSample {
    /// Freshly captured image, not yet submitted.
    pub fn new(diagnosis: Uuid, sample: u32, captured_at: DateTime<Utc>) -> Self {
        Self {
            metadata: ImageMetadata {
                diagnosis,
                sample,
                captured_at: Some(captured_at),
            },
            stage: AnalysisStage::NotAnalyzed,
            elements: BTreeSet::new(),
        }
    }

    /// Stand-in for an image that has no local record yet.
    pub fn placeholder(key: SampleKey) -> Self {
        Self {
            metadata: ImageMetadata {
                diagnosis: key.diagnosis,
                sample: key.sample,
                captured_at: None,
            },
            stage: AnalysisStage::NotAnalyzed,
            elements: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> SampleKey {
        self.metadata.key()
    }

    /// Apply a local stage event; the stage is unchanged on error.
    pub fn transition(&mut self, event: StageEvent) -> Result<AnalysisStage, StageError> {
        self.stage = self.stage.transition(event)?;
        Ok(self.stage)
    }

    /// Apply a remote analysis outcome (see [`AnalysisStage::settle`]).
    pub fn settle(&mut self, outcome: RemoteOutcome) -> AnalysisStage {
        self.stage = self.stage.settle(outcome);
        self.stage
    }

    /// Replace every model element; specialist elements are kept.
    pub fn with_model_elements(
        mut self,
        elements: impl IntoIterator<Item = DiagnosticElement>,
    ) -> Self {
        self.elements.retain(|e| !e.is_model());
        self.elements
            .extend(elements.into_iter().filter(DiagnosticElement::is_model));
        self
    }

    pub fn model_elements(&self) -> impl Iterator<Item = &DiagnosticElement> {
        self.elements.iter().filter(|e| e.is_model())
    }

    pub fn specialist_elements(&self) -> impl Iterator<Item = &DiagnosticElement> {
        self.elements.iter().filter(|e| !e.is_model())
    }

    /// Set (or clear with `None`) the specialist count for `name`.
    pub fn set_specialist_amount(&mut self, name: &DiagnosticElementName, amount: Option<u32>) {
        self.elements
            .retain(|e| e.is_model() || e.name() != name);
        if let Some(amount) = amount {
            self.elements
                .insert(DiagnosticElement::specialist(name.clone(), amount));
        }
    }

    /// Erase a single model detection. Returns whether anything was removed.
    pub fn remove_model_coordinate(
        &mut self,
        name: &DiagnosticElementName,
        at: Coordinates,
    ) -> bool {
        let Some(found) = self
            .elements
            .iter()
            .find(|e| match e {
                DiagnosticElement::Model { name: n, coordinates } => {
                    n == name && coordinates.contains(&at)
                }
                DiagnosticElement::Specialist { .. } => false,
            })
            .cloned()
        else {
            return false;
        };

        self.elements.remove(&found);
        if let DiagnosticElement::Model { name, mut coordinates } = found {
            coordinates.remove(&at);
            self.elements
                .insert(DiagnosticElement::Model { name, coordinates });
        }
        true
    }
}
