//! Diseases shipped with the application.

use std::collections::BTreeSet;

use crate::aggregation::Tallies;
use crate::element::{DiagnosticElementName, ElementKind};
use crate::error::ElementNameError;

use super::{Disease, DiseaseId};

fn vocabulary(
    disease: &DiseaseId,
    elements: &[&str],
) -> Result<BTreeSet<DiagnosticElementName>, ElementNameError> {
    elements
        .iter()
        .map(|e| DiagnosticElementName::parse(format!("{disease}:{e}")))
        .collect()
}

/// Giemsa-stained smear for cutaneous leishmaniasis.
///
/// Positive when any amastigote is counted. A specialist count, when present,
/// overrides the model count for the same element.
#[derive(Debug, Clone)]
pub struct LeishmaniasisGiemsa {
    id: DiseaseId,
    elements: BTreeSet<DiagnosticElementName>,
    parasite: DiagnosticElementName,
}

impl LeishmaniasisGiemsa {
    pub const ID: &'static str = "leishmaniasis.giemsa";

    pub fn new() -> Result<Self, ElementNameError> {
        let id = DiseaseId::new(Self::ID);
        let elements = vocabulary(&id, &["parasite"])?;
        let parasite = DiagnosticElementName::parse(format!("{id}:parasite"))?;
        Ok(Self {
            id,
            elements,
            parasite,
        })
    }

    pub fn parasite(&self) -> &DiagnosticElementName {
        &self.parasite
    }
}

impl Disease for LeishmaniasisGiemsa {
    fn id(&self) -> &DiseaseId {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Leishmaniasis (Giemsa)"
    }

    fn elements(&self) -> &BTreeSet<DiagnosticElementName> {
        &self.elements
    }

    fn model_verdict(&self, tallies: &Tallies) -> bool {
        tallies
            .get(&self.parasite, ElementKind::Specialist)
            .or_else(|| tallies.get(&self.parasite, ElementKind::Model))
            .is_some_and(|n| n > 0)
    }
}

/// Synthetic disease used for tests and demos: counts dots.
#[derive(Debug, Clone)]
pub struct MockDots {
    id: DiseaseId,
    elements: BTreeSet<DiagnosticElementName>,
    dot: DiagnosticElementName,
    threshold: u64,
}

impl MockDots {
    pub const ID: &'static str = "mock.dots";
    pub const DEFAULT_THRESHOLD: u64 = 1;

    pub fn new() -> Result<Self, ElementNameError> {
        Self::with_threshold(Self::DEFAULT_THRESHOLD)
    }

    /// Positive once the model found at least `threshold` dots.
    pub fn with_threshold(threshold: u64) -> Result<Self, ElementNameError> {
        let id = DiseaseId::new(Self::ID);
        let elements = vocabulary(&id, &["dot"])?;
        let dot = DiagnosticElementName::parse(format!("{id}:dot"))?;
        Ok(Self {
            id,
            elements,
            dot,
            threshold,
        })
    }

    pub fn dot(&self) -> &DiagnosticElementName {
        &self.dot
    }
}

impl Disease for MockDots {
    fn id(&self) -> &DiseaseId {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Mock dots"
    }

    fn elements(&self) -> &BTreeSet<DiagnosticElementName> {
        &self.elements
    }

    fn model_verdict(&self, tallies: &Tallies) -> bool {
        tallies.get(&self.dot, ElementKind::Model).unwrap_or(0) >= self.threshold
    }
}
