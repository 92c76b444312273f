//! Disease policies.
//!
//! A disease declares the diagnostic elements that may appear in its images
//! and turns aggregated [`Tallies`] into a model verdict. Diseases are
//! registered explicitly in a [`DiseaseRegistry`]; nothing is discovered at
//! run time.

pub mod builtin;
pub mod registry;

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregation::Tallies;
use crate::element::DiagnosticElementName;

pub use builtin::{LeishmaniasisGiemsa, MockDots};
pub use registry::{DiseaseRegistry, DiseaseRegistryBuilder};

/// Disease identifier, e.g. `leishmaniasis.giemsa`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiseaseId(pub String);

impl DiseaseId {
    pub fn new(id: impl Into<String>) -> Self {
        DiseaseId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DiseaseId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiseaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered disease definition.
pub trait Disease: Send + Sync + fmt::Debug {
    fn id(&self) -> &DiseaseId;

    fn display_name(&self) -> &str;

    /// The finite vocabulary of element names valid for this disease.
    fn elements(&self) -> &BTreeSet<DiagnosticElementName>;

    /// Model-side verdict for the aggregated findings of a case.
    fn model_verdict(&self, tallies: &Tallies) -> bool;
}
