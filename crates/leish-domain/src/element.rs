//! Diagnostic elements: findings attached to a sample image.
//!
//! A finding is either machine-detected ([`DiagnosticElement::Model`], a set of
//! image coordinates) or confirmed by a specialist
//! ([`DiagnosticElement::Specialist`], an explicit count). Both carry a
//! [`DiagnosticElementName`] and expose the same `name()` / `amount()` view.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ElementNameError;

/// Pixel position of a detection inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

impl Coordinates {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Coordinates {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Coordinates> for (i32, i32) {
    fn from(c: Coordinates) -> Self {
        (c.x, c.y)
    }
}

/// Globally unique element identifier of the form `<disease>:<element>`.
///
/// Cloning is cheap (shared string). Equality, ordering and hashing only look
/// at the identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagnosticElementName(Arc<str>);

impl DiagnosticElementName {
    /// Validate and wrap an identifier.
    pub fn parse(id: impl AsRef<str>) -> std::result::Result<Self, ElementNameError> {
        let id = id.as_ref();
        match id.split_once(':') {
            Some((disease, element))
                if !disease.is_empty() && !element.is_empty() && !element.contains(':') =>
            {
                Ok(Self(Arc::from(id)))
            }
            _ => Err(ElementNameError::Malformed(id.to_string())),
        }
    }

    /// Full identifier, e.g. `leishmaniasis.giemsa:parasite`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `<disease>` part.
    pub fn disease(&self) -> &str {
        self.0.split_once(':').map(|(d, _)| d).unwrap_or_default()
    }

    /// The `<element>` part.
    pub fn element(&self) -> &str {
        self.0.split_once(':').map(|(_, e)| e).unwrap_or_default()
    }
}

impl Borrow<str> for DiagnosticElementName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagnosticElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DiagnosticElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DiagnosticElementName({})", self.0)
    }
}

impl Serialize for DiagnosticElementName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DiagnosticElementName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DiagnosticElementName::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// Who produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Model,
    Specialist,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Model => write!(f, "model"),
            ElementKind::Specialist => write!(f, "specialist"),
        }
    }
}

/// A single diagnostic finding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DiagnosticElement {
    /// Machine-detected; one entry per distinct detection coordinate.
    Model {
        name: DiagnosticElementName,
        coordinates: BTreeSet<Coordinates>,
    },
    /// Counted by a specialist during review.
    Specialist {
        name: DiagnosticElementName,
        amount: u32,
    },
}

impl DiagnosticElement {
    /// Model element from raw detections; duplicates collapse.
    pub fn model(
        name: DiagnosticElementName,
        coordinates: impl IntoIterator<Item = Coordinates>,
    ) -> Self {
        DiagnosticElement::Model {
            name,
            coordinates: coordinates.into_iter().collect(),
        }
    }

    pub fn specialist(name: DiagnosticElementName, amount: u32) -> Self {
        DiagnosticElement::Specialist { name, amount }
    }

    pub fn name(&self) -> &DiagnosticElementName {
        match self {
            DiagnosticElement::Model { name, .. } | DiagnosticElement::Specialist { name, .. } => {
                name
            }
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            DiagnosticElement::Model { .. } => ElementKind::Model,
            DiagnosticElement::Specialist { .. } => ElementKind::Specialist,
        }
    }

    /// Number of findings. For model elements this is the number of distinct
    /// coordinates.
    pub fn amount(&self) -> u32 {
        match self {
            DiagnosticElement::Model { coordinates, .. } => {
                u32::try_from(coordinates.len()).unwrap_or(u32::MAX)
            }
            DiagnosticElement::Specialist { amount, .. } => *amount,
        }
    }

    pub fn is_model(&self) -> bool {
        self.kind() == ElementKind::Model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(id: &str) -> DiagnosticElementName {
        DiagnosticElementName::parse(id).unwrap()
    }

    #[test]
    fn parse_accepts_disease_element_form() {
        let n = name("leishmaniasis.giemsa:parasite");
        assert_eq!(n.disease(), "leishmaniasis.giemsa");
        assert_eq!(n.element(), "parasite");
        assert_eq!(n.to_string(), "leishmaniasis.giemsa:parasite");
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        for bad in ["", "parasite", ":parasite", "disease:", "a:b:c"] {
            assert!(
                DiagnosticElementName::parse(bad).is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn names_compare_by_identifier() {
        assert_eq!(name("mock.dots:dot"), name("mock.dots:dot"));
        assert_ne!(name("mock.dots:dot"), name("mock.dots:other"));
    }

    #[test]
    fn model_amount_counts_distinct_coordinates() {
        let element = DiagnosticElement::model(
            name("mock.dots:dot"),
            [
                Coordinates::new(0, 0),
                Coordinates::new(1, 1),
                Coordinates::new(0, 0),
            ],
        );
        assert_eq!(element.amount(), 2);
        assert_eq!(element.kind(), ElementKind::Model);
    }

    #[test]
    fn specialist_amount_is_explicit() {
        let element = DiagnosticElement::specialist(name("mock.dots:dot"), 7);
        assert_eq!(element.amount(), 7);
        assert_eq!(element.kind(), ElementKind::Specialist);
    }

    #[test]
    fn specialist_element_serializes_with_kind_tag() {
        let element = DiagnosticElement::specialist(name("mock.dots:dot"), 3);
        let json = serde_json::to_string(&element).unwrap();
        assert_eq!(json, r#"{"kind":"specialist","name":"mock.dots:dot","amount":3}"#);
    }

    #[test]
    fn model_element_coordinates_serialize_as_pairs() {
        let element = DiagnosticElement::model(name("mock.dots:dot"), [Coordinates::new(4, 5)]);
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["coordinates"], serde_json::json!([[4, 5]]));
    }

    #[test]
    fn deserializing_malformed_name_fails() {
        let err = serde_json::from_str::<DiagnosticElement>(
            r#"{"kind":"specialist","name":"nocolon","amount":1}"#,
        );
        assert!(err.is_err());
    }
}
