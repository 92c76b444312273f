//! Case-level aggregation of diagnostic elements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::element::{DiagnosticElementName, ElementKind};
use crate::sample::ImageSample;

/// Per element name, per kind summed amounts over a set of images.
///
/// A kind with no elements for a name has no entry (never a zero entry), and
/// model and specialist counts are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tallies(BTreeMap<DiagnosticElementName, BTreeMap<ElementKind, u64>>);

impl Tallies {
    /// Summed amount for `name` and `kind`, if any element contributed.
    pub fn get(&self, name: &DiagnosticElementName, kind: ElementKind) -> Option<u64> {
        self.0.get(name).and_then(|by_kind| by_kind.get(&kind)).copied()
    }

    /// Every kind counted for `name`.
    pub fn by_kind(&self, name: &DiagnosticElementName) -> Option<&BTreeMap<ElementKind, u64>> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &DiagnosticElementName> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DiagnosticElementName, &BTreeMap<ElementKind, u64>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Flatten the elements of every image, group by name, then by kind, and sum
/// the amounts.
pub fn compute_tallies<'a, I>(images: I) -> Tallies
where
    I: IntoIterator<Item = &'a ImageSample>,
{
    let mut tallies: BTreeMap<DiagnosticElementName, BTreeMap<ElementKind, u64>> = BTreeMap::new();

    for element in images.into_iter().flat_map(|image| image.elements.iter()) {
        *tallies
            .entry(element.name().clone())
            .or_default()
            .entry(element.kind())
            .or_insert(0) += u64::from(element.amount());
    }

    Tallies(tallies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Coordinates, DiagnosticElement};
    use chrono::Utc;
    use uuid::Uuid;

    fn dot() -> DiagnosticElementName {
        DiagnosticElementName::parse("mock.dots:dot").unwrap()
    }

    fn image_with(elements: Vec<DiagnosticElement>) -> ImageSample {
        let mut image = ImageSample::new(Uuid::new_v4(), 0, Utc::now());
        image.elements.extend(elements);
        image
    }

    #[test]
    fn empty_input_gives_empty_tallies() {
        let tallies = compute_tallies(&Vec::<ImageSample>::new());
        assert!(tallies.is_empty());
    }

    #[test]
    fn kinds_are_reported_separately() {
        let images = vec![
            image_with(vec![
                DiagnosticElement::model(
                    dot(),
                    [
                        Coordinates::new(0, 0),
                        Coordinates::new(1, 1),
                        Coordinates::new(2, 2),
                    ],
                ),
                DiagnosticElement::specialist(dot(), 2),
            ]),
            image_with(vec![
                DiagnosticElement::model(dot(), [Coordinates::new(0, 0)]),
                DiagnosticElement::specialist(dot(), 3),
            ]),
        ];

        let tallies = compute_tallies(&images);

        assert_eq!(tallies.get(&dot(), ElementKind::Model), Some(4));
        assert_eq!(tallies.get(&dot(), ElementKind::Specialist), Some(5));
        assert_eq!(tallies.len(), 1);
    }

    #[test]
    fn missing_kind_is_absent_not_zero() {
        let images = vec![image_with(vec![DiagnosticElement::model(
            dot(),
            [Coordinates::new(0, 0)],
        )])];

        let tallies = compute_tallies(&images);

        assert_eq!(tallies.get(&dot(), ElementKind::Specialist), None);
        assert_eq!(tallies.by_kind(&dot()).unwrap().len(), 1);
    }

    #[test]
    fn empty_model_element_contributes_zero_entry_for_its_kind() {
        let images = vec![image_with(vec![DiagnosticElement::model(dot(), [])])];
        let tallies = compute_tallies(&images);
        assert_eq!(tallies.get(&dot(), ElementKind::Model), Some(0));
    }
}
