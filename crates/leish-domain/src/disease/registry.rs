//! Process-wide, read-only table of diseases.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use tracing::{debug, error};

use crate::element::DiagnosticElementName;
use crate::error::{ElementNameError, RegistryError};

use super::builtin::{LeishmaniasisGiemsa, MockDots};
use super::{Disease, DiseaseId};

static GLOBAL: OnceLock<DiseaseRegistry> = OnceLock::new();

/// Diseases and their element vocabularies, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct DiseaseRegistry {
    diseases: BTreeMap<DiseaseId, Arc<dyn Disease>>,
    elements: BTreeMap<DiagnosticElementName, DiseaseId>,
}

impl DiseaseRegistry {
    pub fn builder() -> DiseaseRegistryBuilder {
        DiseaseRegistryBuilder::default()
    }

    /// Registry with every disease shipped with the application.
    pub fn builtin() -> Result<Self, RegistryError> {
        Ok(Self::builder()
            .register(LeishmaniasisGiemsa::new()?)?
            .register(MockDots::new()?)?
            .build())
    }

    /// Install the process-wide registry. Must happen before the first
    /// [`DiseaseRegistry::global`] call; afterwards the table is frozen and
    /// the rejected registry is handed back.
    pub fn install(registry: DiseaseRegistry) -> Result<(), DiseaseRegistry> {
        GLOBAL.set(registry)
    }

    /// The process-wide registry, defaulting to [`DiseaseRegistry::builtin`].
    pub fn global() -> &'static DiseaseRegistry {
        GLOBAL.get_or_init(|| match DiseaseRegistry::builtin() {
            Ok(registry) => registry,
            Err(e) => {
                error!(error = %e, "built-in disease table rejected, registry left empty");
                DiseaseRegistry::default()
            }
        })
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Disease>> {
        self.diseases.get(id).cloned()
    }

    /// Element vocabulary of a disease.
    pub fn all_element_names(&self, id: &str) -> Option<&BTreeSet<DiagnosticElementName>> {
        self.diseases.get(id).map(|d| d.elements())
    }

    /// Resolve a raw element id to its registered name.
    pub fn element_name(&self, id: &str) -> Option<DiagnosticElementName> {
        self.elements.get_key_value(id).map(|(name, _)| name.clone())
    }

    /// Disease owning a registered element name.
    pub fn disease_of(&self, name: &DiagnosticElementName) -> Option<&DiseaseId> {
        self.elements.get(name)
    }

    pub fn diseases(&self) -> impl Iterator<Item = &Arc<dyn Disease>> {
        self.diseases.values()
    }

    pub fn len(&self) -> usize {
        self.diseases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }
}

/// Explicit, enumerable registration.
#[derive(Debug, Default)]
pub struct DiseaseRegistryBuilder {
    registry: DiseaseRegistry,
}

impl DiseaseRegistryBuilder {
    /// Add a disease. Ids and element names must be unique across the table,
    /// and every element must be prefixed by its disease id.
    pub fn register<D: Disease + 'static>(mut self, disease: D) -> Result<Self, RegistryError> {
        let id = disease.id().clone();
        if self.registry.diseases.contains_key(&id) {
            return Err(RegistryError::DuplicateDisease(id.to_string()));
        }
        if disease.elements().is_empty() {
            return Err(RegistryError::EmptyVocabulary(id.to_string()));
        }

        for name in disease.elements() {
            if name.disease() != id.as_str() {
                return Err(ElementNameError::ForeignDisease {
                    name: name.to_string(),
                    disease: id.to_string(),
                }
                .into());
            }
            if self.registry.elements.contains_key(name) {
                return Err(RegistryError::DuplicateElement(name.to_string()));
            }
        }

        for name in disease.elements() {
            self.registry.elements.insert(name.clone(), id.clone());
        }
        debug!(disease = %id, elements = disease.elements().len(), "registered disease");
        self.registry.diseases.insert(id, Arc::new(disease));
        Ok(self)
    }

    pub fn build(self) -> DiseaseRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Tallies;

    #[derive(Debug)]
    struct Fixed {
        id: DiseaseId,
        elements: BTreeSet<DiagnosticElementName>,
    }

    impl Fixed {
        fn new(id: &str, elements: &[&str]) -> Self {
            Self {
                id: DiseaseId::new(id),
                elements: elements
                    .iter()
                    .map(|e| DiagnosticElementName::parse(e).unwrap())
                    .collect(),
            }
        }
    }

    impl Disease for Fixed {
        fn id(&self) -> &DiseaseId {
            &self.id
        }
        fn display_name(&self) -> &str {
            "fixed"
        }
        fn elements(&self) -> &BTreeSet<DiagnosticElementName> {
            &self.elements
        }
        fn model_verdict(&self, _tallies: &Tallies) -> bool {
            true
        }
    }

    #[test]
    fn builtin_registry_lists_shipped_diseases() {
        let registry = DiseaseRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup(LeishmaniasisGiemsa::ID).is_some());
        assert!(registry.lookup(MockDots::ID).is_some());
        assert!(registry.lookup("unknown").is_none());
    }

    #[test]
    fn element_names_resolve_to_registered_handles() {
        let registry = DiseaseRegistry::builtin().unwrap();
        let name = registry.element_name("mock.dots:dot").unwrap();
        assert_eq!(name.as_str(), "mock.dots:dot");
        assert_eq!(registry.disease_of(&name).unwrap().as_str(), MockDots::ID);
        assert!(registry.element_name("mock.dots:square").is_none());
    }

    #[test]
    fn all_element_names_of_a_disease() {
        let registry = DiseaseRegistry::builtin().unwrap();
        let names = registry.all_element_names(LeishmaniasisGiemsa::ID).unwrap();
        assert_eq!(names.len(), 1);
        assert!(registry.all_element_names("nope").is_none());
    }

    #[test]
    fn duplicate_disease_is_rejected() {
        let err = DiseaseRegistry::builder()
            .register(Fixed::new("a", &["a:x"]))
            .unwrap()
            .register(Fixed::new("a", &["a:y"]))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateDisease("a".into()));
    }

    #[test]
    fn foreign_element_is_rejected() {
        let err = DiseaseRegistry::builder()
            .register(Fixed::new("a", &["b:x"]))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidElement(ElementNameError::ForeignDisease { .. })
        ));
    }

    #[test]
    fn empty_vocabulary_is_rejected() {
        let err = DiseaseRegistry::builder()
            .register(Fixed::new("a", &[]))
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyVocabulary("a".into()));
    }

    #[test]
    fn global_registry_is_built_once() {
        let first = DiseaseRegistry::global() as *const DiseaseRegistry;
        let second = DiseaseRegistry::global() as *const DiseaseRegistry;
        assert_eq!(first, second);
        assert!(!DiseaseRegistry::global().is_empty());
    }
}
