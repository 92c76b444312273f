//! Diagnosis cases.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregation::{compute_tallies, Tallies};
use crate::completion;
use crate::disease::{Disease, DiseaseRegistry};
use crate::error::{DomainError, Result};
use crate::sample::ImageSample;

/// Serialize a disease as its id; resolve it against the global registry on
/// the way back in.
mod disease_ref {
    use std::sync::Arc;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::disease::{Disease, DiseaseRegistry};

    pub fn serialize<S>(disease: &Arc<dyn Disease>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(disease.id().as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<dyn Disease>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = String::deserialize(deserializer)?;
        DiseaseRegistry::global()
            .lookup(&id)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown disease: {id}")))
    }
}

/// A diagnosis case: one disease, the images captured for it, and the two
/// verdicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,

    #[serde(with = "disease_ref")]
    pub disease: Arc<dyn Disease>,

    /// Entered by the reviewing specialist; never derived.
    pub specialist_result: bool,

    /// Derived from the tallies by [`Diagnosis::with_verdict`].
    pub model_result: bool,

    pub remarks: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Images in capture order. Sample indices are not deduplicated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageSample>,
}

impl Diagnosis {
    /// Empty case, created before the diagnosis session starts.
    pub fn new(disease: Arc<dyn Disease>) -> Self {
        Self {
            id: Uuid::new_v4(),
            disease,
            specialist_result: false,
            model_result: false,
            remarks: None,
            created_at: Utc::now(),
            images: Vec::new(),
        }
    }

    /// Case for a disease id registered in the global registry.
    pub fn for_disease(disease_id: &str) -> Result<Self> {
        DiseaseRegistry::global()
            .lookup(disease_id)
            .map(Self::new)
            .ok_or_else(|| DomainError::UnknownDisease(disease_id.to_string()))
    }

    /// Number of images in the case.
    pub fn samples(&self) -> usize {
        self.images.len()
    }

    /// Copy of the case with `image` appended after the existing ones.
    pub fn append_image(mut self, image: ImageSample) -> Self {
        self.images.push(image);
        self
    }

    /// First image carrying `sample` as its index.
    pub fn image(&self, sample: u32) -> Option<&ImageSample> {
        self.images.iter().find(|i| i.metadata.sample == sample)
    }

    pub fn tallies(&self) -> Tallies {
        compute_tallies(&self.images)
    }

    /// Every image is analyzed (vacuously true without images).
    pub fn completed(&self) -> bool {
        completion::is_completed(&self.images)
    }

    /// Copy of the case with `model_result` recomputed from the current images.
    pub fn with_verdict(&self) -> Self {
        completion::with_verdict(self)
    }

    /// Copy of the case carrying the specialist's verdict.
    pub fn with_specialist_result(mut self, result: bool) -> Self {
        self.specialist_result = result;
        self
    }
}

impl PartialEq for Diagnosis {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.disease.id() == other.disease.id()
            && self.specialist_result == other.specialist_result
            && self.model_result == other.model_result
            && self.remarks == other.remarks
            && self.created_at == other.created_at
            && self.images == other.images
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::MockDots;

    fn case() -> Diagnosis {
        Diagnosis::for_disease(MockDots::ID).unwrap()
    }

    #[test]
    fn new_case_has_no_images() {
        let diagnosis = case();
        assert_eq!(diagnosis.samples(), 0);
        assert!(!diagnosis.specialist_result);
        assert!(!diagnosis.model_result);
    }

    #[test]
    fn unknown_disease_is_rejected() {
        let err = Diagnosis::for_disease("no.such.disease").unwrap_err();
        assert!(matches!(err, DomainError::UnknownDisease(_)));
    }

    #[test]
    fn samples_counts_images() {
        let mut diagnosis = case();
        for i in 0..10 {
            let id = diagnosis.id;
            diagnosis = diagnosis.append_image(ImageSample::new(id, i, Utc::now()));
        }
        assert_eq!(diagnosis.samples(), 10);
    }

    #[test]
    fn image_lookup_by_sample_index() {
        let diagnosis = case();
        let id = diagnosis.id;
        let diagnosis = diagnosis
            .append_image(ImageSample::new(id, 3, Utc::now()))
            .append_image(ImageSample::new(id, 7, Utc::now()));
        assert_eq!(diagnosis.image(7).unwrap().metadata.sample, 7);
        assert!(diagnosis.image(1).is_none());
    }

    #[test]
    fn serializes_disease_as_id() {
        let diagnosis = case();
        let json = serde_json::to_value(&diagnosis).unwrap();
        assert_eq!(json["disease"], serde_json::json!(MockDots::ID));
    }

    #[test]
    fn deserialization_resolves_disease_from_registry() {
        let diagnosis = case().with_specialist_result(true);
        let json = serde_json::to_string(&diagnosis).unwrap();
        let back: Diagnosis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diagnosis);
        assert_eq!(back.disease.id().as_str(), MockDots::ID);
    }

    #[test]
    fn deserialization_rejects_unknown_disease() {
        let mut json = serde_json::to_value(case()).unwrap();
        json["disease"] = serde_json::json!("no.such.disease");
        assert!(serde_json::from_value::<Diagnosis>(json).is_err());
    }
}
