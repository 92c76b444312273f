//! Row layout of the `samples` table

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use leish_domain::{AnalysisStage, DiagnosticElement, ImageMetadata, ImageSample};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = date.map(SurrealDatetime::from);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

/// One stored image sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    /// SurrealDB record ID (`samples:[diagnosis, sample]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    /// Diagnosis UUID (string form)
    pub diagnosis: String,
    /// Sample index within the diagnosis
    pub sample: u32,
    /// Analysis stage, snake_case (e.g. "result_error")
    pub stage: String,
    /// Capture time; absent for placeholders created from remote results
    #[serde(default, with = "surreal_datetime_opt")]
    pub captured_at: Option<DateTime<Utc>>,
    /// Diagnostic elements (JSON)
    pub elements: serde_json::Value,
}

impl SampleRecord {
    /// Row for `sample`.
    pub fn from_sample(sample: &ImageSample) -> Result<Self, StorageError> {
        Ok(Self {
            id: None,
            diagnosis: sample.metadata.diagnosis.to_string(),
            sample: sample.metadata.sample,
            stage: stage_label(sample.stage)?,
            captured_at: sample.metadata.captured_at,
            elements: serde_json::to_value(&sample.elements)?,
        })
    }

    /// Domain image for this row.
    pub fn into_sample(self) -> Result<ImageSample, StorageError> {
        let diagnosis = Uuid::parse_str(&self.diagnosis).map_err(|e| {
            StorageError::Serialization(format!("bad diagnosis id {}: {e}", self.diagnosis))
        })?;
        let stage: AnalysisStage = serde_json::from_value(serde_json::Value::String(self.stage))
            .map_err(|e| StorageError::Serialization(format!("unknown stage: {e}")))?;
        let elements: BTreeSet<DiagnosticElement> = serde_json::from_value(self.elements)?;

        Ok(ImageSample {
            metadata: ImageMetadata {
                diagnosis,
                sample: self.sample,
                captured_at: self.captured_at,
            },
            stage,
            elements,
        })
    }
}

fn stage_label(stage: AnalysisStage) -> Result<String, StorageError> {
    match serde_json::to_value(stage)? {
        serde_json::Value::String(label) => Ok(label),
        other => Err(StorageError::Serialization(format!(
            "stage did not serialize to a label: {other}"
        ))),
    }
}
