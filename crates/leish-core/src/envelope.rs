//! Result envelopes produced by the analysis service.
//!
//! Wire shape (one JSON object per envelope):
//!
//! ```text
//! {"status":"ok","diagnosis":"<uuid>","sample":0,
//!  "elements":[{"name":"mock.dots:dot","coordinates":[[1,2],[3,4]]}]}
//! {"status":"error","diagnosis":"<uuid>","sample":1,
//!  "kind":"structured","message":"image out of focus"}
//! ```

use std::collections::{BTreeMap, BTreeSet};

use leish_domain::{Coordinates, DiagnosticElement, DiseaseRegistry, SampleKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalysisError;

/// One model finding as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawElement {
    pub name: String,
    #[serde(default)]
    pub coordinates: Vec<(i32, i32)>,
}

impl RawElement {
    pub fn new(name: impl Into<String>, coordinates: impl IntoIterator<Item = (i32, i32)>) -> Self {
        Self {
            name: name.into(),
            coordinates: coordinates.into_iter().collect(),
        }
    }
}

/// Failure class reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The image was analyzed and judged unanalyzable.
    Structured,
    /// The service could not get a result for the image at all.
    Transport,
}

/// One unit of the result stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum AnalysisEnvelope {
    #[serde(rename = "ok")]
    Success {
        diagnosis: Uuid,
        sample: u32,
        #[serde(default)]
        elements: Vec<RawElement>,
    },

    #[serde(rename = "error")]
    Failure {
        diagnosis: Uuid,
        sample: u32,
        kind: FailureKind,
        #[serde(default)]
        message: String,
    },

    /// Bytes that arrived on the stream but never formed an envelope.
    #[serde(skip)]
    Undecodable { reason: String },
}

/// What a decoded envelope asks the store to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Replace the image's model findings and mark it analyzed.
    Analyzed(Vec<DiagnosticElement>),
    /// Mark the image `ResultError`, findings untouched.
    Rejected(String),
    /// Leave the image alone.
    Undelivered(String),
}

/// An envelope whose every name has been resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    pub key: SampleKey,
    pub verdict: Verdict,
}

impl AnalysisEnvelope {
    /// Parse one wire line. Malformed input becomes
    /// [`AnalysisEnvelope::Undecodable`] rather than an error so one bad line
    /// never ends the stream.
    pub fn parse(line: &str) -> Self {
        serde_json::from_str(line).unwrap_or_else(|e| AnalysisEnvelope::Undecodable {
            reason: e.to_string(),
        })
    }

    pub fn success(diagnosis: Uuid, sample: u32, elements: Vec<RawElement>) -> Self {
        AnalysisEnvelope::Success {
            diagnosis,
            sample,
            elements,
        }
    }

    pub fn failure(diagnosis: Uuid, sample: u32, kind: FailureKind, message: impl Into<String>) -> Self {
        AnalysisEnvelope::Failure {
            diagnosis,
            sample,
            kind,
            message: message.into(),
        }
    }

    /// Target image, when the envelope decoded far enough to name one.
    pub fn key(&self) -> Option<SampleKey> {
        match self {
            AnalysisEnvelope::Success {
                diagnosis, sample, ..
            }
            | AnalysisEnvelope::Failure {
                diagnosis, sample, ..
            } => Some(SampleKey::new(*diagnosis, *sample)),
            AnalysisEnvelope::Undecodable { .. } => None,
        }
    }

    /// Resolve the envelope against `registry`.
    ///
    /// All-or-nothing: any unknown element name or model finding without
    /// coordinates rejects the whole envelope. Findings repeated under the
    /// same name are merged into one model element.
    pub fn decode(&self, registry: &DiseaseRegistry) -> Result<DecodedEnvelope, AnalysisError> {
        match self {
            AnalysisEnvelope::Undecodable { reason } => {
                Err(AnalysisError::UnknownEnvelope(reason.clone()))
            }
            AnalysisEnvelope::Failure {
                diagnosis,
                sample,
                kind,
                message,
            } => {
                let key = SampleKey::new(*diagnosis, *sample);
                let verdict = match kind {
                    FailureKind::Structured => Verdict::Rejected(message.clone()),
                    FailureKind::Transport => Verdict::Undelivered(message.clone()),
                };
                Ok(DecodedEnvelope { key, verdict })
            }
            AnalysisEnvelope::Success {
                diagnosis,
                sample,
                elements,
            } => {
                let key = SampleKey::new(*diagnosis, *sample);
                let mut merged: BTreeMap<_, BTreeSet<Coordinates>> = BTreeMap::new();
                for raw in elements {
                    let name = registry.element_name(&raw.name).ok_or_else(|| {
                        AnalysisError::UnknownEnvelope(format!(
                            "sample {key}: unregistered element {}",
                            raw.name
                        ))
                    })?;
                    if raw.coordinates.is_empty() {
                        return Err(AnalysisError::UnknownEnvelope(format!(
                            "sample {key}: model element {name} has no coordinates"
                        )));
                    }
                    merged
                        .entry(name)
                        .or_default()
                        .extend(raw.coordinates.iter().copied().map(Coordinates::from));
                }

                let elements = merged
                    .into_iter()
                    .map(|(name, coordinates)| DiagnosticElement::model(name, coordinates))
                    .collect();
                Ok(DecodedEnvelope {
                    key,
                    verdict: Verdict::Analyzed(elements),
                })
            }
        }
    }
}
