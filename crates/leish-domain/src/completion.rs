//! Case completion and model verdict.

use crate::diagnosis::Diagnosis;
use crate::sample::ImageSample;
use crate::stage::AnalysisStage;

/// Whether every image reached [`AnalysisStage::Analyzed`].
///
/// An empty image set is complete (vacuous truth).
pub fn is_completed<'a, I>(images: I) -> bool
where
    I: IntoIterator<Item = &'a ImageSample>,
{
    images
        .into_iter()
        .all(|image| image.stage == AnalysisStage::Analyzed)
}

/// Copy of `diagnosis` with `model_result` set by its disease's verdict over
/// the current tallies. `specialist_result` passes through untouched.
pub fn with_verdict(diagnosis: &Diagnosis) -> Diagnosis {
    let tallies = diagnosis.tallies();
    let verdict = diagnosis.disease.model_verdict(&tallies);
    tracing::debug!(
        diagnosis = %diagnosis.id,
        disease = %diagnosis.disease.id(),
        elements = tallies.len(),
        verdict,
        "computed model verdict"
    );

    Diagnosis {
        model_result: verdict,
        ..diagnosis.clone()
    }
}
