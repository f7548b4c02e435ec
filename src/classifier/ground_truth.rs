use super::LightClassifier;
use crate::core::{ImageFrame, LightState};
use crate::detection::SearchRegion;
use crate::error::Result;

/// Returns the hint as-is; UNKNOWN without one.
///
/// This is what runs in simulation, where the tracked-light stream carries the
/// true color. On hardware there is no hint and every frame reads UNKNOWN.
#[derive(Clone, Copy, Debug, Default)]
pub struct GroundTruthClassifier;

impl LightClassifier for GroundTruthClassifier {
    fn name(&self) -> &'static str {
        "ground_truth"
    }

    fn classify(
        &mut self,
        _frame: &ImageFrame,
        _region: Option<&SearchRegion>,
        hint: Option<LightState>,
    ) -> Result<LightState> {
        Ok(hint.unwrap_or_default())
    }
}
