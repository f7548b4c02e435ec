//! Light-state classifiers.
//!
//! A classifier turns the camera frame (optionally cropped to the projected
//! search region) plus an optional ground-truth hint into a [`LightState`].
//! Training or shipping a vision model is out of scope; two implementations
//! are provided:
//!
//! - [`GroundTruthClassifier`]: echoes the simulator hint
//! - [`ColorClassifier`]: HSV voting over lit pixels in the region

mod color;
mod ground_truth;

pub use color::{ColorClassifier, ColorClassifierConfig, ColorVotes, rgb_to_hsv};
pub use ground_truth::GroundTruthClassifier;

use serde::{Deserialize, Serialize};

use crate::core::{ImageFrame, LightState};
use crate::detection::SearchRegion;
use crate::error::Result;

/// Classifier interface used by the pipeline.
pub trait LightClassifier: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Classify the light visible in `frame`.
    ///
    /// `region` is `None` when the light did not project into the image.
    fn classify(
        &mut self,
        frame: &ImageFrame,
        region: Option<&SearchRegion>,
        hint: Option<LightState>,
    ) -> Result<LightState>;
}

/// Which classifier to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Use the tracked light's reported state
    #[default]
    GroundTruth,
    /// HSV color voting on the camera image
    Color,
}

/// Classifier selection and parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub kind: ClassifierKind,

    #[serde(default)]
    pub color: ColorClassifierConfig,
}

/// Create the configured classifier.
pub fn create_classifier(config: &ClassifierConfig) -> Box<dyn LightClassifier> {
    match config.kind {
        ClassifierKind::GroundTruth => Box::new(GroundTruthClassifier),
        ClassifierKind::Color => Box::new(ColorClassifier::new(config.color.clone())),
    }
}
