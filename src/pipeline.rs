//! One detection pass over a scene snapshot.
//!
//! ```text
//! pose ─▶ PathIndex ─▶ StopLineAssociator ─▶ LightAssociator
//!                                                 │
//!              CameraProjector ─▶ SearchRegion ◀──┘
//!                                     │
//!                                Classifier ─▶ StateDebouncer ─▶ StopWaypoint
//! ```
//!
//! The pass owns no input state. The caller hands in the latest [`Scene`] and
//! the long-lived [`StateDebouncer`]; everything else is derived per call.
//!
//! Outcomes:
//! - Missing pose or path: [`PassOutcome::NoResult`], debouncer untouched.
//! - No stop line in range / no light: association miss, handled per
//!   [`MissPolicy`]. A single miss never clears a latched stop.
//! - Transform unavailable or no image: the raw observation falls back to the
//!   ground-truth state when allowed, otherwise UNKNOWN.

use serde::{Deserialize, Serialize};

use crate::classifier::LightClassifier;
use crate::config::DrishtiConfig;
use crate::core::{ImageFrame, LightState, Pose, StopLine, StopWaypoint, TrackedLight};
use crate::detection::{
    CameraProjector, LightAssociator, Path, Projection, SearchRegion, SearchRegionConfig,
    StateDebouncer, StopLineAssociator,
};

/// What to do when no stop line or light can be associated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissPolicy {
    /// Feed UNKNOWN to the debouncer; a sustained miss clears the latch
    /// after `threshold` frames.
    #[default]
    Observe,
    /// Leave the debouncer alone and keep re-emitting the latch.
    Hold,
}

/// Pipeline behavior switches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Association miss handling (default: observe)
    #[serde(default)]
    pub miss_policy: MissPolicy,

    /// Use the tracked light's state when the camera path is unavailable
    ///
    /// Default: true
    #[serde(default = "default_true")]
    pub ground_truth_fallback: bool,

    /// Pass the tracked light's state to the classifier as a hint
    ///
    /// Default: true
    #[serde(default = "default_true")]
    pub ground_truth_hint: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            miss_policy: MissPolicy::default(),
            ground_truth_fallback: true,
            ground_truth_hint: true,
        }
    }
}

/// Latest snapshot of every input stream.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub pose: Option<Pose>,
    pub path: Option<Path>,
    pub lights: Vec<TrackedLight>,
    pub frame: Option<ImageFrame>,
}

/// Required input that has not arrived yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingInput {
    Pose,
    Path,
}

/// Association stage that came up empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationMiss {
    NoStopLine,
    NoLight,
}

/// Everything the pass learned about the associated light.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Route index nearest the vehicle
    pub vehicle_index: usize,
    pub stop_line: StopLine,
    /// Route index nearest the stop line
    pub stop_waypoint: usize,
    pub light: TrackedLight,
    /// `None` when the transform was unavailable
    pub projection: Option<Projection>,
    pub region: Option<SearchRegion>,
}

/// Output of a pass that reached the debouncer stage.
#[derive(Clone, Debug, PartialEq)]
pub struct PassReport {
    /// Waypoint to publish
    pub waypoint: StopWaypoint,
    /// Raw state fed to the debouncer (`None` when the miss policy held)
    pub observation: Option<LightState>,
    pub detection: Option<Detection>,
    pub miss: Option<AssociationMiss>,
}

/// Result of one pass.
#[derive(Clone, Debug, PartialEq)]
pub enum PassOutcome {
    NoResult(MissingInput),
    Emit(PassReport),
}

impl PassOutcome {
    /// Waypoint to publish, if any.
    pub fn waypoint(&self) -> Option<StopWaypoint> {
        match self {
            PassOutcome::NoResult(_) => None,
            PassOutcome::Emit(report) => Some(report.waypoint),
        }
    }
}

/// Detection stages wired together from configuration.
pub struct Pipeline {
    config: PipelineConfig,
    stop_lines: StopLineAssociator,
    require_ahead: bool,
    lights: LightAssociator,
    projector: CameraProjector,
    search: SearchRegionConfig,
    classifier: Box<dyn LightClassifier>,
}

impl Pipeline {
    pub fn new(config: &DrishtiConfig, classifier: Box<dyn LightClassifier>) -> Self {
        Self {
            config: config.pipeline.clone(),
            stop_lines: StopLineAssociator::new(
                config.stop_lines(),
                config.association.stop_line_radius,
            ),
            require_ahead: config.association.require_ahead,
            lights: LightAssociator::new(config.association.light_radius),
            projector: CameraProjector::new(config.camera.clone()),
            search: config.search_region.clone(),
            classifier,
        }
    }

    #[inline]
    pub fn projector(&self) -> &CameraProjector {
        &self.projector
    }

    #[inline]
    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Run one pass.
    pub fn run(&mut self, scene: &Scene, debouncer: &mut StateDebouncer) -> PassOutcome {
        let Some(pose) = scene.pose.as_ref() else {
            return PassOutcome::NoResult(MissingInput::Pose);
        };
        let Some(path) = scene.path.as_ref().filter(|p| !p.is_empty()) else {
            return PassOutcome::NoResult(MissingInput::Path);
        };
        let Some(vehicle_index) = path.nearest_index(&pose.position) else {
            return PassOutcome::NoResult(MissingInput::Path);
        };
        let Some(anchor) = path.get(vehicle_index).map(|p| p.position.xy()) else {
            return PassOutcome::NoResult(MissingInput::Path);
        };

        let stop_line = if self.require_ahead {
            self.stop_lines.nearest_ahead(&anchor, path, vehicle_index)
        } else {
            self.stop_lines.nearest(&anchor)
        };
        let Some(stop_line) = stop_line.copied() else {
            return self.association_miss(AssociationMiss::NoStopLine, debouncer);
        };
        let Some(light) = self
            .lights
            .nearest(&stop_line.position, &scene.lights)
            .copied()
        else {
            return self.association_miss(AssociationMiss::NoLight, debouncer);
        };
        let Some(stop_waypoint) = path.nearest_index(&stop_line.position.on_ground()) else {
            return PassOutcome::NoResult(MissingInput::Path);
        };

        let (observation, projection, region) = self.observe_light(pose, &light, scene);
        let waypoint = debouncer.observe(observation, Some(stop_waypoint));

        log::trace!(
            "Pass: vehicle wp {}, stop wp {}, raw {}, out {}",
            vehicle_index,
            stop_waypoint,
            observation,
            waypoint
        );

        PassOutcome::Emit(PassReport {
            waypoint,
            observation: Some(observation),
            detection: Some(Detection {
                vehicle_index,
                stop_line,
                stop_waypoint,
                light,
                projection,
                region,
            }),
            miss: None,
        })
    }

    /// Raw light state for this frame, with the projection used to get it.
    fn observe_light(
        &mut self,
        pose: &Pose,
        light: &TrackedLight,
        scene: &Scene,
    ) -> (LightState, Option<Projection>, Option<SearchRegion>) {
        let projection = match self.projector.project(pose, &light.position) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("Projection skipped: {}", e);
                return (self.fallback_state(light), None, None);
            }
        };

        let Some(frame) = scene.frame.as_ref() else {
            return (self.fallback_state(light), Some(projection), None);
        };

        let region = projection
            .screen
            .and_then(|s| SearchRegion::around(&s, &self.search, frame.width(), frame.height()));
        let hint = self.config.ground_truth_hint.then_some(light.state);

        let state = match self.classifier.classify(frame, region.as_ref(), hint) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("{} classifier failed: {}", self.classifier.name(), e);
                LightState::Unknown
            }
        };
        (state, Some(projection), region)
    }

    fn fallback_state(&self, light: &TrackedLight) -> LightState {
        if self.config.ground_truth_fallback {
            light.state
        } else {
            LightState::Unknown
        }
    }

    fn association_miss(
        &self,
        miss: AssociationMiss,
        debouncer: &mut StateDebouncer,
    ) -> PassOutcome {
        let (waypoint, observation) = match self.config.miss_policy {
            MissPolicy::Observe => (
                debouncer.observe(LightState::Unknown, None),
                Some(LightState::Unknown),
            ),
            MissPolicy::Hold => (debouncer.latched(), None),
        };
        log::trace!("Association miss {:?}, out {}", miss, waypoint);
        PassOutcome::Emit(PassReport {
            waypoint,
            observation,
            detection: None,
            miss: Some(miss),
        })
    }
}
