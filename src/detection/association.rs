//! Stop-line and traffic-light association.
//!
//! Both associators are planar nearest-neighbour scans (z ignored) with the
//! first minimal candidate winning ties. Stop lines are gated by a detection
//! radius; lights are not, unless `light_radius` is configured.

use serde::{Deserialize, Serialize};

use super::path_index::Path;
use crate::core::{Point2, StopLine, TrackedLight};

/// Association settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Stop lines must be strictly closer than this to the vehicle's waypoint
    ///
    /// Default: 50.0
    #[serde(default = "default_stop_line_radius")]
    pub stop_line_radius: f64,

    /// Optional cutoff for light-to-stop-line distance. Unset means any
    /// light, however far, can be associated.
    #[serde(default)]
    pub light_radius: Option<f64>,

    /// Skip stop lines whose route index lies behind the vehicle's.
    ///
    /// Default: false
    #[serde(default)]
    pub require_ahead: bool,
}

fn default_stop_line_radius() -> f64 {
    50.0
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            stop_line_radius: default_stop_line_radius(),
            light_radius: None,
            require_ahead: false,
        }
    }
}

/// Fixed set of stop lines loaded at startup.
#[derive(Clone, Debug)]
pub struct StopLineAssociator {
    stop_lines: Vec<StopLine>,
    radius: f64,
}

impl StopLineAssociator {
    pub fn new(stop_lines: Vec<StopLine>, radius: f64) -> Self {
        Self { stop_lines, radius }
    }

    #[inline]
    pub fn stop_lines(&self) -> &[StopLine] {
        &self.stop_lines
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Closest stop line strictly within the detection radius.
    pub fn nearest(&self, position: &Point2) -> Option<&StopLine> {
        self.nearest_where(position, |_| true)
    }

    /// Like [`nearest`](Self::nearest), but ignores stop lines whose nearest
    /// route index is before `vehicle_index`.
    pub fn nearest_ahead(
        &self,
        position: &Point2,
        path: &Path,
        vehicle_index: usize,
    ) -> Option<&StopLine> {
        self.nearest_where(position, |line| {
            path.nearest_index(&line.position.on_ground())
                .is_some_and(|i| i >= vehicle_index)
        })
    }

    fn nearest_where<F>(&self, position: &Point2, accept: F) -> Option<&StopLine>
    where
        F: Fn(&StopLine) -> bool,
    {
        let mut best: Option<(&StopLine, f64)> = None;
        for line in &self.stop_lines {
            let d = line.position.distance(position);
            if d >= self.radius {
                continue;
            }
            if best.is_some_and(|(_, best_d)| d >= best_d) {
                continue;
            }
            if accept(line) {
                best = Some((line, d));
            }
        }
        best.map(|(line, _)| line)
    }
}

/// Nearest-light lookup.
#[derive(Clone, Copy, Debug, Default)]
pub struct LightAssociator {
    max_distance: Option<f64>,
}

impl LightAssociator {
    pub fn new(max_distance: Option<f64>) -> Self {
        Self { max_distance }
    }

    /// Nearest light to the stop line, or `None` if the set is empty (or, with
    /// a cutoff configured, no light is within it).
    pub fn nearest<'a>(
        &self,
        stop_line: &Point2,
        lights: &'a [TrackedLight],
    ) -> Option<&'a TrackedLight> {
        let mut best: Option<(&TrackedLight, f64)> = None;
        for light in lights {
            let d = light.position.xy().distance(stop_line);
            if self.max_distance.is_some_and(|max| d >= max) {
                continue;
            }
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((light, d));
            }
        }
        best.map(|(light, _)| light)
    }
}
