//! Snapshot types exchanged between the input streams and the pipeline.
//!
//! Everything here is replaced wholesale on update; nothing is patched in place.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::math::{Mat4, Quaternion, Vec3};

/// Planar position (meters). Stop lines live in this space.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Planar Euclidean distance.
    #[inline]
    pub fn distance(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Lift to 3-D on the ground plane (z = 0).
    #[inline]
    pub fn on_ground(&self) -> Vec3 {
        Vec3::new(self.x, self.y, 0.0)
    }
}

impl From<[f64; 2]> for Point2 {
    fn from(p: [f64; 2]) -> Self {
        Point2::new(p[0], p[1])
    }
}

/// 3-D position in the world frame.
pub type Point3 = Vec3;

impl Vec3 {
    /// Planar projection (drops z).
    #[inline]
    pub fn xy(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// Vehicle pose: world-frame position and orientation.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3,
    #[serde(default)]
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: Point3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose at `position` with identity orientation.
    pub fn at(position: Point3) -> Self {
        Self::new(position, Quaternion::IDENTITY)
    }

    /// Vehicle-to-world transform (translation × rotation).
    ///
    /// `None` while the orientation is not a valid rotation, which is how an
    /// uninitialised localizer reports itself.
    pub fn vehicle_to_world(&self) -> Option<Mat4> {
        if !self.position.is_finite() {
            return None;
        }
        let q = self.orientation.normalized()?;
        Some(Mat4::translation(self.position).mul(&Mat4::rotation(&q)))
    }
}

/// Indexed point on the planned route.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub index: usize,
    pub position: Point3,
}

/// Configured stop line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopLine {
    pub position: Point2,
}

impl StopLine {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position: Point2::new(x, y),
        }
    }
}

/// Traffic-light color state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightState {
    #[default]
    Unknown,
    Green,
    Yellow,
    Red,
}

impl LightState {
    /// Simulator message code (RED=0, YELLOW=1, GREEN=2, UNKNOWN=4).
    pub fn code(&self) -> u8 {
        match self {
            LightState::Red => 0,
            LightState::Yellow => 1,
            LightState::Green => 2,
            LightState::Unknown => 4,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => LightState::Red,
            1 => LightState::Yellow,
            2 => LightState::Green,
            _ => LightState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LightState::Unknown => "UNKNOWN",
            LightState::Green => "GREEN",
            LightState::Yellow => "YELLOW",
            LightState::Red => "RED",
        }
    }
}

impl std::fmt::Display for LightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracked traffic light (ground truth in simulation, tracker output otherwise).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedLight {
    pub position: Point3,
    #[serde(default)]
    pub state: LightState,
}

impl TrackedLight {
    pub fn new(position: Point3, state: LightState) -> Self {
        Self { position, state }
    }
}

/// Camera frame.
#[derive(Clone, Debug)]
pub struct ImageFrame {
    /// Capture time (microseconds)
    pub stamp_us: u64,
    pub image: RgbImage,
}

impl ImageFrame {
    pub fn new(stamp_us: u64, image: RgbImage) -> Self {
        Self { stamp_us, image }
    }

    /// Black frame of the given size.
    pub fn blank(stamp_us: u64, width: u32, height: u32) -> Self {
        Self::new(stamp_us, RgbImage::new(width, height))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Detector output: path index of the stop line to halt at, or none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct StopWaypoint(pub Option<usize>);

impl StopWaypoint {
    pub const NONE: StopWaypoint = StopWaypoint(None);

    /// Wire sentinel meaning "no stop required".
    pub const NO_STOP: i32 = -1;

    pub fn at(index: usize) -> Self {
        StopWaypoint(Some(index))
    }

    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.0
    }

    /// Integer published on the wire; indices beyond `i32::MAX` saturate.
    pub fn to_wire(&self) -> i32 {
        match self.0 {
            Some(i) => i32::try_from(i).unwrap_or(i32::MAX),
            None => Self::NO_STOP,
        }
    }

    pub fn from_wire(value: i32) -> Self {
        StopWaypoint(usize::try_from(value).ok())
    }
}

impl std::fmt::Display for StopWaypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(i) => write!(f, "stop@{}", i),
            None => f.write_str("no-stop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_state_codes() {
        for state in [
            LightState::Red,
            LightState::Yellow,
            LightState::Green,
            LightState::Unknown,
        ] {
            assert_eq!(LightState::from_code(state.code()), state);
        }
        assert_eq!(LightState::from_code(3), LightState::Unknown);
        assert_eq!(LightState::from_code(200), LightState::Unknown);
    }

    #[test]
    fn test_light_state_json() {
        let light: TrackedLight =
            serde_json::from_str(r#"{"position":{"x":1.0,"y":2.0,"z":3.0},"state":"RED"}"#)
                .unwrap();
        assert_eq!(light.state, LightState::Red);
        assert_eq!(light.position.xy(), Point2::new(1.0, 2.0));
    }

    #[test]
    fn test_stop_waypoint_wire() {
        assert_eq!(StopWaypoint::NONE.to_wire(), -1);
        assert_eq!(StopWaypoint::at(42).to_wire(), 42);
        assert_eq!(StopWaypoint::from_wire(-1), StopWaypoint::NONE);
        assert_eq!(StopWaypoint::from_wire(7), StopWaypoint::at(7));
    }

    #[test]
    fn test_uninitialised_pose_has_no_transform() {
        let pose = Pose::new(Vec3::ZERO, Quaternion::new(0.0, 0.0, 0.0, 0.0));
        assert!(pose.vehicle_to_world().is_none());
        assert!(Pose::at(Vec3::new(1.0, 2.0, 0.0)).vehicle_to_world().is_some());
    }

    #[test]
    fn test_planar_distance_ignores_z() {
        let a = Vec3::new(0.0, 0.0, 100.0).xy();
        let b = Point2::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
