//! Foundation types: fixed-size math and input/output snapshots.

pub mod math;
pub mod types;

pub use math::{Mat4, Quaternion, Vec3, Vec4};
pub use types::{
    ImageFrame, LightState, PathPoint, Point2, Point3, Pose, StopLine, StopWaypoint,
    TrackedLight,
};
