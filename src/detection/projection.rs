//! Camera projection of tracked lights into the image.
//!
//! # Pipeline
//!
//! ```text
//! world ──inverse(T·R)──▶ vehicle ──mount──▶ camera body ──P──▶ clip ──÷w──▶ NDC ──▶ pixels
//! ```
//!
//! - `T·R` is the vehicle-to-world transform from the current pose.
//! - The mount correction is two small rotations: pitch about the lateral
//!   axis, then yaw about the vertical axis. They are empirically tuned and
//!   kept as separate parameters.
//! - `P` is an off-axis GL frustum with `r = width / focal`, `t = height / focal`,
//!   preceded by the forward-left-up → GL axis change. In the body frame the
//!   homogeneous `w` equals the forward distance, which is also the depth used
//!   for the apparent scale.
//!
//! A point is visible only if its NDC lie strictly inside (-1, 1) on all
//! three axes; anything at exactly ±1 is outside.

use serde::{Deserialize, Serialize};

use crate::core::{Mat4, Point3, Pose, Vec3};

/// Camera intrinsics and mounting calibration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Focal length in pixels (default: 5200)
    #[serde(default = "default_focal_length")]
    pub focal_length: f64,

    /// Image width in pixels (default: 800)
    #[serde(default = "default_image_width")]
    pub image_width: u32,

    /// Image height in pixels (default: 600)
    #[serde(default = "default_image_height")]
    pub image_height: u32,

    /// Near clip distance in meters (default: 1.0)
    #[serde(default = "default_near")]
    pub near: f64,

    /// Far clip distance in meters (default: 100.0)
    #[serde(default = "default_far")]
    pub far: f64,

    /// Mount pitch correction about the lateral axis, degrees (default: 7.0)
    #[serde(default = "default_mount_pitch_deg")]
    pub mount_pitch_deg: f64,

    /// Mount yaw correction about the vertical axis, degrees (default: 0.7)
    #[serde(default = "default_mount_yaw_deg")]
    pub mount_yaw_deg: f64,
}

fn default_focal_length() -> f64 {
    5200.0
}
fn default_image_width() -> u32 {
    800
}
fn default_image_height() -> u32 {
    600
}
fn default_near() -> f64 {
    1.0
}
fn default_far() -> f64 {
    100.0
}
fn default_mount_pitch_deg() -> f64 {
    7.0
}
fn default_mount_yaw_deg() -> f64 {
    0.7
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            focal_length: default_focal_length(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            near: default_near(),
            far: default_far(),
            mount_pitch_deg: default_mount_pitch_deg(),
            mount_yaw_deg: default_mount_yaw_deg(),
        }
    }
}

impl CameraConfig {
    /// Same intrinsics with the mount corrections zeroed.
    pub fn without_mount_correction(mut self) -> Self {
        self.mount_pitch_deg = 0.0;
        self.mount_yaw_deg = 0.0;
        self
    }

    /// Rotation from the vehicle frame into the camera body frame.
    pub fn mount_matrix(&self) -> Mat4 {
        Mat4::rotation_z(self.mount_yaw_deg.to_radians())
            .mul(&Mat4::rotation_y(self.mount_pitch_deg.to_radians()))
    }

    /// Projection from camera body frame to clip space.
    pub fn projection_matrix(&self) -> Mat4 {
        let r = self.image_width as f64 / self.focal_length;
        let t = self.image_height as f64 / self.focal_length;
        Mat4::frustum(-r, r, -t, t, self.near, self.far).mul(&Mat4::body_to_gl_axes())
    }
}

/// Crop-box factors around a projected light, in pixels per unit scale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRegionConfig {
    /// Half width (default: 960)
    #[serde(default = "default_half_width")]
    pub half_width: f64,

    /// Extent above the projected point (default: 1000)
    #[serde(default = "default_above")]
    pub above: f64,

    /// Extent below the projected point (default: 5000)
    #[serde(default = "default_below")]
    pub below: f64,
}

fn default_half_width() -> f64 {
    960.0
}
fn default_above() -> f64 {
    1000.0
}
fn default_below() -> f64 {
    5000.0
}

impl Default for SearchRegionConfig {
    fn default() -> Self {
        Self {
            half_width: default_half_width(),
            above: default_above(),
            below: default_below(),
        }
    }
}

/// Projection could not be computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    /// Vehicle-to-world transform is not available for this frame
    #[error("vehicle-to-world transform unavailable")]
    TransformUnavailable,
}

/// Result of projecting one world point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Normalized device coordinates (may be outside the clip volume)
    pub ndc: Option<Vec3>,
    /// Forward distance in the camera body frame
    pub depth: f64,
    /// Screen position and scale, present only when visible
    pub screen: Option<ScreenPoint>,
}

impl Projection {
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.screen.is_some()
    }
}

/// Pixel position of a visible point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
    /// Reciprocal of the depth; sizes the search region
    pub scale: f64,
}

/// Pixel rectangle `[x0, x1) × [y0, y1)` inside the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchRegion {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl SearchRegion {
    #[inline]
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Crop box around a visible point, clamped to a `width × height` image.
    /// `None` if nothing of the box remains inside the image.
    pub fn around(
        point: &ScreenPoint,
        factors: &SearchRegionConfig,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        let clamp = |v: f64, max: u32| v.floor().clamp(0.0, max as f64) as u32;
        let x0 = clamp(point.x - factors.half_width * point.scale, width);
        let x1 = clamp(point.x + factors.half_width * point.scale, width);
        let y0 = clamp(point.y - factors.above * point.scale, height);
        let y1 = clamp(point.y + factors.below * point.scale, height);
        (x1 > x0 && y1 > y0).then_some(Self { x0, y0, x1, y1 })
    }
}

/// `true` when all three NDC components are strictly inside (-1, 1).
#[inline]
pub fn inside_clip_volume(ndc: &Vec3) -> bool {
    let inside = |v: f64| -1.0 < v && v < 1.0;
    inside(ndc.x) && inside(ndc.y) && inside(ndc.z)
}

/// Projects world points into the vehicle camera.
#[derive(Clone, Debug)]
pub struct CameraProjector {
    config: CameraConfig,
    mount: Mat4,
    projection: Mat4,
}

impl CameraProjector {
    pub fn new(config: CameraConfig) -> Self {
        let mount = config.mount_matrix();
        let projection = config.projection_matrix();
        Self {
            config,
            mount,
            projection,
        }
    }

    #[inline]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// World-to-camera-body transform for the given vehicle pose.
    pub fn view_matrix(&self, pose: &Pose) -> Result<Mat4, ProjectionError> {
        let vehicle_to_world = pose
            .vehicle_to_world()
            .ok_or(ProjectionError::TransformUnavailable)?;
        Ok(self.mount.mul(&vehicle_to_world.rigid_inverse()))
    }

    /// Project `point` as seen from a vehicle at `pose`.
    pub fn project(&self, pose: &Pose, point: &Point3) -> Result<Projection, ProjectionError> {
        let view = self.view_matrix(pose)?;
        Ok(self.project_with_view(&view, point))
    }

    /// Project with a precomputed view matrix.
    pub fn project_with_view(&self, view: &Mat4, point: &Point3) -> Projection {
        let camera = view.mul_vec4(&point.to_point4());
        let clip = self.projection.mul_vec4(&camera);
        let depth = camera.x;
        let ndc = clip.perspective_divide();

        let screen = ndc.filter(inside_clip_volume).map(|ndc| {
            let half_w = self.config.image_width as f64 / 2.0;
            let half_h = self.config.image_height as f64 / 2.0;
            ScreenPoint {
                x: ndc.x * half_w + half_w,
                y: -ndc.y * half_h + half_h,
                scale: 1.0 / depth,
            }
        });

        Projection { ndc, depth, screen }
    }
}
