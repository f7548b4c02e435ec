//! Fixed-size linear algebra for camera projection.
//!
//! Only what the projector needs: 3/4-vectors, a unit quaternion and a
//! row-major 4×4 matrix with named constructors. Matrices act on column
//! vectors, so `a.mul(&b)` applies `b` first.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// 3-D vector (meters).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Homogeneous point (w = 1).
    #[inline]
    pub fn to_point4(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 1.0)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// Homogeneous 4-vector.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Vec4 {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    #[inline]
    fn component(&self, i: usize) -> f64 {
        match i {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => self.w,
        }
    }

    /// Perspective divide. `None` when w is zero or the result is not finite.
    pub fn perspective_divide(&self) -> Option<Vec3> {
        if self.w == 0.0 {
            return None;
        }
        let v = Vec3::new(self.x / self.w, self.y / self.w, self.z / self.w);
        v.is_finite().then_some(v)
    }

    /// Drop the homogeneous component.
    #[inline]
    pub fn xyz(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Rotation quaternion (x, y, z, w).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    #[inline]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians about the vertical (z) axis.
    pub fn from_yaw(angle: f64) -> Self {
        let half = angle * 0.5;
        Self::new(0.0, 0.0, half.sin(), half.cos())
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Unit quaternion, or `None` if this one cannot represent a rotation.
    pub fn normalized(&self) -> Option<Self> {
        let n = self.norm();
        if !n.is_finite() || n < 1e-9 {
            return None;
        }
        Some(Self::new(self.x / n, self.y / n, self.z / n, self.w / n))
    }
}

/// Row-major 4×4 matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    pub m: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    pub fn from_rows(m: [[f64; 4]; 4]) -> Self {
        Self { m }
    }

    pub fn identity() -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn translation(t: Vec3) -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, t.x],
            [0.0, 1.0, 0.0, t.y],
            [0.0, 0.0, 1.0, t.z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation matrix of a quaternion. The quaternion must be unit length.
    pub fn rotation(q: &Quaternion) -> Self {
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        Self::from_rows([
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - z * w),
                2.0 * (x * z + y * w),
                0.0,
            ],
            [
                2.0 * (x * y + z * w),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - x * w),
                0.0,
            ],
            [
                2.0 * (x * z - y * w),
                2.0 * (y * z + x * w),
                1.0 - 2.0 * (x * x + y * y),
                0.0,
            ],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation about the y axis.
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [c, 0.0, s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation about the z axis.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// OpenGL-style off-axis frustum (camera looks down -z, y up).
    pub fn frustum(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Self {
        Self::from_rows([
            [
                2.0 * near / (right - left),
                0.0,
                (right + left) / (right - left),
                0.0,
            ],
            [
                0.0,
                2.0 * near / (top - bottom),
                (top + bottom) / (top - bottom),
                0.0,
            ],
            [
                0.0,
                0.0,
                -(far + near) / (far - near),
                -2.0 * far * near / (far - near),
            ],
            [0.0, 0.0, -1.0, 0.0],
        ])
    }

    /// Axis change from a forward-left-up body frame to the GL camera frame:
    /// `gl_x = -y`, `gl_y = z`, `gl_z = -x`.
    pub fn body_to_gl_axes() -> Self {
        Self::from_rows([
            [0.0, -1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn mul(&self, other: &Mat4) -> Mat4 {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Mat4::from_rows(out)
    }

    pub fn mul_vec4(&self, v: &Vec4) -> Vec4 {
        let row = |i: usize| (0..4).map(|k| self.m[i][k] * v.component(k)).sum::<f64>();
        Vec4::new(row(0), row(1), row(2), row(3))
    }

    pub fn transpose(&self) -> Mat4 {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = self.m[j][i];
            }
        }
        Mat4::from_rows(out)
    }

    /// Inverse of a rigid transform `T·R` (orthonormal rotation block).
    pub fn rigid_inverse(&self) -> Mat4 {
        let mut rot_t = self.transpose();
        rot_t.m[3] = [0.0, 0.0, 0.0, 1.0];
        for row in rot_t.m.iter_mut().take(3) {
            row[3] = 0.0;
        }
        let t = Vec3::new(self.m[0][3], self.m[1][3], self.m[2][3]);
        rot_t.mul(&Mat4::translation(t * -1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn assert_mat_eq(a: &Mat4, b: &Mat4) {
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(a.m[i][j], b.m[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_translation_moves_points() {
        let t = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
        let p = t.mul_vec4(&Vec3::new(1.0, 1.0, 1.0).to_point4());
        assert_eq!(p.xyz(), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(p.w, 1.0);
    }

    #[test]
    fn test_yaw_quaternion_rotates_x_to_y() {
        let r = Mat4::rotation(&Quaternion::from_yaw(FRAC_PI_2));
        let p = r.mul_vec4(&Vec3::new(1.0, 0.0, 0.0).to_point4());
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quaternion_matches_axis_rotation() {
        let q = Quaternion::from_yaw(0.3);
        assert_mat_eq(&Mat4::rotation(&q), &Mat4::rotation_z(0.3));
    }

    #[test]
    fn test_rigid_inverse_roundtrip() {
        let pose = Mat4::translation(Vec3::new(5.0, -2.0, 1.0))
            .mul(&Mat4::rotation(&Quaternion::from_yaw(0.7)));
        assert_mat_eq(&pose.mul(&pose.rigid_inverse()), &Mat4::identity());
    }

    #[test]
    fn test_degenerate_quaternion_rejected() {
        assert!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized().is_none());
        assert!(Quaternion::new(f64::NAN, 0.0, 0.0, 1.0).normalized().is_none());
        let q = Quaternion::new(0.0, 0.0, 0.0, 2.0).normalized().unwrap();
        assert_eq!(q, Quaternion::IDENTITY);
    }

    #[test]
    fn test_perspective_divide_zero_w() {
        assert!(Vec4::new(1.0, 1.0, 1.0, 0.0).perspective_divide().is_none());
        let v = Vec4::new(2.0, 4.0, 6.0, 2.0).perspective_divide().unwrap();
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
    }
}
