#![warn(missing_docs)]

//! Math types for the damascus billet kernel.
//!
//! Thin wrappers around nalgebra. The whole workspace uses one axis
//! convention:
//!
//! * `x`: width (lateral, centered on 0)
//! * `y`: length (longitudinal, centered on 0)
//! * `z`: height (layer stacking, bottom of the stack at 0)

use nalgebra::{Matrix4, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Non-uniform scale by `(sx, sy, sz)` about the origin.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation in the width/height plane by `angle` radians.
    ///
    /// Positive angles turn the width axis toward the height axis:
    /// `x' = x·cosθ − z·sinθ`, `z' = x·sinθ + z·cosθ`. The length
    /// coordinate is untouched.
    pub fn rotation_about_length(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = -s;
        m[(2, 0)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Conjugate `inner` so it acts about `pivot` instead of the origin.
    pub fn about_point(pivot: &Point3, inner: &Transform) -> Self {
        Transform::translation(pivot.x, pivot.y, pivot.z)
            .then(inner)
            .then(&Transform::translation(-pivot.x, -pivot.y, -pivot.z))
    }

    /// Compose: `self * other`, i.e. `other` is applied first.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
