use crate::utilities::matrix3x3::Matrix3x3;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A transformation composed of a rotation and a translation. Scale and skew are not
/// represented; matrices carrying them must have the scale baked into the vertex data first.
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Rotation, rows are the local axes expressed in the parent frame.
    pub orientation: Matrix3x3,
    /// Translation applied after the rotation.
    pub translation: Vec3,
}

impl RigidTransform {
    /// Gets the identity transform.
    #[inline(always)]
    pub const fn identity() -> Self {
        Self {
            orientation: Matrix3x3::identity(),
            translation: Vec3::ZERO,
        }
    }

    #[inline(always)]
    pub fn new(orientation: Matrix3x3, translation: Vec3) -> Self {
        Self {
            orientation,
            translation,
        }
    }

    #[inline(always)]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            orientation: Matrix3x3::identity(),
            translation,
        }
    }

    #[inline(always)]
    pub fn from_rotation_translation(orientation: Quat, translation: Vec3) -> Self {
        Self {
            orientation: Matrix3x3::from_quaternion(orientation),
            translation,
        }
    }

    /// Reads the rotation and translation of a glam world matrix. Any scale in the matrix is
    /// carried into the rotation rows unchanged.
    #[inline(always)]
    pub fn from_mat4(matrix: &Mat4) -> Self {
        Self {
            orientation: Matrix3x3::from_mat4(matrix),
            translation: matrix.w_axis.truncate(),
        }
    }

    #[inline(always)]
    pub fn transform_point(&self, position: Vec3) -> Vec3 {
        self.orientation.transform_vector(position) + self.translation
    }

    /// Rotates a direction; the translation is ignored.
    #[inline(always)]
    pub fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.orientation.transform_vector(direction)
    }

    /// Inverts a rigid transform. The rotation is inverted by transposition.
    #[inline(always)]
    pub fn invert_rigid(transform: &Self, inverse: &mut Self) {
        Matrix3x3::transpose(&transform.orientation, &mut inverse.orientation);
        Matrix3x3::transform(
            &transform.translation,
            &inverse.orientation,
            &mut inverse.translation,
        );
        inverse.translation = -inverse.translation;
    }

    #[inline(always)]
    pub fn inverse(&self) -> Self {
        let mut result = Self::identity();
        Self::invert_rigid(self, &mut result);
        result
    }

    /// Multiplies a transform by another transform. The result applies `a`, then `b`.
    #[inline(always)]
    pub fn multiply(a: &Self, b: &Self, transform: &mut Self) {
        let mut translation = Vec3::ZERO;
        Matrix3x3::transform(&a.translation, &b.orientation, &mut translation);
        transform.translation = b.translation + translation;
        Matrix3x3::multiply(&a.orientation, &b.orientation, &mut transform.orientation);
    }

    /// Transform mapping points of the `from` frame into the `to` frame, given both frames'
    /// world transforms.
    #[inline(always)]
    pub fn relative(from: &Self, to: &Self) -> Self {
        let mut result = Self::identity();
        Self::multiply(from, &to.inverse(), &mut result);
        result
    }
}
