use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// 3 row, 3 column matrix.
///
/// Vectors are treated as rows: `v * M = v.x * M.x + v.y * M.y + v.z * M.z`. For a rotation,
/// the rows are the rotated frame's axes expressed in the parent frame.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix3x3 {
    /// First row of the matrix.
    pub x: Vec3,
    /// Second row of the matrix.
    pub y: Vec3,
    /// Third row of the matrix.
    pub z: Vec3,
}

impl Default for Matrix3x3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix3x3 {
    /// Gets the 3x3 identity matrix.
    #[inline(always)]
    pub const fn identity() -> Self {
        Self {
            x: Vec3::new(1.0, 0.0, 0.0),
            y: Vec3::new(0.0, 1.0, 0.0),
            z: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// Row `index`, 0 to 2.
    #[inline(always)]
    pub fn row(&self, index: usize) -> Vec3 {
        match index {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Computes the transposed matrix of a matrix.
    #[inline(always)]
    pub fn transpose(m: &Self, transposed: &mut Self) {
        let xy = m.x.y;
        let xz = m.x.z;
        let yz = m.y.z;
        transposed.x = Vec3::new(m.x.x, m.y.x, m.z.x);
        transposed.y = Vec3::new(xy, m.y.y, m.z.y);
        transposed.z = Vec3::new(xz, yz, m.z.z);
    }

    #[inline(always)]
    pub fn transposed(&self) -> Self {
        let mut result = Self::identity();
        Self::transpose(self, &mut result);
        result
    }

    /// Componentwise absolute value, with `epsilon` added to every entry.
    ///
    /// Used to bound projected box extents; the epsilon keeps nearly parallel edge pairs from
    /// producing a zero-length cross axis that would wrongly separate.
    #[inline(always)]
    pub fn absolute(&self, epsilon: f32) -> Self {
        let e = Vec3::splat(epsilon);
        Self {
            x: self.x.abs() + e,
            y: self.y.abs() + e,
            z: self.z.abs() + e,
        }
    }

    /// Transforms the vector by the matrix.
    #[inline(always)]
    pub fn transform(v: &Vec3, m: &Self, result: &mut Vec3) {
        let x = Vec3::splat(v.x);
        let y = Vec3::splat(v.y);
        let z = Vec3::splat(v.z);
        *result = m.x * x + m.y * y + m.z * z;
    }

    #[inline(always)]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    #[inline(always)]
    pub fn transform_transpose_vector(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.x), v.dot(self.y), v.dot(self.z))
    }

    /// Multiplies the two matrices. Applying the result equals applying `a`, then `b`.
    #[inline(always)]
    pub fn multiply(a: &Self, b: &Self, result: &mut Self) {
        let x = b.transform_vector(a.x);
        let y = b.transform_vector(a.y);
        let z = b.transform_vector(a.z);
        result.x = x;
        result.y = y;
        result.z = z;
    }

    #[inline(always)]
    pub fn create_from_quaternion(q: &Quat, result: &mut Self) {
        let qx2 = q.x + q.x;
        let qy2 = q.y + q.y;
        let qz2 = q.z + q.z;
        let xx = qx2 * q.x;
        let yy = qy2 * q.y;
        let zz = qz2 * q.z;
        let xy = qx2 * q.y;
        let xz = qx2 * q.z;
        let xw = qx2 * q.w;
        let yz = qy2 * q.z;
        let yw = qy2 * q.w;
        let zw = qz2 * q.w;

        result.x = Vec3::new(1.0 - yy - zz, xy + zw, xz - yw);
        result.y = Vec3::new(xy - zw, 1.0 - xx - zz, yz + xw);
        result.z = Vec3::new(xz + yw, yz - xw, 1.0 - xx - yy);
    }

    #[inline(always)]
    pub fn from_quaternion(q: Quat) -> Self {
        let mut result = Self::identity();
        Self::create_from_quaternion(&q, &mut result);
        result
    }

    /// Creates a matrix representing a rotation derived from a unit axis and angle.
    #[inline(always)]
    pub fn create_from_axis_angle(axis: &Vec3, angle: f32, result: &mut Self) {
        let xx = axis.x * axis.x;
        let yy = axis.y * axis.y;
        let zz = axis.z * axis.z;
        let xy = axis.x * axis.y;
        let xz = axis.x * axis.z;
        let yz = axis.y * axis.z;

        let sin_angle = angle.sin();
        let one_minus_cos_angle = 1.0 - angle.cos();

        result.x = Vec3::new(
            1.0 + one_minus_cos_angle * (xx - 1.0),
            axis.z * sin_angle + one_minus_cos_angle * xy,
            -axis.y * sin_angle + one_minus_cos_angle * xz,
        );
        result.y = Vec3::new(
            -axis.z * sin_angle + one_minus_cos_angle * xy,
            1.0 + one_minus_cos_angle * (yy - 1.0),
            axis.x * sin_angle + one_minus_cos_angle * yz,
        );
        result.z = Vec3::new(
            axis.y * sin_angle + one_minus_cos_angle * xz,
            -axis.x * sin_angle + one_minus_cos_angle * yz,
            1.0 + one_minus_cos_angle * (zz - 1.0),
        );
    }

    #[inline(always)]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let mut result = Self::identity();
        Self::create_from_axis_angle(&axis, angle, &mut result);
        result
    }

    /// Takes the rotation part of a glam column-major matrix. glam's columns are the images of
    /// the basis vectors, which are exactly the rows of the row-vector convention used here.
    #[inline(always)]
    pub fn from_mat4(matrix: &Mat4) -> Self {
        Self {
            x: matrix.x_axis.truncate(),
            y: matrix.y_axis.truncate(),
            z: matrix.z_axis.truncate(),
        }
    }
}

impl Mul for Matrix3x3 {
    type Output = Self;

    #[inline(always)]
    fn mul(self, other: Self) -> Self::Output {
        let mut result = Self::identity();
        Self::multiply(&self, &other, &mut result);
        result
    }
}
