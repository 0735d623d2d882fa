use crate::utilities::rigid_transform::RigidTransform;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Plane `n·p + d = 0`. Points with a positive distance are on the outer side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    #[inline(always)]
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Plane through `point` facing `normal`.
    #[inline(always)]
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    /// Signed distance, scaled by the normal's length.
    #[inline(always)]
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// Re-expresses a plane given in a parent frame inside the local frame `transform` maps
    /// from.
    #[inline(always)]
    pub fn to_local(&self, transform: &RigidTransform) -> Self {
        // n_local·p = n·(pR), so n_local = R n.
        let normal = transform.orientation.transform_transpose_vector(self.normal);
        Self {
            normal,
            d: self.normal.dot(transform.translation) + self.d,
        }
    }
}
