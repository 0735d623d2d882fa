use crate::utilities::rigid_transform::RigidTransform;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Sphere query shape.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// Location of the center of the sphere.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
}

impl Sphere {
    /// Creates a sphere shape.
    #[inline(always)]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    #[inline(always)]
    pub fn radius_squared(&self) -> f32 {
        self.radius * self.radius
    }

    #[inline(always)]
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            center: transform.transform_point(self.center),
            radius: self.radius,
        }
    }

    /// Squared distance from the center to a box, accumulated axis by axis. Stops as soon as
    /// the running sum exceeds `limit`, returning a value above it.
    #[inline(always)]
    pub fn box_distance_squared(&self, center: Vec3, extents: Vec3, limit: f32) -> f32 {
        let mut d = 0.0;
        for axis in 0..3 {
            let offset = self.center[axis] - center[axis];
            let below = offset + extents[axis];
            if below < 0.0 {
                d += below * below;
                if d > limit {
                    return d;
                }
            } else {
                let above = offset - extents[axis];
                if above > 0.0 {
                    d += above * above;
                    if d > limit {
                        return d;
                    }
                }
            }
        }
        d
    }

    /// True if the box given by `center` and `extents` touches the sphere.
    #[inline(always)]
    pub fn overlaps_box(&self, center: Vec3, extents: Vec3) -> bool {
        let r2 = self.radius_squared();
        self.box_distance_squared(center, extents, r2) <= r2
    }

    /// True if `other` lies entirely inside this sphere.
    #[inline(always)]
    pub fn contains_sphere(&self, other: &Sphere) -> bool {
        if other.radius > self.radius {
            return false;
        }
        let room = self.radius - other.radius;
        self.center.distance_squared(other.center) <= room * room
    }

    /// True if the box given by `center` and `extents` lies entirely inside this sphere.
    #[inline(always)]
    pub fn contains_box(&self, center: Vec3, extents: Vec3) -> bool {
        // The farthest corner from the sphere center decides.
        let farthest = (center - self.center).abs() + extents;
        farthest.length_squared() <= self.radius_squared()
    }
}
