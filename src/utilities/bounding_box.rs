use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::physics::collidables::sphere::Sphere;
use super::containment_type::ContainmentType;

/// Provides simple axis-aligned bounding box functionality.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Location with the lowest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub min: Vec3,
    /// Location with the highest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// Inverted box which acts as the identity for merges.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    /// Constructs a bounding box from the specified minimum and maximum.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// True if the box has not been grown from `EMPTY`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Computes a bounding box which contains two other bounding boxes.
    #[inline]
    pub fn create_merged(min_a: Vec3, max_a: Vec3, min_b: Vec3, max_b: Vec3) -> (Vec3, Vec3) {
        (min_a.min(min_b), max_a.max(max_b))
    }

    /// Computes a bounding box which contains two other bounding boxes.
    #[inline]
    pub fn create_merged_boxes(a: Self, b: Self) -> Self {
        let (min, max) = Self::create_merged(a.min, a.max, b.min, b.max);
        Self { min, max }
    }

    /// Grows the box to contain a point.
    #[inline]
    pub fn merge_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Determines if a bounding box intersects a bounding sphere.
    #[inline]
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let offset = sphere.center - self.min.max(sphere.center).min(self.max);
        offset.dot(offset) <= sphere.radius * sphere.radius
    }

    /// True if `other` lies entirely inside this box. Touching faces count as inside.
    #[inline]
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    #[inline]
    pub fn contains(&self, other: &BoundingBox) -> ContainmentType {
        if self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z
        {
            ContainmentType::Disjoint
        } else if self.contains_box(other) {
            ContainmentType::Contains
        } else {
            ContainmentType::Intersects
        }
    }

    /// Creates the smallest possible bounding box that contains a list of points.
    /// An empty list yields `EMPTY`.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::EMPTY;
        for point in points {
            bounds.merge_point(*point);
        }
        bounds
    }
}
