use crate::utilities::matrix3x3::Matrix3x3;
use crate::utilities::plane::Plane;
use crate::utilities::rigid_transform::RigidTransform;
use crate::utilities::sat::BoxFrame;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Oriented box query shape.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub center: Vec3,
    /// Half extents along the box's own axes.
    pub extents: Vec3,
    /// Rows are the box's axes in the parent frame.
    pub rotation: Matrix3x3,
}

impl Default for Obb {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            extents: Vec3::ZERO,
            rotation: Matrix3x3::identity(),
        }
    }
}

impl Obb {
    /// Creates a box shape.
    #[inline(always)]
    pub fn new(center: Vec3, extents: Vec3, rotation: Matrix3x3) -> Self {
        Self {
            center,
            extents,
            rotation,
        }
    }

    #[inline(always)]
    pub fn axis_aligned(center: Vec3, extents: Vec3) -> Self {
        Self::new(center, extents, Matrix3x3::identity())
    }

    /// Transform from box space (origin at the center) to the parent frame.
    #[inline(always)]
    pub fn box_to_parent(&self) -> RigidTransform {
        RigidTransform::new(self.rotation, self.center)
    }

    /// Moves the box by `transform`.
    #[inline(always)]
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            center: transform.transform_point(self.center),
            extents: self.extents,
            rotation: self.rotation * transform.orientation,
        }
    }

    /// The six face planes, normals pointing out of the box.
    pub fn planes(&self) -> [Plane; 6] {
        let mut planes = [Plane::default(); 6];
        for axis in 0..3 {
            let n = self.rotation.row(axis);
            let offset = n.dot(self.center);
            planes[axis * 2] = Plane::new(n, -offset - self.extents[axis]);
            planes[axis * 2 + 1] = Plane::new(-n, offset - self.extents[axis]);
        }
        planes
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains(&self, other: &Obb) -> bool {
        let other_to_self = RigidTransform::relative(&other.box_to_parent(), &self.box_to_parent());
        BoxFrame::from_transform(&other_to_self).contains(
            self.extents,
            Vec3::ZERO,
            other.extents,
            Vec3::ZERO,
        )
    }
}
