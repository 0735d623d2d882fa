use crate::utilities::rigid_transform::RigidTransform;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Half line starting at `origin`.
///
/// The direction is kept normalized, so hit distances and maximum distances are lengths.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RayParts")]
pub struct Ray {
    pub origin: Vec3,
    direction: Vec3,
}

/// Deserialized form of a [`Ray`], normalized on the way in.
#[derive(Deserialize)]
struct RayParts {
    origin: Vec3,
    direction: Vec3,
}

impl From<RayParts> for Ray {
    fn from(parts: RayParts) -> Self {
        Ray::new(parts.origin, parts.direction)
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        }
    }
}

impl Ray {
    /// Creates a ray, normalizing `direction`. A zero direction is kept as is and never hits.
    #[inline(always)]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(direction),
        }
    }

    /// Unit direction, or zero for a degenerate ray.
    #[inline(always)]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline(always)]
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            origin: transform.transform_point(self.origin),
            direction: transform.transform_direction(self.direction),
        }
    }
}

/// Finite segment between two points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub p0: Vec3,
    pub p1: Vec3,
}

impl Segment {
    #[inline(always)]
    pub fn new(p0: Vec3, p1: Vec3) -> Self {
        Self { p0, p1 }
    }

    #[inline(always)]
    pub fn length(&self) -> f32 {
        self.p0.distance(self.p1)
    }

    /// The ray starting at `p0` toward `p1`, and the segment length as its maximum distance.
    #[inline(always)]
    pub fn to_ray(&self) -> (Ray, f32) {
        (Ray::new(self.p0, self.p1 - self.p0), self.length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_to_ray() {
        let (ray, length) = Segment::new(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0)).to_ray();
        assert_eq!(length, 5.0);
        assert!((ray.direction().length() - 1.0).abs() < 1e-6);
        assert!((ray.origin + ray.direction() * 5.0 - Vec3::new(0.0, 3.0, 4.0)).length() < 1e-5);
        assert_eq!(Ray::new(Vec3::ONE, Vec3::ZERO).direction(), Vec3::ZERO);
    }

    #[test]
    fn loaded_rays_are_normalized() {
        let ray: Ray = ron::from_str("(origin: (1.0, 0.0, 0.0), direction: (0.0, 0.0, -4.0))").unwrap();
        assert_eq!(ray.direction(), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(ray.origin, Vec3::X);
        let saved = ron::to_string(&ray).unwrap();
        assert_eq!(ron::from_str::<Ray>(&saved).unwrap(), ray);
    }
}
