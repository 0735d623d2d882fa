use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::rigid_transform::RigidTransform;
use crate::utilities::sat::BoxFrame;
use glam::Vec3;

/// Determinant threshold below which a ray counts as parallel to a triangle.
pub const LOCAL_EPSILON: f32 = 1e-6;

/// Result of a ray/triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Ray parameter of the hit, in units of the ray direction's length.
    pub distance: f32,
    /// Barycentric weight of the second vertex.
    pub u: f32,
    /// Barycentric weight of the third vertex.
    pub v: f32,
}

/// Triangle primitive fetched from a mesh, in the mesh's local space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex of the triangle in local space.
    pub a: Vec3,
    /// Second vertex of the triangle in local space.
    pub b: Vec3,
    /// Third vertex of the triangle in local space.
    pub c: Vec3,
}

impl From<[Vec3; 3]> for Triangle {
    #[inline(always)]
    fn from(vertices: [Vec3; 3]) -> Self {
        Self::new(vertices[0], vertices[1], vertices[2])
    }
}

impl Triangle {
    /// Creates a triangle shape.
    #[inline(always)]
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    #[inline(always)]
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    /// Unnormalized face normal, `(b - a) x (c - a)`.
    #[inline(always)]
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a)
    }

    #[inline(always)]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.a.min(self.b).min(self.c),
            self.a.max(self.b).max(self.c),
        )
    }

    #[inline(always)]
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            a: transform.transform_point(self.a),
            b: transform.transform_point(self.b),
            c: transform.transform_point(self.c),
        }
    }

    /// Moves the triangle from frame B into frame A of a box frame.
    #[inline(always)]
    pub fn transformed_by_frame(&self, frame: &BoxFrame) -> Self {
        Self {
            a: frame.transform_point(self.a),
            b: frame.transform_point(self.b),
            c: frame.transform_point(self.c),
        }
    }

    /// Möller–Trumbore ray test.
    ///
    /// With `culling`, triangles seen from the back (counterclockwise from the ray origin's
    /// side is the front) are ignored. Hits behind the origin are never reported.
    #[inline(always)]
    pub fn ray_test(&self, origin: Vec3, direction: Vec3, culling: bool) -> Option<TriangleHit> {
        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;
        let pvec = direction.cross(edge2);
        let det = edge1.dot(pvec);

        if culling {
            if det < LOCAL_EPSILON {
                return None;
            }
            let tvec = origin - self.a;
            let u = tvec.dot(pvec);
            if u < 0.0 || u > det {
                return None;
            }
            let qvec = tvec.cross(edge1);
            let v = direction.dot(qvec);
            if v < 0.0 || u + v > det {
                return None;
            }
            let distance = edge2.dot(qvec);
            if distance < 0.0 {
                return None;
            }
            let inverse_det = 1.0 / det;
            Some(TriangleHit {
                distance: distance * inverse_det,
                u: u * inverse_det,
                v: v * inverse_det,
            })
        } else {
            if det.abs() < LOCAL_EPSILON {
                return None;
            }
            let inverse_det = 1.0 / det;
            let tvec = origin - self.a;
            let u = tvec.dot(pvec) * inverse_det;
            if !(0.0..=1.0).contains(&u) {
                return None;
            }
            let qvec = tvec.cross(edge1);
            let v = direction.dot(qvec) * inverse_det;
            if v < 0.0 || u + v > 1.0 {
                return None;
            }
            let distance = edge2.dot(qvec) * inverse_det;
            if distance < 0.0 {
                return None;
            }
            Some(TriangleHit { distance, u, v })
        }
    }

    /// Closest point on the triangle to `p`, picking among the vertex, edge and face regions.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        let (a, b, c) = (self.a, self.b, self.c);
        let ab = b - a;
        let ac = c - a;

        let ap = p - a;
        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = p - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return a + ab * v;
        }

        let cp = p - c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return a + ac * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return b + (c - b) * w;
        }

        let mut denom = va + vb + vc;
        if denom != 0.0 {
            denom = 1.0 / denom;
        }
        a + ab * (vb * denom) + ac * (vc * denom)
    }

    /// True if the triangle comes strictly closer than `sqrt(radius2)` to `center`.
    #[inline(always)]
    pub fn sphere_overlap(&self, center: Vec3, radius2: f32) -> bool {
        // Early out when a vertex is already inside.
        if self.a.distance_squared(center) < radius2
            || self.b.distance_squared(center) < radius2
            || self.c.distance_squared(center) < radius2
        {
            return true;
        }
        self.closest_point(center).distance_squared(center) < radius2
    }

    /// Separating axis test against an axis aligned box.
    ///
    /// The box's face normals and the triangle normal are always tested; the nine edge
    /// cross products only with `full_test`.
    pub fn aabb_overlap(&self, center: Vec3, extents: Vec3, full_test: bool) -> bool {
        let v = [self.a - center, self.b - center, self.c - center];

        if full_test {
            let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];
            for e in edges {
                for axis in [
                    Vec3::new(0.0, -e.z, e.y),
                    Vec3::new(e.z, 0.0, -e.x),
                    Vec3::new(-e.y, e.x, 0.0),
                ] {
                    let p0 = axis.dot(v[0]);
                    let p1 = axis.dot(v[1]);
                    let p2 = axis.dot(v[2]);
                    let radius = extents.dot(axis.abs());
                    if p0.min(p1).min(p2) > radius || p0.max(p1).max(p2) < -radius {
                        return false;
                    }
                }
            }
        }

        let min = v[0].min(v[1]).min(v[2]);
        let max = v[0].max(v[1]).max(v[2]);
        if min.cmpgt(extents).any() || max.cmplt(-extents).any() {
            return false;
        }

        let normal = (v[1] - v[0]).cross(v[2] - v[0]);
        normal.dot(v[0]).abs() <= extents.dot(normal.abs())
    }

    /// Separating axis test between two triangles given in the same frame.
    ///
    /// Tests both normals and the nine edge cross products. Coplanar pairs fall back to the
    /// in-plane edge normals.
    pub fn triangle_overlap(&self, other: &Triangle) -> bool {
        let a = self.vertices();
        let b = other.vertices();
        let edges_a = [a[1] - a[0], a[2] - a[1], a[0] - a[2]];
        let edges_b = [b[1] - b[0], b[2] - b[1], b[0] - b[2]];
        let normal_a = edges_a[0].cross(-edges_a[2]);
        let normal_b = edges_b[0].cross(-edges_b[2]);

        let separated = |axis: Vec3| -> bool {
            if axis.length_squared() <= f32::EPSILON * f32::EPSILON {
                return false;
            }
            let pa = [axis.dot(a[0]), axis.dot(a[1]), axis.dot(a[2])];
            let pb = [axis.dot(b[0]), axis.dot(b[1]), axis.dot(b[2])];
            let min_a = pa[0].min(pa[1]).min(pa[2]);
            let max_a = pa[0].max(pa[1]).max(pa[2]);
            let min_b = pb[0].min(pb[1]).min(pb[2]);
            let max_b = pb[0].max(pb[1]).max(pb[2]);
            min_a > max_b || min_b > max_a
        };

        if separated(normal_a) || separated(normal_b) {
            return false;
        }
        for ea in edges_a {
            for eb in edges_b {
                if separated(ea.cross(eb)) {
                    return false;
                }
            }
        }

        let parallel = normal_a.cross(normal_b).length_squared()
            <= LOCAL_EPSILON * normal_a.length_squared() * normal_b.length_squared();
        if parallel {
            for e in edges_a {
                if separated(normal_a.cross(e)) {
                    return false;
                }
            }
            for e in edges_b {
                if separated(normal_a.cross(e)) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit() -> Triangle {
        Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y)
    }

    #[test]
    fn ray_hits_front_face() {
        let hit = unit()
            .ray_test(Vec3::new(0.2, 0.2, 5.0), Vec3::new(0.0, 0.0, -1.0), true)
            .unwrap();
        assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-5);
        assert_relative_eq!(hit.u, 0.2, epsilon = 1e-5);
        assert_relative_eq!(hit.v, 0.2, epsilon = 1e-5);
        assert!(unit().ray_test(Vec3::new(5.0, 5.0, 5.0), Vec3::new(0.0, 0.0, -1.0), true).is_none());
    }

    #[test]
    fn culling_ignores_back_face() {
        let origin = Vec3::new(0.2, 0.2, -5.0);
        assert!(unit().ray_test(origin, Vec3::Z, true).is_none());
        let hit = unit().ray_test(origin, Vec3::Z, false).unwrap();
        assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-5);
        // Behind the origin.
        assert!(unit().ray_test(Vec3::new(0.2, 0.2, 5.0), Vec3::Z, false).is_none());
    }

    #[test]
    fn closest_point_regions() {
        let t = unit();
        assert_eq!(t.closest_point(Vec3::new(-1.0, -1.0, 0.0)), Vec3::ZERO);
        assert_eq!(t.closest_point(Vec3::new(2.0, -0.5, 0.0)), Vec3::X);
        assert_eq!(t.closest_point(Vec3::new(0.5, -1.0, 3.0)), Vec3::new(0.5, 0.0, 0.0));
        let face = t.closest_point(Vec3::new(0.25, 0.25, 2.0));
        assert_relative_eq!(face.x, 0.25);
        assert_relative_eq!(face.y, 0.25);
        assert_relative_eq!(face.z, 0.0);
        let hypotenuse = t.closest_point(Vec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(hypotenuse.x, 0.5);
        assert_relative_eq!(hypotenuse.y, 0.5);
    }

    #[test]
    fn sphere_overlap_is_strict() {
        let t = unit();
        assert!(t.sphere_overlap(Vec3::new(0.25, 0.25, 0.5), 0.26));
        assert!(!t.sphere_overlap(Vec3::new(0.25, 0.25, 0.5), 0.25));
    }

    #[test]
    fn box_overlap() {
        let t = unit();
        assert!(t.aabb_overlap(Vec3::new(0.2, 0.2, 0.0), Vec3::splat(0.1), true));
        assert!(!t.aabb_overlap(Vec3::new(0.2, 0.2, 0.5), Vec3::splat(0.1), true));
        // Near the hypotenuse: only the edge axes separate.
        let center = Vec3::new(0.7, 0.7, 0.0);
        let extents = Vec3::new(0.15, 0.15, 1.0);
        assert!(!t.aabb_overlap(center, extents, true));
        assert!(t.aabb_overlap(center, extents, false));
    }

    #[test]
    fn triangle_overlap() {
        let t = unit();
        let crossing = Triangle::new(Vec3::new(0.2, 0.2, -1.0), Vec3::new(0.2, 0.2, 1.0), Vec3::new(-1.0, -1.0, 0.0));
        assert!(t.triangle_overlap(&crossing));
        assert!(crossing.triangle_overlap(&t));
        let above = Triangle::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 1.0));
        assert!(!t.triangle_overlap(&above));
        let coplanar_apart = Triangle::new(Vec3::new(1.0, 1.0, 0.0), Vec3::new(2.0, 1.0, 0.0), Vec3::new(1.0, 2.0, 0.0));
        assert!(!t.triangle_overlap(&coplanar_apart));
        let coplanar_overlapping = Triangle::new(Vec3::new(0.1, 0.1, 0.0), Vec3::new(2.0, 0.1, 0.0), Vec3::new(0.1, 2.0, 0.0));
        assert!(t.triangle_overlap(&coplanar_overlapping));
    }
}
