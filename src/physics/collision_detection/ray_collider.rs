use crate::config::CollisionConfig;
use crate::physics::collidables::mesh::{CollisionModel, IMeshInterface};
use crate::physics::collidables::ray::{Ray, Segment};
use crate::physics::trees::bounding_volume::CollisionAabb;
use crate::physics::trees::link::Link;
use crate::physics::trees::node::{CollisionNode, NodeContent};
use crate::physics::trees::optimized_tree::{OptimizedTree, TreeId};
use crate::physics::trees::tree::AabbTree;
use crate::utilities::sat::greater;
use glam::{Mat4, Vec3};
use log::trace;
use serde::{Deserialize, Serialize};

use super::collider::{check_mesh, check_settings, shape_to_model, ColliderBase, ColliderError, ColliderFlags, QueryStats};

pub const DEFAULT_MAX_DIST: f32 = f32::MAX;

const CLOSEST_HIT_WITH_FIRST_CONTACT: &str = "Closest hit doesn't work with first contact mode";
const NEGATIVE_MAX_DIST: &str = "Max distance must be non-negative";

/// One ray/triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionFace {
    pub face_id: u32,
    /// Distance from the ray origin, along the normalized direction.
    pub distance: f32,
    /// Barycentric coordinates of the hit point.
    pub u: f32,
    pub v: f32,
}

/// Caller owned list the ray collider writes its hits to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionFaces {
    faces: Vec<CollisionFace>,
}

impl CollisionFaces {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn faces(&self) -> &[CollisionFace] {
        &self.faces
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn clear(&mut self) {
        self.faces.clear();
    }

    /// Nearest hit of the list.
    pub fn closest(&self) -> Option<&CollisionFace> {
        self.faces.iter().min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    #[inline(always)]
    fn push(&mut self, face: CollisionFace) {
        self.faces.push(face);
    }

    #[inline(always)]
    fn replace_with(&mut self, face: CollisionFace) {
        self.faces.clear();
        self.faces.push(face);
    }
}

/// Face stabbed by the last first contact query, tested before walking the tree again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RayCache {
    last_face: Option<u32>,
    tree: Option<TreeId>,
}

impl RayCache {
    #[inline(always)]
    pub fn last_face(&self) -> Option<u32> {
        self.last_face
    }

    pub fn invalidate(&mut self) {
        *self = Self::default();
    }
}

/// Midpoint form of a finite segment, in the layout the box test wants.
#[derive(Clone, Copy, Debug)]
struct SegmentData {
    half: Vec3,
    mid: Vec3,
    abs_half: Vec3,
}

impl SegmentData {
    fn new(origin: Vec3, direction: Vec3, length: f32) -> Self {
        let half = direction * (length * 0.5);
        Self {
            half,
            mid: origin + half,
            abs_half: half.abs(),
        }
    }

    #[inline(always)]
    fn overlaps(&self, bounds: &CollisionAabb) -> bool {
        let d = self.mid - bounds.center;
        let e = bounds.extents;
        let f = self.abs_half;
        if greater(d.x, e.x + f.x) || greater(d.y, e.y + f.y) || greater(d.z, e.z + f.z) {
            return false;
        }
        cross_axes_overlap(self.half, f, d, e)
    }
}

/// The three axes `direction × box axis` of a ray or segment against a box.
#[inline(always)]
fn cross_axes_overlap(direction: Vec3, abs_direction: Vec3, d: Vec3, e: Vec3) -> bool {
    let f = direction.y * d.z - direction.z * d.y;
    if greater(f, e.y * abs_direction.z + e.z * abs_direction.y) {
        return false;
    }
    let f = direction.z * d.x - direction.x * d.z;
    if greater(f, e.x * abs_direction.z + e.z * abs_direction.x) {
        return false;
    }
    let f = direction.x * d.y - direction.y * d.x;
    !greater(f, e.x * abs_direction.y + e.y * abs_direction.x)
}

/// Half infinite ray against a box.
#[inline(always)]
fn ray_aabb_overlap(origin: Vec3, direction: Vec3, abs_direction: Vec3, bounds: &CollisionAabb) -> bool {
    let d = origin - bounds.center;
    let e = bounds.extents;
    // Starting outside a slab and heading away from it.
    if (greater(d.x, e.x) && d.x * direction.x >= 0.0)
        || (greater(d.y, e.y) && d.y * direction.y >= 0.0)
        || (greater(d.z, e.z) && d.z * direction.z >= 0.0)
    {
        return false;
    }
    cross_axes_overlap(direction, abs_direction, d, e)
}

struct RayWalker<'a, N, M: ?Sized> {
    tree: &'a OptimizedTree<N>,
    mesh: &'a M,
    stats: &'a mut QueryStats,
    faces: &'a mut CollisionFaces,
    origin: Vec3,
    direction: Vec3,
    abs_direction: Vec3,
    max_dist: f32,
    /// Set whenever `max_dist` is finite.
    segment: Option<SegmentData>,
    closest_hit: bool,
    culling: bool,
    first_contact: bool,
    nb_intersections: u32,
    done: bool,
}

impl<'a, N, M> RayWalker<'a, N, M>
where
    N: CollisionNode,
    M: IMeshInterface + ?Sized,
{
    fn set_max_dist(&mut self, max_dist: f32) {
        self.max_dist = max_dist;
        self.segment = if max_dist < f32::MAX {
            Some(SegmentData::new(self.origin, self.direction, max_dist))
        } else {
            None
        };
    }

    #[inline(always)]
    fn overlaps(&self, bounds: &CollisionAabb) -> bool {
        match &self.segment {
            Some(segment) => segment.overlaps(bounds),
            None => ray_aabb_overlap(self.origin, self.direction, self.abs_direction, bounds),
        }
    }

    /// Position of a child box along the ray, used to visit the nearer child first.
    #[inline(always)]
    fn order_key(&self, link: Link) -> Option<f32> {
        match link {
            Link::Child(index) => Some((self.tree.node_bounds(index).center - self.origin).dot(self.direction)),
            _ => None,
        }
    }

    fn visit(&mut self, link: Link) {
        if self.done {
            return;
        }
        match link {
            Link::Empty => {}
            Link::Primitive(primitive) => {
                self.stab(primitive);
            }
            Link::Child(index) => {
                self.stats.bv_bv_tests += 1;
                if !self.overlaps(&self.tree.node_bounds(index)) {
                    return;
                }
                match self.tree.node(index).content() {
                    NodeContent::Primitive(primitive) => {
                        self.stab(primitive);
                    }
                    NodeContent::Children(positive, negative) => {
                        let (first, second) = match (self.order_key(positive), self.order_key(negative)) {
                            (Some(p), Some(n)) if n < p => (negative, positive),
                            _ => (positive, negative),
                        };
                        self.visit(first);
                        self.visit(second);
                    }
                }
            }
        }
    }

    /// Returns true if the primitive was hit within range.
    fn stab(&mut self, primitive: u32) -> bool {
        self.stats.bv_prim_tests += 1;
        let triangle = self.mesh.triangle(primitive);
        let hit = match triangle.ray_test(self.origin, self.direction, self.culling) {
            Some(hit) if hit.distance <= self.max_dist => hit,
            _ => return false,
        };
        self.nb_intersections += 1;
        let face = CollisionFace {
            face_id: primitive,
            distance: hit.distance,
            u: hit.u,
            v: hit.v,
        };
        if self.closest_hit {
            if self.faces.closest().map_or(true, |best| hit.distance < best.distance) {
                self.faces.replace_with(face);
                // Nothing beyond the best hit can matter anymore.
                self.set_max_dist(hit.distance);
            }
        } else {
            self.faces.push(face);
        }
        self.done = self.first_contact;
        true
    }
}

/// Ray (or segment) against model.
#[derive(Debug, Clone)]
pub struct RayCollider {
    base: ColliderBase,
    closest_hit: bool,
    culling: bool,
    max_dist: f32,
    nb_intersections: u32,
}

impl Default for RayCollider {
    fn default() -> Self {
        Self::new(ColliderFlags::default())
    }
}

impl_collider_flags!(RayCollider);

impl RayCollider {
    pub fn new(flags: ColliderFlags) -> Self {
        Self {
            base: ColliderBase::new(flags),
            closest_hit: false,
            culling: true,
            max_dist: DEFAULT_MAX_DIST,
            nb_intersections: 0,
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        let mut collider = Self::new(config.flags);
        collider.set_closest_hit(config.ray.closest_hit);
        collider.set_culling(config.ray.culling);
        collider.set_max_dist(config.ray.max_dist);
        collider
    }

    /// Keep only the nearest hit instead of every hit.
    #[inline(always)]
    pub fn set_closest_hit(&mut self, closest_hit: bool) {
        self.closest_hit = closest_hit;
    }

    /// Ignore triangles seen from the back.
    #[inline(always)]
    pub fn set_culling(&mut self, culling: bool) {
        self.culling = culling;
    }

    /// Hits farther than this are ignored. `f32::MAX` means an unbounded ray.
    #[inline(always)]
    pub fn set_max_dist(&mut self, max_dist: f32) {
        self.max_dist = max_dist;
    }

    #[inline(always)]
    pub fn closest_hit(&self) -> bool {
        self.closest_hit
    }

    #[inline(always)]
    pub fn culling(&self) -> bool {
        self.culling
    }

    #[inline(always)]
    pub fn max_dist(&self) -> f32 {
        self.max_dist
    }

    /// Valid intersections met by the last query. In closest hit mode subtrees beyond the
    /// best hit are skipped, so farther intersections are not counted.
    #[inline(always)]
    pub fn nb_intersections(&self) -> u32 {
        self.nb_intersections
    }

    pub fn validate_settings(&self) -> Option<&'static str> {
        if let Some(message) = self.base.validate_exact() {
            return Some(message);
        }
        if self.closest_hit && self.base.flags.first_contact {
            return Some(CLOSEST_HIT_WITH_FIRST_CONTACT);
        }
        if self.max_dist.is_nan() || self.max_dist < 0.0 {
            return Some(NEGATIVE_MAX_DIST);
        }
        None
    }

    /// Stabs `model` with a world space ray. Hits replace the content of `faces`.
    pub fn collide<M: IMeshInterface>(
        &mut self,
        cache: &mut RayCache,
        faces: &mut CollisionFaces,
        ray: &Ray,
        model: &CollisionModel<M>,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError> {
        let mesh = model.mesh();
        let max_dist = self.max_dist;
        with_optimized_tree!(model.tree(), tree => {
            self.collide_tree(cache, faces, ray, max_dist, tree, mesh, world_model)
        })
    }

    /// Stabs `model` with a world space segment. The segment length further bounds the
    /// collider's max distance.
    pub fn collide_segment<M: IMeshInterface>(
        &mut self,
        cache: &mut RayCache,
        faces: &mut CollisionFaces,
        segment: &Segment,
        model: &CollisionModel<M>,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError> {
        let (ray, length) = segment.to_ray();
        let mesh = model.mesh();
        let max_dist = self.max_dist.min(length);
        with_optimized_tree!(model.tree(), tree => {
            self.collide_tree(cache, faces, &ray, max_dist, tree, mesh, world_model)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn collide_tree<N, M>(
        &mut self,
        cache: &mut RayCache,
        faces: &mut CollisionFaces,
        ray: &Ray,
        max_dist: f32,
        tree: &OptimizedTree<N>,
        mesh: &M,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError>
    where
        N: CollisionNode,
        M: IMeshInterface + ?Sized,
    {
        check_settings(self.validate_settings())?;
        check_mesh(tree.nb_primitives(), mesh)?;
        self.base.begin_query();
        self.nb_intersections = 0;
        faces.clear();

        let local = ray.transformed(&shape_to_model(None, world_model));
        let flags = self.base.flags;
        let mut walker = RayWalker {
            tree,
            mesh,
            stats: &mut self.base.stats,
            faces,
            origin: local.origin,
            direction: local.direction(),
            abs_direction: local.direction().abs(),
            max_dist,
            segment: None,
            closest_hit: self.closest_hit,
            culling: self.culling,
            first_contact: flags.first_contact,
            nb_intersections: 0,
            done: false,
        };
        walker.set_max_dist(max_dist);

        let coherent = flags.temporal_coherence && flags.first_contact && cache.tree == Some(tree.id());
        let reused = match cache.last_face {
            Some(face) if coherent => walker.stab(face),
            _ => false,
        };
        if reused {
            trace!("Ray query kept its cached face");
        } else {
            walker.visit(tree.root());
        }
        self.nb_intersections = walker.nb_intersections;

        if flags.first_contact {
            cache.last_face = faces.faces().first().map(|face| face.face_id);
            cache.tree = Some(tree.id());
        }
        self.base.contact = !faces.is_empty();
        Ok(())
    }

    /// Coarse query against a source tree: the primitives of every leaf box the ray reaches
    /// within max distance, nearest box first, without triangle tests.
    pub fn collide_source_tree(&mut self, ray: &Ray, tree: &AabbTree, touched: &mut Vec<u32>) {
        self.base.begin_query();
        touched.clear();
        tree.ray_cast(ray.origin, ray.direction(), self.max_dist, touched);
        self.base.contact = !touched.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collidables::mesh::{ModelSettings, TriangleMesh};
    use approx::assert_relative_eq;
    use glam::Quat;

    /// Stack of unit triangles facing +z at z = 0, 1, ..., count - 1.
    fn stack(count: u32) -> TriangleMesh {
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..count {
            let z = i as f32;
            let base = vertices.len() as u32;
            vertices.extend([Vec3::new(0.0, 0.0, z), Vec3::new(1.0, 0.0, z), Vec3::new(0.0, 1.0, z)]);
            triangles.push([base, base + 1, base + 2]);
        }
        TriangleMesh::new(triangles, vertices)
    }

    fn down() -> Ray {
        Ray::new(Vec3::new(0.25, 0.25, 10.0), -Vec3::Z)
    }

    #[test]
    fn all_hits_and_closest_hit() {
        let model = CollisionModel::build(stack(6), ModelSettings::default()).unwrap();
        let mut collider = RayCollider::default();
        let mut cache = RayCache::default();
        let mut faces = CollisionFaces::new();

        collider.collide(&mut cache, &mut faces, &down(), &model, None).unwrap();
        assert_eq!(faces.len(), 6);
        assert_eq!(collider.nb_intersections(), 6);
        assert_eq!(faces.closest().unwrap().face_id, 5);

        collider.set_closest_hit(true);
        collider.collide(&mut cache, &mut faces, &down(), &model, None).unwrap();
        assert_eq!(faces.len(), 1);
        let face = faces.faces()[0];
        assert_eq!(face.face_id, 5);
        assert_relative_eq!(face.distance, 5.0, epsilon = 1e-5);
        assert_relative_eq!(face.u, 0.25, epsilon = 1e-5);
        assert_relative_eq!(face.v, 0.25, epsilon = 1e-5);
    }

    #[test]
    fn max_distance_and_segments() {
        let model = CollisionModel::build(stack(6), ModelSettings { no_leaf: true, quantized: true }).unwrap();
        let mut collider = RayCollider::default();
        let mut cache = RayCache::default();
        let mut faces = CollisionFaces::new();

        collider.set_max_dist(7.5);
        collider.collide(&mut cache, &mut faces, &down(), &model, None).unwrap();
        let mut ids: Vec<u32> = faces.faces().iter().map(|f| f.face_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![3, 4, 5]);

        collider.set_max_dist(DEFAULT_MAX_DIST);
        let segment = Segment::new(Vec3::new(0.25, 0.25, 4.5), Vec3::new(0.25, 0.25, 1.5));
        collider.collide_segment(&mut cache, &mut faces, &segment, &model, None).unwrap();
        let mut ids: Vec<u32> = faces.faces().iter().map(|f| f.face_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn culling_skips_back_faces() {
        let model = CollisionModel::build(stack(3), ModelSettings::default()).unwrap();
        let mut collider = RayCollider::default();
        let mut cache = RayCache::default();
        let mut faces = CollisionFaces::new();
        let up = Ray::new(Vec3::new(0.25, 0.25, -5.0), Vec3::Z);
        collider.collide(&mut cache, &mut faces, &up, &model, None).unwrap();
        assert!(faces.is_empty());
        assert!(!collider.contact_status());

        collider.set_culling(false);
        collider.collide(&mut cache, &mut faces, &up, &model, None).unwrap();
        assert_eq!(faces.len(), 3);
    }

    #[test]
    fn world_model_matrix() {
        let model = CollisionModel::build(stack(1), ModelSettings::default()).unwrap();
        // Model turned upside down and lifted: its triangle faces -z at height 3.
        let world = Mat4::from_rotation_translation(Quat::from_rotation_x(std::f32::consts::PI), Vec3::new(0.0, 0.0, 3.0));
        let mut collider = RayCollider::default();
        collider.set_culling(false);
        let mut cache = RayCache::default();
        let mut faces = CollisionFaces::new();
        let ray = Ray::new(Vec3::new(0.25, -0.25, 10.0), -Vec3::Z);
        collider.collide(&mut cache, &mut faces, &ray, &model, Some(&world)).unwrap();
        assert_eq!(faces.len(), 1);
        assert_relative_eq!(faces.faces()[0].distance, 7.0, epsilon = 1e-4);
    }

    #[test]
    fn first_contact_coherence() {
        let model = CollisionModel::build(stack(4), ModelSettings::default()).unwrap();
        let mut collider = RayCollider::default();
        collider.set_first_contact(true);
        collider.set_temporal_coherence(true);
        let mut cache = RayCache::default();
        let mut faces = CollisionFaces::new();
        collider.collide(&mut cache, &mut faces, &down(), &model, None).unwrap();
        assert_eq!(faces.len(), 1);
        let first = faces.faces()[0].face_id;
        assert_eq!(cache.last_face(), Some(first));

        collider.collide(&mut cache, &mut faces, &down(), &model, None).unwrap();
        assert_eq!(faces.faces()[0].face_id, first);
        assert_eq!(collider.stats().bv_bv_tests, 0);
        assert_eq!(collider.stats().bv_prim_tests, 1);
    }

    #[test]
    fn invalid_settings() {
        let model = CollisionModel::build(stack(1), ModelSettings::default()).unwrap();
        let mut cache = RayCache::default();
        let mut faces = CollisionFaces::new();

        let mut collider = RayCollider::default();
        collider.set_closest_hit(true);
        collider.set_first_contact(true);
        assert_eq!(collider.validate_settings(), Some(CLOSEST_HIT_WITH_FIRST_CONTACT));
        assert_eq!(
            collider.collide(&mut cache, &mut faces, &down(), &model, None),
            Err(ColliderError::InvalidSettings(CLOSEST_HIT_WITH_FIRST_CONTACT))
        );

        let mut collider = RayCollider::default();
        collider.set_max_dist(-1.0);
        assert_eq!(collider.validate_settings(), Some(NEGATIVE_MAX_DIST));
        collider.set_max_dist(f32::NAN);
        assert_eq!(collider.validate_settings(), Some(NEGATIVE_MAX_DIST));
    }

    #[test]
    fn source_tree_query() {
        let tree = AabbTree::from_mesh(&stack(5), Default::default()).unwrap();
        let mut collider = RayCollider::default();
        collider.set_max_dist(8.5);
        let mut touched = Vec::new();
        collider.collide_source_tree(&down(), &tree, &mut touched);
        assert_eq!(touched, vec![4, 3, 2]);
    }
}
