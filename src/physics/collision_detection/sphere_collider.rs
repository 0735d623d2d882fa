use crate::config::CollisionConfig;
use crate::physics::collidables::mesh::{CollisionModel, IMeshInterface};
use crate::physics::collidables::sphere::Sphere;
use crate::physics::collidables::triangle::Triangle;
use crate::physics::trees::bounding_volume::CollisionAabb;
use crate::physics::trees::node::CollisionNode;
use crate::physics::trees::optimized_tree::{OptimizedTree, TreeId};
use crate::physics::trees::tree::AabbTree;
use glam::{Mat4, Vec3};
use log::trace;

use super::collider::{check_mesh, check_settings, shape_to_model, ColliderBase, ColliderError, ColliderFlags};
use super::volume_query::{keep_single_contact, IVolumeQuery, NodeTest, VolumeWalker};

pub const DEFAULT_SPHERE_FAT_COEFF: f32 = 1.1;

/// Results of the last sphere query, and the fattened sphere they are valid for.
#[derive(Debug, Clone)]
pub struct SphereCache {
    touched: Vec<u32>,
    center: Vec3,
    fat_radius2: f32,
    /// Scale applied to the radius when the cache is refreshed.
    pub fat_coeff: f32,
    tree: Option<TreeId>,
}

impl Default for SphereCache {
    fn default() -> Self {
        Self::new(DEFAULT_SPHERE_FAT_COEFF)
    }
}

impl SphereCache {
    pub fn new(fat_coeff: f32) -> Self {
        Self {
            touched: Vec::new(),
            center: Vec3::ZERO,
            fat_radius2: 0.0,
            fat_coeff,
            tree: None,
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.sphere.fat_coeff)
    }

    /// Primitives reported by the last query.
    #[inline(always)]
    pub fn touched(&self) -> &[u32] {
        &self.touched
    }

    /// Forces the next query to walk the tree.
    pub fn invalidate(&mut self) {
        self.touched.clear();
        self.tree = None;
    }

    #[inline(always)]
    fn fat_sphere(&self) -> Sphere {
        Sphere::new(self.center, self.fat_radius2.sqrt())
    }
}

struct SphereQuery {
    sphere: Sphere,
    radius2: f32,
}

impl IVolumeQuery for SphereQuery {
    type State = ();

    #[inline(always)]
    fn root_state(&self) {}

    #[inline(always)]
    fn test_node(&self, bounds: &CollisionAabb, _: (), _: bool) -> NodeTest<()> {
        if !self.sphere.overlaps_box(bounds.center, bounds.extents) {
            NodeTest::Disjoint
        } else if self.sphere.contains_box(bounds.center, bounds.extents) {
            NodeTest::Contained
        } else {
            NodeTest::Overlap(())
        }
    }

    #[inline(always)]
    fn test_primitive(&self, triangle: &Triangle, _: ()) -> bool {
        triangle.sphere_overlap(self.sphere.center, self.radius2)
    }
}

/// Sphere against model.
#[derive(Debug, Clone, Default)]
pub struct SphereCollider {
    base: ColliderBase,
}

impl_collider_flags!(SphereCollider);

impl SphereCollider {
    pub fn new(flags: ColliderFlags) -> Self {
        Self {
            base: ColliderBase::new(flags),
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.flags)
    }

    /// Every flag combination is meaningful for spheres.
    pub fn validate_settings(&self) -> Option<&'static str> {
        None
    }

    /// Finds the triangles of `model` touched by `sphere`.
    ///
    /// `world_sphere` and `world_model` place the sphere and the model in the world; `None`
    /// means the sphere is already in model space. Results land in `cache`.
    pub fn collide<M: IMeshInterface>(
        &mut self,
        cache: &mut SphereCache,
        sphere: &Sphere,
        model: &CollisionModel<M>,
        world_sphere: Option<&Mat4>,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError> {
        let mesh = model.mesh();
        with_optimized_tree!(model.tree(), tree => {
            self.collide_tree(cache, sphere, tree, mesh, world_sphere, world_model)
        })
    }

    /// Same as [`SphereCollider::collide`], against one packed layout.
    pub fn collide_tree<N, M>(
        &mut self,
        cache: &mut SphereCache,
        sphere: &Sphere,
        tree: &OptimizedTree<N>,
        mesh: &M,
        world_sphere: Option<&Mat4>,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError>
    where
        N: CollisionNode,
        M: IMeshInterface + ?Sized,
    {
        check_settings(self.validate_settings())?;
        check_mesh(tree.nb_primitives(), mesh)?;
        self.base.begin_query();

        let local = sphere.transformed(&shape_to_model(world_sphere, world_model));
        if let Some(query_sphere) = self.init_query(cache, &local, tree.id(), mesh) {
            let query = SphereQuery {
                sphere: query_sphere,
                radius2: query_sphere.radius_squared(),
            };
            VolumeWalker::new(
                tree,
                mesh,
                &query,
                self.base.flags.first_contact,
                self.base.flags.primitive_tests,
                &mut self.base.stats,
                &mut cache.touched,
            )
            .walk();
            cache.tree = Some(tree.id());
        }
        self.base.contact = !cache.touched.is_empty();
        Ok(())
    }

    /// Decides whether the cache answers the query. Returns the sphere to walk the tree with,
    /// or `None` if the cached results stand.
    fn init_query<M: IMeshInterface + ?Sized>(
        &mut self,
        cache: &mut SphereCache,
        local: &Sphere,
        tree: TreeId,
        mesh: &M,
    ) -> Option<Sphere> {
        let flags = self.base.flags;
        if flags.temporal_coherence && cache.tree == Some(tree) {
            if flags.first_contact {
                let radius2 = local.radius_squared();
                if keep_single_contact(&mut cache.touched, mesh, &mut self.base.stats, |triangle| {
                    triangle.sphere_overlap(local.center, radius2)
                }) {
                    trace!("Sphere query kept its cached contact");
                    return None;
                }
            } else if cache.fat_sphere().contains_sphere(local) {
                trace!("Sphere query reused {} cached primitives", cache.touched.len());
                return None;
            }
        }

        cache.touched.clear();
        cache.tree = None;
        if flags.temporal_coherence && !flags.first_contact {
            // Walk with the fattened sphere so the results stay valid while the query moves
            // inside it.
            cache.center = local.center;
            cache.fat_radius2 = local.radius_squared() * cache.fat_coeff * cache.fat_coeff;
            trace!("Sphere cache refreshed");
            return Some(cache.fat_sphere());
        }
        Some(*local)
    }

    /// Coarse query against a source tree: reports the primitives of every leaf box the sphere
    /// touches, without triangle tests.
    pub fn collide_source_tree(&mut self, cache: &mut SphereCache, sphere: &Sphere, tree: &AabbTree) {
        self.base.begin_query();
        cache.invalidate();
        tree.get_sphere_overlaps(*sphere, &mut cache.touched);
        self.base.contact = !cache.touched.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collidables::mesh::{ModelSettings, TriangleMesh};

    /// Row of unit right triangles along x, one every two units.
    fn strip(count: u32) -> TriangleMesh {
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..count {
            let x = i as f32 * 2.0;
            vertices.extend([Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0), Vec3::new(x, 1.0, 0.0)]);
            triangles.push([i * 3, i * 3 + 1, i * 3 + 2]);
        }
        TriangleMesh::new(triangles, vertices)
    }

    fn sorted(cache: &SphereCache) -> Vec<u32> {
        let mut touched = cache.touched().to_vec();
        touched.sort_unstable();
        touched
    }

    #[test]
    fn sphere_finds_nearby_triangles() {
        let model = CollisionModel::build(strip(10), ModelSettings::default()).unwrap();
        let mut collider = SphereCollider::default();
        let mut cache = SphereCache::default();
        collider
            .collide(&mut cache, &Sphere::new(Vec3::new(3.6, 0.2, 0.0), 1.0), &model, None, None)
            .unwrap();
        assert_eq!(sorted(&cache), vec![1, 2]);
        assert!(collider.contact_status());
        assert!(collider.stats().bv_bv_tests > 0);

        let world = Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0));
        collider
            .collide(&mut cache, &Sphere::new(Vec3::new(3.6, 0.2, 0.0), 1.0), &model, None, Some(&world))
            .unwrap();
        assert!(cache.touched().is_empty());
        assert!(!collider.contact_status());
    }

    #[test]
    fn first_contact_stops_early() {
        let model = CollisionModel::build(strip(16), ModelSettings::default()).unwrap();
        let mut collider = SphereCollider::default();
        collider.set_first_contact(true);
        let mut cache = SphereCache::default();
        collider
            .collide(&mut cache, &Sphere::new(Vec3::new(15.0, 0.5, 0.0), 100.0), &model, None, None)
            .unwrap();
        assert_eq!(cache.touched().len(), 1);
    }

    #[test]
    fn single_contact_coherence_skips_the_walk() {
        let model = CollisionModel::build(strip(8), ModelSettings::default()).unwrap();
        let mut collider = SphereCollider::default();
        collider.set_first_contact(true);
        collider.set_temporal_coherence(true);
        let mut cache = SphereCache::default();
        let sphere = Sphere::new(Vec3::new(6.2, 0.2, 0.1), 0.5);
        collider.collide(&mut cache, &sphere, &model, None, None).unwrap();
        assert_eq!(cache.touched(), &[3]);

        let moved = Sphere::new(Vec3::new(6.3, 0.2, 0.1), 0.5);
        collider.collide(&mut cache, &moved, &model, None, None).unwrap();
        assert_eq!(cache.touched(), &[3]);
        assert_eq!(collider.stats().bv_bv_tests, 0);
        assert_eq!(collider.stats().bv_prim_tests, 1);
    }

    #[test]
    fn primitive_tests_off_reports_leaf_boxes() {
        let model = CollisionModel::build(strip(4), ModelSettings::default()).unwrap();
        let mut collider = SphereCollider::default();
        collider.set_primitive_tests(false);
        let mut cache = SphereCache::default();
        // Touches triangle 1's box corner region but not the triangle itself.
        let sphere = Sphere::new(Vec3::new(3.2, 1.2, 0.0), 0.4);
        collider.collide(&mut cache, &sphere, &model, None, None).unwrap();
        assert_eq!(cache.touched(), &[1]);
        collider.set_primitive_tests(true);
        collider.collide(&mut cache, &sphere, &model, None, None).unwrap();
        assert!(cache.touched().is_empty());
    }

    #[test]
    fn source_tree_query() {
        let mesh = strip(6);
        let tree = AabbTree::from_mesh(&mesh, Default::default()).unwrap();
        let mut collider = SphereCollider::default();
        let mut cache = SphereCache::default();
        collider.collide_source_tree(&mut cache, &Sphere::new(Vec3::new(0.5, 0.5, 0.0), 0.1), &tree);
        assert_eq!(cache.touched(), &[0]);
    }
}
