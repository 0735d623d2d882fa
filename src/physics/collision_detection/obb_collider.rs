use crate::config::CollisionConfig;
use crate::physics::collidables::box_shape::Obb;
use crate::physics::collidables::mesh::{CollisionModel, IMeshInterface};
use crate::physics::collidables::triangle::Triangle;
use crate::physics::trees::bounding_volume::CollisionAabb;
use crate::physics::trees::node::CollisionNode;
use crate::physics::trees::optimized_tree::{OptimizedTree, TreeId};
use crate::utilities::sat::BoxFrame;
use glam::{Mat4, Vec3};
use log::trace;

use super::collider::{check_mesh, check_settings, shape_to_model, ColliderBase, ColliderError, ColliderFlags};
use super::volume_query::{keep_single_contact, IVolumeQuery, NodeTest, VolumeWalker};

pub const DEFAULT_OBB_FAT_COEFF: f32 = 3.0;

/// Results of the last oriented box query, and the fattened box (in model space) they are
/// valid for.
#[derive(Debug, Clone)]
pub struct ObbCache {
    touched: Vec<u32>,
    fat_box: Obb,
    pub fat_coeff: f32,
    tree: Option<TreeId>,
}

impl Default for ObbCache {
    fn default() -> Self {
        Self::new(DEFAULT_OBB_FAT_COEFF)
    }
}

impl ObbCache {
    pub fn new(fat_coeff: f32) -> Self {
        Self {
            touched: Vec::new(),
            fat_box: Obb::default(),
            fat_coeff,
            tree: None,
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.obb.fat_coeff)
    }

    #[inline(always)]
    pub fn touched(&self) -> &[u32] {
        &self.touched
    }

    pub fn invalidate(&mut self) {
        self.touched.clear();
        self.tree = None;
    }
}

/// The query box lives at the origin of its own frame; node boxes and triangles are brought
/// into it through `model_to_box`.
struct ObbQuery {
    extents: Vec3,
    model_to_box: BoxFrame,
    full_box_box_test: bool,
}

impl ObbQuery {
    fn new(obb: &Obb, full_box_box_test: bool) -> Self {
        Self {
            extents: obb.extents,
            model_to_box: BoxFrame::from_transform(&obb.box_to_parent().inverse()),
            full_box_box_test,
        }
    }

    #[inline(always)]
    fn overlaps_triangle(&self, triangle: &Triangle) -> bool {
        triangle
            .transformed_by_frame(&self.model_to_box)
            .aabb_overlap(Vec3::ZERO, self.extents, true)
    }
}

impl IVolumeQuery for ObbQuery {
    type State = ();

    #[inline(always)]
    fn root_state(&self) {}

    #[inline(always)]
    fn test_node(&self, bounds: &CollisionAabb, _: (), first_test: bool) -> NodeTest<()> {
        let frame = &self.model_to_box;
        if !frame.box_box_overlap(
            self.extents,
            Vec3::ZERO,
            bounds.extents,
            bounds.center,
            self.full_box_box_test || first_test,
        ) {
            NodeTest::Disjoint
        } else if frame.contains(self.extents, Vec3::ZERO, bounds.extents, bounds.center) {
            NodeTest::Contained
        } else {
            NodeTest::Overlap(())
        }
    }

    #[inline(always)]
    fn test_primitive(&self, triangle: &Triangle, _: ()) -> bool {
        self.overlaps_triangle(triangle)
    }
}

/// Oriented box against model.
#[derive(Debug, Clone)]
pub struct ObbCollider {
    base: ColliderBase,
    full_box_box_test: bool,
}

impl Default for ObbCollider {
    fn default() -> Self {
        Self::new(ColliderFlags::default())
    }
}

impl_collider_flags!(ObbCollider);

impl ObbCollider {
    pub fn new(flags: ColliderFlags) -> Self {
        Self {
            base: ColliderBase::new(flags),
            full_box_box_test: true,
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        let mut collider = Self::new(config.flags);
        collider.set_full_box_box_test(config.obb.full_box_box_test);
        collider
    }

    /// Test the nine edge cross axes on every node box, not just the first one.
    #[inline(always)]
    pub fn set_full_box_box_test(&mut self, full_box_box_test: bool) {
        self.full_box_box_test = full_box_box_test;
    }

    #[inline(always)]
    pub fn full_box_box_test(&self) -> bool {
        self.full_box_box_test
    }

    pub fn validate_settings(&self) -> Option<&'static str> {
        None
    }

    /// Finds the triangles of `model` touched by `obb`. `world_box` places the box's parent
    /// frame in the world.
    pub fn collide<M: IMeshInterface>(
        &mut self,
        cache: &mut ObbCache,
        obb: &Obb,
        model: &CollisionModel<M>,
        world_box: Option<&Mat4>,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError> {
        let mesh = model.mesh();
        with_optimized_tree!(model.tree(), tree => {
            self.collide_tree(cache, obb, tree, mesh, world_box, world_model)
        })
    }

    pub fn collide_tree<N, M>(
        &mut self,
        cache: &mut ObbCache,
        obb: &Obb,
        tree: &OptimizedTree<N>,
        mesh: &M,
        world_box: Option<&Mat4>,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError>
    where
        N: CollisionNode,
        M: IMeshInterface + ?Sized,
    {
        check_settings(self.validate_settings())?;
        check_mesh(tree.nb_primitives(), mesh)?;
        self.base.begin_query();

        let local = obb.transformed(&shape_to_model(world_box, world_model));
        if let Some(query_box) = self.init_query(cache, &local, tree.id(), mesh) {
            let query = ObbQuery::new(&query_box, self.full_box_box_test);
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

    fn init_query<M: IMeshInterface + ?Sized>(
        &mut self,
        cache: &mut ObbCache,
        local: &Obb,
        tree: TreeId,
        mesh: &M,
    ) -> Option<Obb> {
        let flags = self.base.flags;
        if flags.temporal_coherence && cache.tree == Some(tree) {
            if flags.first_contact {
                let query = ObbQuery::new(local, true);
                if keep_single_contact(&mut cache.touched, mesh, &mut self.base.stats, |triangle| {
                    query.overlaps_triangle(triangle)
                }) {
                    trace!("Oriented box query kept its cached contact");
                    return None;
                }
            } else if cache.fat_box.contains(local) {
                trace!("Oriented box query reused {} cached primitives", cache.touched.len());
                return None;
            }
        }

        cache.touched.clear();
        cache.tree = None;
        if flags.temporal_coherence && !flags.first_contact {
            cache.fat_box = Obb::new(local.center, local.extents * cache.fat_coeff, local.rotation);
            trace!("Oriented box cache refreshed");
            return Some(cache.fat_box);
        }
        Some(*local)
    }
}
