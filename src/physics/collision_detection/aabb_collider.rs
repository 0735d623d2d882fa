use crate::config::CollisionConfig;
use crate::physics::collidables::mesh::{CollisionModel, IMeshInterface};
use crate::physics::collidables::triangle::Triangle;
use crate::physics::trees::bounding_volume::CollisionAabb;
use crate::physics::trees::node::CollisionNode;
use crate::physics::trees::optimized_tree::{OptimizedTree, TreeId};
use crate::physics::trees::tree::AabbTree;
use crate::utilities::sat::aabb_aabb_overlap;
use log::trace;

use super::collider::{check_mesh, check_settings, ColliderBase, ColliderError, ColliderFlags};
use super::volume_query::{keep_single_contact, IVolumeQuery, NodeTest, VolumeWalker};

pub const DEFAULT_AABB_FAT_COEFF: f32 = 1.1;

/// Results of the last box query, and the fattened box they are valid for.
#[derive(Debug, Clone)]
pub struct AabbCache {
    touched: Vec<u32>,
    fat_box: CollisionAabb,
    /// Scale applied to the extents when the cache is refreshed.
    pub fat_coeff: f32,
    tree: Option<TreeId>,
}

impl Default for AabbCache {
    fn default() -> Self {
        Self::new(DEFAULT_AABB_FAT_COEFF)
    }
}

impl AabbCache {
    pub fn new(fat_coeff: f32) -> Self {
        Self {
            touched: Vec::new(),
            fat_box: CollisionAabb::default(),
            fat_coeff,
            tree: None,
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.aabb.fat_coeff)
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

struct AabbQuery {
    bounds: CollisionAabb,
}

impl IVolumeQuery for AabbQuery {
    type State = ();

    #[inline(always)]
    fn root_state(&self) {}

    #[inline(always)]
    fn test_node(&self, bounds: &CollisionAabb, _: (), _: bool) -> NodeTest<()> {
        if !aabb_aabb_overlap(self.bounds.center, self.bounds.extents, bounds.center, bounds.extents) {
            NodeTest::Disjoint
        } else if self.bounds.contains(bounds) {
            NodeTest::Contained
        } else {
            NodeTest::Overlap(())
        }
    }

    #[inline(always)]
    fn test_primitive(&self, triangle: &Triangle, _: ()) -> bool {
        triangle.aabb_overlap(self.bounds.center, self.bounds.extents, true)
    }
}

/// Axis aligned box against model. The box is given in model space.
#[derive(Debug, Clone, Default)]
pub struct AabbCollider {
    base: ColliderBase,
}

impl_collider_flags!(AabbCollider);

impl AabbCollider {
    pub fn new(flags: ColliderFlags) -> Self {
        Self {
            base: ColliderBase::new(flags),
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.flags)
    }

    pub fn validate_settings(&self) -> Option<&'static str> {
        None
    }

    pub fn collide<M: IMeshInterface>(
        &mut self,
        cache: &mut AabbCache,
        bounds: &CollisionAabb,
        model: &CollisionModel<M>,
    ) -> Result<(), ColliderError> {
        let mesh = model.mesh();
        with_optimized_tree!(model.tree(), tree => self.collide_tree(cache, bounds, tree, mesh))
    }

    pub fn collide_tree<N, M>(
        &mut self,
        cache: &mut AabbCache,
        bounds: &CollisionAabb,
        tree: &OptimizedTree<N>,
        mesh: &M,
    ) -> Result<(), ColliderError>
    where
        N: CollisionNode,
        M: IMeshInterface + ?Sized,
    {
        check_settings(self.validate_settings())?;
        check_mesh(tree.nb_primitives(), mesh)?;
        self.base.begin_query();

        if let Some(query_box) = self.init_query(cache, bounds, tree.id(), mesh) {
            let query = AabbQuery { bounds: query_box };
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
        cache: &mut AabbCache,
        bounds: &CollisionAabb,
        tree: TreeId,
        mesh: &M,
    ) -> Option<CollisionAabb> {
        let flags = self.base.flags;
        if flags.temporal_coherence && cache.tree == Some(tree) {
            if flags.first_contact {
                if keep_single_contact(&mut cache.touched, mesh, &mut self.base.stats, |triangle| {
                    triangle.aabb_overlap(bounds.center, bounds.extents, true)
                }) {
                    trace!("Box query kept its cached contact");
                    return None;
                }
            } else if cache.fat_box.contains(bounds) {
                trace!("Box query reused {} cached primitives", cache.touched.len());
                return None;
            }
        }

        cache.touched.clear();
        cache.tree = None;
        if flags.temporal_coherence && !flags.first_contact {
            cache.fat_box = CollisionAabb::new(bounds.center, bounds.extents * cache.fat_coeff);
            trace!("Box cache refreshed");
            return Some(cache.fat_box);
        }
        Some(*bounds)
    }

    /// Coarse query against a source tree: reports the primitives of every leaf box that
    /// overlaps, without triangle tests.
    pub fn collide_source_tree(&mut self, cache: &mut AabbCache, bounds: &CollisionAabb, tree: &AabbTree) {
        self.base.begin_query();
        cache.invalidate();
        tree.get_overlaps(bounds.to_bounding_box(), &mut cache.touched);
        self.base.contact = !cache.touched.is_empty();
    }
}
