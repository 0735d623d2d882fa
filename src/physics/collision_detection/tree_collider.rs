use crate::config::CollisionConfig;
use crate::physics::collidables::mesh::{CollisionModel, IMeshInterface};
use crate::physics::trees::link::Link;
use crate::physics::trees::node::{CollisionNode, NodeContent};
use crate::physics::trees::optimized_tree::{OptimizedTree, TreeId};
use crate::utilities::sat::BoxFrame;
use glam::Mat4;
use log::trace;

use super::collider::{check_mesh, check_settings, shape_to_model, ColliderBase, ColliderError, ColliderFlags, QueryStats};

/// Colliding triangle pairs of the last query, as (index in model 0, index in model 1).
#[derive(Debug, Clone, Default)]
pub struct TreeCache {
    pairs: Vec<(u32, u32)>,
    trees: Option<(TreeId, TreeId)>,
    /// Append each query's pairs to the previous ones instead of replacing them. Pairs are not
    /// deduplicated and temporal coherence is skipped while this is set.
    pub accumulate: bool,
}

impl TreeCache {
    pub fn from_config(config: &CollisionConfig) -> Self {
        Self {
            accumulate: config.tree.accumulate_pairs,
            ..Self::default()
        }
    }

    #[inline(always)]
    pub fn pairs(&self) -> &[(u32, u32)] {
        &self.pairs
    }

    pub fn invalidate(&mut self) {
        self.pairs.clear();
        self.trees = None;
    }
}

/// Lock step walk of two trees. Everything is tested in model 0's frame except triangles of
/// model 0 against boxes of model 1, which are tested in model 1's frame.
struct DualWalker<'a, N0, N1, M0: ?Sized, M1: ?Sized> {
    tree0: &'a OptimizedTree<N0>,
    mesh0: &'a M0,
    tree1: &'a OptimizedTree<N1>,
    mesh1: &'a M1,
    /// Model 1 placed in model 0.
    one_in_zero: &'a BoxFrame,
    /// Model 0 placed in model 1.
    zero_in_one: &'a BoxFrame,
    full_box_box_test: bool,
    full_prim_box_test: bool,
    first_contact: bool,
    stats: &'a mut QueryStats,
    pairs: &'a mut Vec<(u32, u32)>,
    done: bool,
}

impl<'a, N0, N1, M0, M1> DualWalker<'a, N0, N1, M0, M1>
where
    N0: CollisionNode,
    N1: CollisionNode,
    M0: IMeshInterface + ?Sized,
    M1: IMeshInterface + ?Sized,
{
    fn collide(&mut self, link0: Link, link1: Link) {
        if self.done {
            return;
        }
        match (link0, link1) {
            (Link::Empty, _) | (_, Link::Empty) => {}
            (Link::Primitive(a), Link::Primitive(b)) => self.primitive_pair(a, b),
            (Link::Primitive(a), Link::Child(j)) => self.primitive_node(a, j),
            (Link::Child(i), Link::Primitive(b)) => self.node_primitive(i, b),
            (Link::Child(i), Link::Child(j)) => self.node_pair(i, j),
        }
    }

    fn node_pair(&mut self, i: u32, j: u32) {
        self.stats.bv_bv_tests += 1;
        let first_test = self.stats.bv_bv_tests == 1;
        let box0 = self.tree0.node_bounds(i);
        let box1 = self.tree1.node_bounds(j);
        if !self.one_in_zero.box_box_overlap(
            box0.extents,
            box0.center,
            box1.extents,
            box1.center,
            self.full_box_box_test || first_test,
        ) {
            return;
        }
        match (self.tree0.node(i).content(), self.tree1.node(j).content()) {
            (NodeContent::Primitive(a), NodeContent::Primitive(b)) => self.primitive_pair(a, b),
            (NodeContent::Primitive(_), NodeContent::Children(positive, negative)) => {
                self.collide(Link::Child(i), positive);
                self.collide(Link::Child(i), negative);
            }
            (NodeContent::Children(positive, negative), NodeContent::Primitive(_)) => {
                self.collide(positive, Link::Child(j));
                self.collide(negative, Link::Child(j));
            }
            (NodeContent::Children(positive0, negative0), NodeContent::Children(positive1, negative1)) => {
                // Descend the bigger box.
                if box0.size() > box1.size() {
                    self.collide(positive0, Link::Child(j));
                    self.collide(negative0, Link::Child(j));
                } else {
                    self.collide(Link::Child(i), positive1);
                    self.collide(Link::Child(i), negative1);
                }
            }
        }
    }

    /// Triangle `a` of model 0 against node `j` of model 1.
    fn primitive_node(&mut self, a: u32, j: u32) {
        self.stats.bv_prim_tests += 1;
        let bounds = self.tree1.node_bounds(j);
        let triangle = self.mesh0.triangle(a).transformed_by_frame(self.zero_in_one);
        if !triangle.aabb_overlap(bounds.center, bounds.extents, self.full_prim_box_test) {
            return;
        }
        match self.tree1.node(j).content() {
            NodeContent::Primitive(b) => self.primitive_pair(a, b),
            NodeContent::Children(positive, negative) => {
                self.collide(Link::Primitive(a), positive);
                self.collide(Link::Primitive(a), negative);
            }
        }
    }

    /// Node `i` of model 0 against triangle `b` of model 1.
    fn node_primitive(&mut self, i: u32, b: u32) {
        self.stats.bv_prim_tests += 1;
        let bounds = self.tree0.node_bounds(i);
        let triangle = self.mesh1.triangle(b).transformed_by_frame(self.one_in_zero);
        if !triangle.aabb_overlap(bounds.center, bounds.extents, self.full_prim_box_test) {
            return;
        }
        match self.tree0.node(i).content() {
            NodeContent::Primitive(a) => self.primitive_pair(a, b),
            NodeContent::Children(positive, negative) => {
                self.collide(positive, Link::Primitive(b));
                self.collide(negative, Link::Primitive(b));
            }
        }
    }

    fn primitive_pair(&mut self, a: u32, b: u32) {
        if triangles_overlap(self.mesh0, self.mesh1, self.one_in_zero, self.stats, a, b) {
            self.pairs.push((a, b));
            self.done = self.first_contact;
        }
    }
}

#[inline(always)]
fn triangles_overlap<M0, M1>(
    mesh0: &M0,
    mesh1: &M1,
    one_in_zero: &BoxFrame,
    stats: &mut QueryStats,
    a: u32,
    b: u32,
) -> bool
where
    M0: IMeshInterface + ?Sized,
    M1: IMeshInterface + ?Sized,
{
    stats.prim_prim_tests += 1;
    let triangle1 = mesh1.triangle(b).transformed_by_frame(one_in_zero);
    mesh0.triangle(a).triangle_overlap(&triangle1)
}

/// Model against model.
#[derive(Debug, Clone)]
pub struct TreeCollider {
    base: ColliderBase,
    full_box_box_test: bool,
    full_prim_box_test: bool,
}

impl Default for TreeCollider {
    fn default() -> Self {
        Self::new(ColliderFlags::default())
    }
}

impl_collider_flags!(TreeCollider);

impl TreeCollider {
    pub fn new(flags: ColliderFlags) -> Self {
        Self {
            base: ColliderBase::new(flags),
            full_box_box_test: true,
            full_prim_box_test: true,
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        let mut collider = Self::new(config.flags);
        collider.set_full_box_box_test(config.tree.full_box_box_test);
        collider.set_full_prim_box_test(config.tree.full_prim_box_test);
        collider
    }

    #[inline(always)]
    pub fn set_full_box_box_test(&mut self, full_box_box_test: bool) {
        self.full_box_box_test = full_box_box_test;
    }

    /// Test the edge cross axes when a triangle meets a node box.
    #[inline(always)]
    pub fn set_full_prim_box_test(&mut self, full_prim_box_test: bool) {
        self.full_prim_box_test = full_prim_box_test;
    }

    #[inline(always)]
    pub fn full_box_box_test(&self) -> bool {
        self.full_box_box_test
    }

    #[inline(always)]
    pub fn full_prim_box_test(&self) -> bool {
        self.full_prim_box_test
    }

    pub fn validate_settings(&self) -> Option<&'static str> {
        self.base.validate_exact()
    }

    /// Finds the overlapping triangle pairs of two models.
    ///
    /// Pairs are not deduplicated: colliding A with B and then B with A reports every pair
    /// twice, mirrored.
    pub fn collide<M0: IMeshInterface, M1: IMeshInterface>(
        &mut self,
        cache: &mut TreeCache,
        model0: &CollisionModel<M0>,
        model1: &CollisionModel<M1>,
        world0: Option<&Mat4>,
        world1: Option<&Mat4>,
    ) -> Result<(), ColliderError> {
        let mesh0 = model0.mesh();
        let mesh1 = model1.mesh();
        with_optimized_tree!(model0.tree(), tree0 => {
            with_optimized_tree!(model1.tree(), tree1 => {
                self.collide_trees(cache, tree0, mesh0, tree1, mesh1, world0, world1)
            })
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn collide_trees<N0, N1, M0, M1>(
        &mut self,
        cache: &mut TreeCache,
        tree0: &OptimizedTree<N0>,
        mesh0: &M0,
        tree1: &OptimizedTree<N1>,
        mesh1: &M1,
        world0: Option<&Mat4>,
        world1: Option<&Mat4>,
    ) -> Result<(), ColliderError>
    where
        N0: CollisionNode,
        N1: CollisionNode,
        M0: IMeshInterface + ?Sized,
        M1: IMeshInterface + ?Sized,
    {
        check_settings(self.validate_settings())?;
        check_mesh(tree0.nb_primitives(), mesh0)?;
        check_mesh(tree1.nb_primitives(), mesh1)?;
        self.base.begin_query();

        // The relative placement doesn't depend on where the walk is, so both frames are
        // computed once.
        let one_to_zero = shape_to_model(world1, world0);
        let one_in_zero = BoxFrame::from_transform(&one_to_zero);
        let zero_in_one = BoxFrame::from_transform(&one_to_zero.inverse());
        let trees = (tree0.id(), tree1.id());

        // A single persisting contact is kept without looking for new ones.
        if self.base.flags.temporal_coherence && !cache.accumulate && cache.trees == Some(trees) {
            if let [(a, b)] = cache.pairs[..] {
                if triangles_overlap(mesh0, mesh1, &one_in_zero, &mut self.base.stats, a, b) {
                    trace!("Tree query kept its cached pair ({}, {})", a, b);
                    self.base.contact = true;
                    return Ok(());
                }
            }
        }

        if !cache.accumulate {
            cache.pairs.clear();
        }
        let before = cache.pairs.len();
        let mut walker = DualWalker {
            tree0,
            mesh0,
            tree1,
            mesh1,
            one_in_zero: &one_in_zero,
            zero_in_one: &zero_in_one,
            full_box_box_test: self.full_box_box_test,
            full_prim_box_test: self.full_prim_box_test,
            first_contact: self.base.flags.first_contact,
            stats: &mut self.base.stats,
            pairs: &mut cache.pairs,
            done: false,
        };
        walker.collide(tree0.root(), tree1.root());
        cache.trees = Some(trees);
        self.base.contact = cache.pairs.len() > before;
        Ok(())
    }
}
