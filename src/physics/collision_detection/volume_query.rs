use crate::physics::collidables::mesh::IMeshInterface;
use crate::physics::collidables::triangle::Triangle;
use crate::physics::trees::bounding_volume::CollisionAabb;
use crate::physics::trees::link::Link;
use crate::physics::trees::node::{CollisionNode, NodeContent};
use crate::physics::trees::optimized_tree::OptimizedTree;
use crate::utilities::for_each_ref::BreakableClosure;

use super::collider::QueryStats;

/// First contact coherence: re-tests the single primitive a previous first contact query
/// reported. Returns true if it still overlaps, in which case the walk can be skipped;
/// otherwise the list is cleared.
pub(crate) fn keep_single_contact<M, F>(
    touched: &mut Vec<u32>,
    mesh: &M,
    stats: &mut QueryStats,
    test: F,
) -> bool
where
    M: IMeshInterface + ?Sized,
    F: Fn(&Triangle) -> bool,
{
    if let [primitive] = touched[..] {
        stats.bv_prim_tests += 1;
        if test(&mesh.triangle(primitive)) {
            return true;
        }
    }
    touched.clear();
    false
}

/// Outcome of testing a node box against a query volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeTest<S> {
    Disjoint,
    /// The box lies entirely inside the volume; everything below it is reported untested.
    Contained,
    /// Keep descending, handing `S` to the children.
    Overlap(S),
}

/// A query volume in model space, as seen by [`VolumeWalker`].
pub(crate) trait IVolumeQuery {
    /// Narrowing state passed from a node to its children, such as a plane clip mask.
    type State: Copy;

    fn root_state(&self) -> Self::State;

    /// `first_test` is set for the first node box of the query.
    fn test_node(&self, bounds: &CollisionAabb, state: Self::State, first_test: bool) -> NodeTest<Self::State>;

    fn test_primitive(&self, triangle: &Triangle, state: Self::State) -> bool;
}

/// Depth first walk of a packed tree against one query volume, shared by the sphere, box and
/// planes colliders.
pub(crate) struct VolumeWalker<'a, N, M: ?Sized, Q> {
    pub tree: &'a OptimizedTree<N>,
    pub mesh: &'a M,
    pub query: &'a Q,
    pub first_contact: bool,
    pub primitive_tests: bool,
    pub stats: &'a mut QueryStats,
    pub touched: &'a mut Vec<u32>,
    done: bool,
}

impl<'a, N, M, Q> VolumeWalker<'a, N, M, Q>
where
    N: CollisionNode,
    M: IMeshInterface + ?Sized,
    Q: IVolumeQuery,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tree: &'a OptimizedTree<N>,
        mesh: &'a M,
        query: &'a Q,
        first_contact: bool,
        primitive_tests: bool,
        stats: &'a mut QueryStats,
        touched: &'a mut Vec<u32>,
    ) -> Self {
        Self {
            tree,
            mesh,
            query,
            first_contact,
            primitive_tests,
            stats,
            touched,
            done: false,
        }
    }

    /// Appends every touched primitive to `touched`.
    pub fn walk(&mut self) {
        let state = self.query.root_state();
        self.visit(self.tree.root(), state);
    }

    fn visit(&mut self, link: Link, state: Q::State) {
        if self.done {
            return;
        }
        match link {
            Link::Empty => {}
            Link::Primitive(primitive) => self.primitive(primitive, state),
            Link::Child(index) => {
                self.stats.bv_bv_tests += 1;
                let first_test = self.stats.bv_bv_tests == 1;
                let bounds = self.tree.node_bounds(index);
                match self.query.test_node(&bounds, state, first_test) {
                    NodeTest::Disjoint => {}
                    NodeTest::Contained => self.dump(link),
                    NodeTest::Overlap(state) => match self.tree.node(index).content() {
                        NodeContent::Primitive(primitive) => self.primitive(primitive, state),
                        NodeContent::Children(positive, negative) => {
                            self.visit(positive, state);
                            self.visit(negative, state);
                        }
                    },
                }
            }
        }
    }

    fn primitive(&mut self, primitive: u32, state: Q::State) {
        if self.primitive_tests {
            self.stats.bv_prim_tests += 1;
            let triangle = self.mesh.triangle(primitive);
            if !self.query.test_primitive(&triangle, state) {
                return;
            }
        }
        self.touched.push(primitive);
        self.done = self.first_contact;
    }

    fn dump(&mut self, link: Link) {
        let first_contact = self.first_contact;
        let touched = &mut *self.touched;
        let tree = self.tree;
        let before = touched.len();
        tree.for_each_primitive(
            link,
            &mut BreakableClosure(|primitive: u32| {
                touched.push(primitive);
                !first_contact
            }),
        );
        self.done = first_contact && touched.len() > before;
    }
}
