use crate::utilities::bounding_box::BoundingBox;
use crate::physics::collidables::sphere::Sphere;
use crate::utilities::containment_type::ContainmentType;
use crate::utilities::for_each_ref::IBreakableForEach;

use super::tree::AabbTree;

impl AabbTree {
    /// Walks the tree, classifying each node box with `classify`. Disjoint nodes are skipped,
    /// contained nodes report their whole primitive range, everything else is descended.
    fn query_internal<TEnumerator, F>(&self, classify: F, leaf_enumerator: &mut TEnumerator)
    where
        TEnumerator: IBreakableForEach<u32>,
        F: Fn(&BoundingBox) -> ContainmentType,
    {
        if !self.nodes.is_empty() {
            self.query_node(0, &classify, leaf_enumerator);
        }
    }

    /// Returns false once the enumerator asked to stop.
    fn query_node<TEnumerator, F>(&self, node_index: u32, classify: &F, leaf_enumerator: &mut TEnumerator) -> bool
    where
        TEnumerator: IBreakableForEach<u32>,
        F: Fn(&BoundingBox) -> ContainmentType,
    {
        let node = &self.nodes[node_index as usize];
        match classify(&node.bounds) {
            ContainmentType::Disjoint => true,
            containment => match node.children {
                Some((positive, negative)) if containment != ContainmentType::Contains => {
                    self.query_node(positive, classify, leaf_enumerator)
                        && self.query_node(negative, classify, leaf_enumerator)
                }
                _ => self
                    .node_primitives(node_index)
                    .iter()
                    .all(|&primitive| leaf_enumerator.loop_body(primitive)),
            },
        }
    }

    /// Gets the primitives of every leaf whose bounding box overlaps the given bounding box.
    pub fn get_overlaps<TEnumerator: IBreakableForEach<u32>>(
        &self,
        bounding_box: BoundingBox,
        leaf_enumerator: &mut TEnumerator,
    ) {
        self.query_internal(|bounds| bounding_box.contains(bounds), leaf_enumerator);
    }

    /// Gets the primitives of every leaf whose bounding box overlaps the sphere.
    pub fn get_sphere_overlaps<TEnumerator: IBreakableForEach<u32>>(
        &self,
        sphere: Sphere,
        leaf_enumerator: &mut TEnumerator,
    ) {
        self.query_internal(
            |bounds| {
                if !bounds.intersects_sphere(&sphere) {
                    ContainmentType::Disjoint
                } else if sphere.contains_box(bounds.center(), bounds.extents()) {
                    ContainmentType::Contains
                } else {
                    ContainmentType::Intersects
                }
            },
            leaf_enumerator,
        );
    }
}
