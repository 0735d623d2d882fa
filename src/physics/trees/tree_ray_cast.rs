use crate::utilities::for_each_ref::IBreakableForEach;
use glam::Vec3;

use super::tree::AabbTree;

/// Ray representation designed for quicker intersection against axis aligned bounding boxes.
#[derive(Clone, Copy, Debug)]
pub struct TreeRay {
    pub origin_over_direction: Vec3,
    pub maximum_t: f32,
    pub inverse_direction: Vec3,
}

impl TreeRay {
    #[inline(always)]
    pub fn new(origin: Vec3, direction: Vec3, maximum_t: f32) -> Self {
        // Near zero components are clamped to a tiny value; the resulting huge intervals
        // stand in for the infinite ones and the sign is put back in the numerator.
        let inverse_direction = Vec3::new(
            if direction.x < 0.0 { -1.0 } else { 1.0 },
            if direction.y < 0.0 { -1.0 } else { 1.0 },
            if direction.z < 0.0 { -1.0 } else { 1.0 },
        ) / Vec3::max(Vec3::splat(1e-15), Vec3::abs(direction));
        Self {
            origin_over_direction: origin * inverse_direction,
            maximum_t,
            inverse_direction,
        }
    }

    /// Slab test. Returns the entry distance if the ray reaches the box before `maximum_t`.
    #[inline(always)]
    pub fn intersects(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let t0 = min * self.inverse_direction - self.origin_over_direction;
        let t1 = max * self.inverse_direction - self.origin_over_direction;
        let t_exit = t0.max(t1);
        let t_entry = t0.min(t1);
        let earliest_exit = self.maximum_t.min(t_exit.x).min(t_exit.y).min(t_exit.z);
        let t = t_entry.x.max(0.0).max(t_entry.y).max(t_entry.z);
        if t <= earliest_exit {
            Some(t)
        } else {
            None
        }
    }
}

impl AabbTree {
    /// Reports the primitives of every leaf the ray reaches before `maximum_t`, nearest leaf
    /// box first. No triangle tests are run.
    pub fn ray_cast<TEnumerator: IBreakableForEach<u32>>(
        &self,
        origin: Vec3,
        direction: Vec3,
        maximum_t: f32,
        leaf_enumerator: &mut TEnumerator,
    ) {
        if self.nodes.is_empty() {
            return;
        }
        let tree_ray = TreeRay::new(origin, direction, maximum_t);
        let root = &self.nodes[0];
        if tree_ray.intersects(root.bounds.min, root.bounds.max).is_some() {
            self.ray_cast_node(0, &tree_ray, leaf_enumerator);
        }
    }

    /// Visits a node the ray is known to reach. Returns false once the enumerator asked to stop.
    fn ray_cast_node<TEnumerator: IBreakableForEach<u32>>(
        &self,
        node_index: u32,
        tree_ray: &TreeRay,
        leaf_enumerator: &mut TEnumerator,
    ) -> bool {
        let (a, b) = match self.nodes[node_index as usize].children {
            None => {
                return self
                    .node_primitives(node_index)
                    .iter()
                    .all(|&primitive| leaf_enumerator.loop_body(primitive));
            }
            Some(children) => children,
        };
        let node_a = &self.nodes[a as usize];
        let node_b = &self.nodes[b as usize];
        let t_a = tree_ray.intersects(node_a.bounds.min, node_a.bounds.max);
        let t_b = tree_ray.intersects(node_b.bounds.min, node_b.bounds.max);
        match (t_a, t_b) {
            // Visit the earlier intersection first.
            (Some(t_a), Some(t_b)) => {
                let (first, second) = if t_a < t_b { (a, b) } else { (b, a) };
                self.ray_cast_node(first, tree_ray, leaf_enumerator)
                    && self.ray_cast_node(second, tree_ray, leaf_enumerator)
            }
            (Some(_), None) => self.ray_cast_node(a, tree_ray, leaf_enumerator),
            (None, Some(_)) => self.ray_cast_node(b, tree_ray, leaf_enumerator),
            (None, None) => true,
        }
    }
}
