use crate::physics::collidables::mesh::IMeshInterface;
use crate::utilities::bounding_box::BoundingBox;
use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use super::tree::{AabbTree, BuildError, SourceNode, MAX_PRIMITIVES};

/// Controls how the source tree is subdivided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Subdivision stops once a node holds this many primitives or fewer. 1 builds the
    /// complete tree optimized trees are packed from.
    pub primitives_per_leaf: u32,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            primitives_per_leaf: 1,
        }
    }
}

struct BuildContext<'a> {
    boxes: &'a [BoundingBox],
    centers: Vec<Vec3>,
    primitives_per_leaf: u32,
}

impl AabbTree {
    /// Builds a tree over per-primitive boxes. Primitive `i` is `boxes[i]`.
    ///
    /// Nodes split on the axis of largest center variance at the mean center. A split that
    /// leaves one side empty falls back to a median split.
    pub fn build(boxes: &[BoundingBox], settings: BuildSettings) -> Result<Self, BuildError> {
        if boxes.is_empty() {
            return Err(BuildError::EmptySource);
        }
        if boxes.len() > MAX_PRIMITIVES {
            return Err(BuildError::TooManyPrimitives { count: boxes.len() });
        }
        if boxes.iter().any(|b| !b.is_finite() || b.is_empty()) {
            return Err(BuildError::DegenerateBounds);
        }

        let context = BuildContext {
            boxes,
            centers: boxes.iter().map(|b| b.center()).collect(),
            primitives_per_leaf: settings.primitives_per_leaf.max(1),
        };
        let mut tree = AabbTree {
            nodes: Vec::with_capacity(2 * boxes.len() - 1),
            primitives: (0..boxes.len() as u32).collect(),
        };
        tree.subdivide(&context, 0, boxes.len() as u32);
        debug!(
            "Built source tree: {} primitives, {} nodes ({} leaves), depth {}",
            tree.primitives.len(),
            tree.nodes.len(),
            tree.leaf_count(),
            tree.depth()
        );
        Ok(tree)
    }

    /// Builds a tree over the bounds of every triangle in a mesh.
    pub fn from_mesh<M: IMeshInterface + ?Sized>(
        mesh: &M,
        settings: BuildSettings,
    ) -> Result<Self, BuildError> {
        let boxes: Vec<BoundingBox> = (0..mesh.triangle_count())
            .map(|index| BoundingBox::from_points(&mesh.get_triangle(index)))
            .collect();
        Self::build(&boxes, settings)
    }

    fn subdivide(&mut self, context: &BuildContext, start: u32, count: u32) -> u32 {
        let range = start as usize..(start + count) as usize;
        let mut bounds = BoundingBox::EMPTY;
        for &primitive in &self.primitives[range.clone()] {
            bounds = BoundingBox::create_merged_boxes(bounds, context.boxes[primitive as usize]);
        }

        let node_index = self.nodes.len() as u32;
        self.nodes.push(SourceNode {
            bounds,
            start,
            count,
            children: None,
        });
        if count <= context.primitives_per_leaf {
            return node_index;
        }

        let positive_count = self.split(context, range);
        let positive = self.subdivide(context, start, positive_count);
        let negative = self.subdivide(context, start + positive_count, count - positive_count);
        self.nodes[node_index as usize].children = Some((positive, negative));
        node_index
    }

    /// Partitions the range in place and returns the size of the positive side.
    fn split(&mut self, context: &BuildContext, range: std::ops::Range<usize>) -> u32 {
        let slice = &mut self.primitives[range];
        let n = slice.len() as f32;

        let mut mean = Vec3::ZERO;
        for &primitive in slice.iter() {
            mean += context.centers[primitive as usize];
        }
        mean /= n;
        let mut variance = Vec3::ZERO;
        for &primitive in slice.iter() {
            let d = context.centers[primitive as usize] - mean;
            variance += d * d;
        }

        let axis = if variance.x >= variance.y && variance.x >= variance.z {
            0
        } else if variance.y >= variance.z {
            1
        } else {
            2
        };
        let split_value = mean[axis];

        let mut positive_count = 0;
        for i in 0..slice.len() {
            if context.centers[slice[i] as usize][axis] < split_value {
                slice.swap(i, positive_count);
                positive_count += 1;
            }
        }

        if positive_count == 0 || positive_count == slice.len() {
            // Every center sits on one side of the mean; split at the median instead.
            positive_count = slice.len() / 2;
            slice.select_nth_unstable_by(positive_count, |a, b| {
                context.centers[*a as usize][axis].total_cmp(&context.centers[*b as usize][axis])
            });
        }
        positive_count as u32
    }
}
