use crate::utilities::bounding_box::BoundingBox;
use serde::{Deserialize, Serialize};

/// Errors raised while building a source tree or packing it into an optimized tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Source tree has no primitives")]
    EmptySource,
    #[error("Source node {node} holds {primitives} primitives; optimized trees need one per leaf")]
    IncompleteTree { node: u32, primitives: u32 },
    #[error("{count} primitives exceed the tagged link index range")]
    TooManyPrimitives { count: usize },
    #[error("Primitive bounds are not finite")]
    DegenerateBounds,
}

/// Node of the source tree.
///
/// Every node covers the contiguous range `start..start + count` of the tree's primitive
/// permutation, so a whole subtree can be listed without walking it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    pub bounds: BoundingBox,
    pub start: u32,
    pub count: u32,
    /// Positive and negative children, `None` for leaves.
    pub children: Option<(u32, u32)>,
}

impl SourceNode {
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Generic binary bounding volume tree over primitive boxes.
///
/// This is the mutable build-time representation; optimized trees are packed from it and it
/// can be dropped afterwards. It also answers coarse queries directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AabbTree {
    /// Nodes in depth first order, root first.
    pub(crate) nodes: Vec<SourceNode>,
    /// Primitive indices, permuted so that each node's range is contiguous.
    pub(crate) primitives: Vec<u32>,
}

/// Maximum number of primitives a tree can index.
pub const MAX_PRIMITIVES: usize = 1 << 30;

impl AabbTree {
    /// Constructs an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline(always)]
    pub fn nodes(&self) -> &[SourceNode] {
        &self.nodes
    }

    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Bounds of the whole tree, `BoundingBox::EMPTY` for an empty tree.
    #[inline(always)]
    pub fn bounds(&self) -> BoundingBox {
        self.nodes
            .first()
            .map_or(BoundingBox::EMPTY, |root| root.bounds)
    }

    /// Primitives below a node.
    #[inline(always)]
    pub fn node_primitives(&self, node_index: u32) -> &[u32] {
        let node = &self.nodes[node_index as usize];
        &self.primitives[node.start as usize..(node.start + node.count) as usize]
    }

    /// Index and primitive count of the first leaf holding more than one primitive. Optimized
    /// trees require there to be none.
    pub fn first_incomplete_leaf(&self) -> Option<(u32, u32)> {
        self.nodes
            .iter()
            .enumerate()
            .find(|(_, node)| node.is_leaf() && node.count != 1)
            .map(|(index, node)| (index as u32, node.count))
    }

    /// Gets the number of leaf nodes.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Maximum depth, 1 for a single node tree.
    pub fn depth(&self) -> u32 {
        fn depth_of(tree: &AabbTree, index: u32) -> u32 {
            match tree.nodes[index as usize].children {
                None => 1,
                Some((positive, negative)) => {
                    1 + depth_of(tree, positive).max(depth_of(tree, negative))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            depth_of(self, 0)
        }
    }
}
