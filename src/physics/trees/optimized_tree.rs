use crate::physics::collidables::mesh::ModelSettings;
use crate::utilities::for_each_ref::IBreakableForEach;
use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use super::bounding_volume::{CollisionAabb, Dequantization, NodeVolume};
use super::link::Link;
use super::node::{
    AabbImplicitNode, AabbNoLeafNode, CollisionNode, NodeContent, QuantizedImplicitNode,
    QuantizedNoLeafNode,
};
use super::tree::{AabbTree, BuildError, MAX_PRIMITIVES};

/// Identity of one built node array. Caches use it to notice that they are being reused
/// against a different tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TreeId(u64);

impl TreeId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TreeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Flat, immutable bounding volume tree packed from an [`AabbTree`].
///
/// Node 0 is the root. Once built, a tree is only read, so any number of colliders may query
/// it concurrently.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "N: Serialize", deserialize = "N: DeserializeOwned"))]
pub struct OptimizedTree<N> {
    nodes: Vec<N>,
    nb_primitives: u32,
    dequantization: Dequantization,
    #[serde(skip, default = "TreeId::next")]
    id: TreeId,
}

pub type AabbCollisionTree = OptimizedTree<AabbImplicitNode>;
pub type AabbNoLeafTree = OptimizedTree<AabbNoLeafNode>;
pub type AabbQuantizedTree = OptimizedTree<QuantizedImplicitNode>;
pub type AabbQuantizedNoLeafTree = OptimizedTree<QuantizedNoLeafNode>;

impl<N: CollisionNode> Default for OptimizedTree<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: CollisionNode> OptimizedTree<N> {
    /// Constructs an empty tree. Queries against it never report anything.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            nb_primitives: 0,
            dequantization: Dequantization::default(),
            id: TreeId::next(),
        }
    }

    /// Packs a complete source tree. On failure the tree is left empty.
    pub fn build(&mut self, source: &AabbTree) -> Result<(), BuildError> {
        self.nodes.clear();
        self.nb_primitives = 0;
        self.dequantization = Dequantization::default();
        self.id = TreeId::next();

        if source.is_empty() {
            return Err(BuildError::EmptySource);
        }
        if source.primitive_count() > MAX_PRIMITIVES {
            return Err(BuildError::TooManyPrimitives {
                count: source.primitive_count(),
            });
        }
        if let Some((node, primitives)) = source.first_incomplete_leaf() {
            return Err(BuildError::IncompleteTree { node, primitives });
        }
        if !source.bounds().is_finite() {
            return Err(BuildError::DegenerateBounds);
        }

        let mut flattener = Flattener {
            source,
            boxes: Vec::with_capacity(source.node_count()),
            contents: Vec::with_capacity(source.node_count()),
        };
        if N::NO_LEAF {
            flattener.flatten_no_leaf();
        } else {
            flattener.flatten_implicit();
        }

        let (volumes, dequantization) = N::Volume::encode_all(&flattener.boxes);
        self.nodes = volumes
            .into_iter()
            .zip(flattener.contents)
            .map(|(volume, content)| N::from_parts(volume, content))
            .collect();
        self.nb_primitives = source.primitive_count() as u32;
        self.dequantization = dequantization;
        debug!(
            "Built {}{} tree: {} primitives, {} nodes, {} bytes",
            if N::Volume::QUANTIZED { "quantized " } else { "" },
            if N::NO_LEAF { "no-leaf" } else { "implicit" },
            self.nb_primitives,
            self.nodes.len(),
            self.used_bytes()
        );
        Ok(())
    }

    #[inline(always)]
    pub fn id(&self) -> TreeId {
        self.id
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline(always)]
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    #[inline(always)]
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Bytes used by the node array.
    #[inline(always)]
    pub fn used_bytes(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<N>()
    }

    /// Number of primitives the tree references; indices run from 0 to this value.
    #[inline(always)]
    pub fn nb_primitives(&self) -> u32 {
        self.nb_primitives
    }

    #[inline(always)]
    pub fn dequantization(&self) -> &Dequantization {
        &self.dequantization
    }

    /// Replaces the node array with one produced elsewhere, such as a tree loaded from disk.
    ///
    /// Nothing is validated: the nodes must form a tree in this layout and reference only
    /// primitives below `nb_primitives`.
    pub fn set_nodes(&mut self, nodes: Vec<N>, nb_primitives: u32) {
        self.nodes = nodes;
        self.nb_primitives = nb_primitives;
        self.id = TreeId::next();
    }

    /// Installs the coefficients that decode quantized nodes loaded with `set_nodes`.
    pub fn set_dequantization(&mut self, dequantization: Dequantization) {
        self.dequantization = dequantization;
        self.id = TreeId::next();
    }

    #[inline(always)]
    pub fn root(&self) -> Link {
        if self.nodes.is_empty() {
            Link::Empty
        } else {
            Link::Child(0)
        }
    }

    #[inline(always)]
    pub fn node(&self, index: u32) -> &N {
        &self.nodes[index as usize]
    }

    /// Decoded bounding box of a node.
    #[inline(always)]
    pub fn node_bounds(&self, index: u32) -> CollisionAabb {
        self.nodes[index as usize]
            .volume()
            .decode(&self.dequantization)
    }

    /// Reports every primitive below a link. Returns false if the enumerator asked to stop.
    pub fn for_each_primitive<TEnumerator: IBreakableForEach<u32>>(
        &self,
        link: Link,
        enumerator: &mut TEnumerator,
    ) -> bool {
        match link {
            Link::Empty => true,
            Link::Primitive(primitive) => enumerator.loop_body(primitive),
            Link::Child(index) => match self.nodes[index as usize].content() {
                NodeContent::Primitive(primitive) => enumerator.loop_body(primitive),
                NodeContent::Children(positive, negative) => {
                    self.for_each_primitive(positive, enumerator)
                        && self.for_each_primitive(negative, enumerator)
                }
            },
        }
    }
}

struct Flattener<'a> {
    source: &'a AabbTree,
    boxes: Vec<CollisionAabb>,
    contents: Vec<NodeContent>,
}

impl<'a> Flattener<'a> {
    fn push(&mut self, source_index: u32) -> u32 {
        let node = &self.source.nodes()[source_index as usize];
        self.boxes.push(CollisionAabb::from_bounding_box(&node.bounds));
        self.contents.push(NodeContent::Children(Link::Empty, Link::Empty));
        (self.boxes.len() - 1) as u32
    }

    #[inline(always)]
    fn leaf_primitive(&self, source_index: u32) -> u32 {
        self.source.node_primitives(source_index)[0]
    }

    /// One node per source node, siblings stored next to each other, depth first with the
    /// positive child first.
    fn flatten_implicit(&mut self) {
        let root = self.push(0);
        self.emit_implicit(0, root);
    }

    fn emit_implicit(&mut self, source_index: u32, target: u32) {
        match self.source.nodes()[source_index as usize].children {
            None => {
                self.contents[target as usize] = NodeContent::Primitive(self.leaf_primitive(source_index));
            }
            Some((positive, negative)) => {
                let positive_target = self.push(positive);
                let negative_target = self.push(negative);
                self.contents[target as usize] =
                    NodeContent::Children(Link::Child(positive_target), Link::Child(negative_target));
                self.emit_implicit(positive, positive_target);
                self.emit_implicit(negative, negative_target);
            }
        }
    }

    /// One node per internal source node; leaves fold into their parent's links.
    fn flatten_no_leaf(&mut self) {
        if self.source.nodes()[0].is_leaf() {
            let root = self.push(0);
            self.contents[root as usize] = NodeContent::Primitive(self.leaf_primitive(0));
        } else {
            self.emit_no_leaf(0);
        }
    }

    fn emit_no_leaf(&mut self, source_index: u32) -> u32 {
        let target = self.push(source_index);
        if let Some((positive, negative)) = self.source.nodes()[source_index as usize].children {
            let positive_link = self.no_leaf_link(positive);
            let negative_link = self.no_leaf_link(negative);
            self.contents[target as usize] = NodeContent::Children(positive_link, negative_link);
        }
        target
    }

    fn no_leaf_link(&mut self, source_index: u32) -> Link {
        if self.source.nodes()[source_index as usize].is_leaf() {
            Link::Primitive(self.leaf_primitive(source_index))
        } else {
            Link::Child(self.emit_no_leaf(source_index))
        }
    }
}

/// Any of the four packed layouts, as stored by a collision model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AnyOptimizedTree {
    Collision(AabbCollisionTree),
    NoLeaf(AabbNoLeafTree),
    Quantized(AabbQuantizedTree),
    QuantizedNoLeaf(AabbQuantizedNoLeafTree),
}

impl Default for AnyOptimizedTree {
    fn default() -> Self {
        AnyOptimizedTree::Collision(AabbCollisionTree::new())
    }
}

impl AnyOptimizedTree {
    /// Packs a source tree in the layout `settings` asks for.
    pub fn build(source: &AabbTree, settings: &ModelSettings) -> Result<Self, BuildError> {
        Ok(match (settings.no_leaf, settings.quantized) {
            (false, false) => {
                let mut tree = AabbCollisionTree::new();
                tree.build(source)?;
                AnyOptimizedTree::Collision(tree)
            }
            (true, false) => {
                let mut tree = AabbNoLeafTree::new();
                tree.build(source)?;
                AnyOptimizedTree::NoLeaf(tree)
            }
            (false, true) => {
                let mut tree = AabbQuantizedTree::new();
                tree.build(source)?;
                AnyOptimizedTree::Quantized(tree)
            }
            (true, true) => {
                let mut tree = AabbQuantizedNoLeafTree::new();
                tree.build(source)?;
                AnyOptimizedTree::QuantizedNoLeaf(tree)
            }
        })
    }

    pub fn id(&self) -> TreeId {
        with_optimized_tree!(self, tree => tree.id())
    }

    pub fn nb_nodes(&self) -> usize {
        with_optimized_tree!(self, tree => tree.nb_nodes())
    }

    pub fn used_bytes(&self) -> usize {
        with_optimized_tree!(self, tree => tree.used_bytes())
    }

    pub fn nb_primitives(&self) -> u32 {
        with_optimized_tree!(self, tree => tree.nb_primitives())
    }

    pub fn is_quantized(&self) -> bool {
        matches!(
            self,
            AnyOptimizedTree::Quantized(_) | AnyOptimizedTree::QuantizedNoLeaf(_)
        )
    }

    pub fn is_no_leaf(&self) -> bool {
        matches!(
            self,
            AnyOptimizedTree::NoLeaf(_) | AnyOptimizedTree::QuantizedNoLeaf(_)
        )
    }
}
