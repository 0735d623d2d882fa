use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;

use super::bounding_volume::{CollisionAabb, NodeVolume, QuantizedAabb};
use super::link::{Link, NodeLink};

/// What hangs below a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeContent {
    /// The node is a leaf wrapping one primitive.
    Primitive(u32),
    /// Positive and negative children. No-leaf nodes may link primitives directly.
    Children(Link, Link),
}

/// Packed node layout stored by an [`OptimizedTree`](super::optimized_tree::OptimizedTree).
pub trait CollisionNode: Copy + Debug + PartialEq + Serialize + DeserializeOwned {
    type Volume: NodeVolume;

    /// True for layouts without leaf nodes, which need `n - 1` nodes for `n` primitives
    /// instead of `2n - 1`.
    const NO_LEAF: bool;

    fn volume(&self) -> &Self::Volume;

    fn content(&self) -> NodeContent;

    /// Packs a node. Implicit layouts require `Children(Child(k), Child(k + 1))`.
    fn from_parts(volume: Self::Volume, content: NodeContent) -> Self;
}

/// Node whose children, if any, are stored next to each other.
///
/// A single link covers both cases: a primitive link makes the node a leaf, a child link
/// points at the positive child and the negative child follows it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: NodeVolume"))]
pub struct ImplicitNode<V> {
    pub volume: V,
    pub data: NodeLink,
}

impl<V: NodeVolume> ImplicitNode<V> {
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.data.is_primitive()
    }
}

impl<V: NodeVolume> CollisionNode for ImplicitNode<V> {
    type Volume = V;
    const NO_LEAF: bool = false;

    #[inline(always)]
    fn volume(&self) -> &V {
        &self.volume
    }

    #[inline(always)]
    fn content(&self) -> NodeContent {
        match self.data.decode() {
            Link::Primitive(index) => NodeContent::Primitive(index),
            Link::Child(index) => NodeContent::Children(Link::Child(index), Link::Child(index + 1)),
            Link::Empty => NodeContent::Children(Link::Empty, Link::Empty),
        }
    }

    #[inline(always)]
    fn from_parts(volume: V, content: NodeContent) -> Self {
        let data = match content {
            NodeContent::Primitive(index) => NodeLink::primitive(index),
            NodeContent::Children(positive, negative) => {
                debug_assert!(
                    matches!((positive, negative), (Link::Child(p), Link::Child(n)) if n == p + 1),
                    "Implicit nodes need contiguous children."
                );
                NodeLink::from(positive)
            }
        };
        Self { volume, data }
    }
}

/// Node with two independent links, either of which can name a primitive directly.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: NodeVolume"))]
pub struct NoLeafNode<V> {
    pub volume: V,
    pub positive: NodeLink,
    pub negative: NodeLink,
}

impl<V: NodeVolume> CollisionNode for NoLeafNode<V> {
    type Volume = V;
    const NO_LEAF: bool = true;

    #[inline(always)]
    fn volume(&self) -> &V {
        &self.volume
    }

    #[inline(always)]
    fn content(&self) -> NodeContent {
        NodeContent::Children(self.positive.decode(), self.negative.decode())
    }

    #[inline(always)]
    fn from_parts(volume: V, content: NodeContent) -> Self {
        let (positive, negative) = match content {
            // A lone primitive becomes the positive link of the single node.
            NodeContent::Primitive(index) => (NodeLink::primitive(index), NodeLink::EMPTY),
            NodeContent::Children(positive, negative) => (positive.into(), negative.into()),
        };
        Self {
            volume,
            positive,
            negative,
        }
    }
}

pub type AabbImplicitNode = ImplicitNode<CollisionAabb>;
pub type AabbNoLeafNode = NoLeafNode<CollisionAabb>;
pub type QuantizedImplicitNode = ImplicitNode<QuantizedAabb>;
pub type QuantizedNoLeafNode = NoLeafNode<QuantizedAabb>;
