use serde::{Deserialize, Serialize};
use std::debug_assert;

/// Decoded form of a [`NodeLink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Link {
    /// Index of a node in the owning tree's node array.
    Child(u32),
    /// Index of a primitive in the mesh.
    Primitive(u32),
    Empty,
}

/// Tagged reference from a node to a child node or to a primitive.
///
/// The low bit tells the two apart: set for a primitive (index = `packed >> 1`), clear for a
/// child node (index = `packed >> 1`). All bits set marks an empty slot.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeLink {
    packed: u32,
}

impl Default for NodeLink {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl NodeLink {
    pub const EMPTY: Self = Self { packed: u32::MAX };

    /// Largest index either kind of link can carry.
    pub const MAX_INDEX: u32 = 0x7FFF_FFFE;

    #[inline(always)]
    pub fn child(node_index: u32) -> Self {
        debug_assert!(node_index <= Self::MAX_INDEX, "Node index doesn't fit a link.");
        Self {
            packed: node_index << 1,
        }
    }

    #[inline(always)]
    pub fn primitive(primitive_index: u32) -> Self {
        debug_assert!(
            primitive_index <= Self::MAX_INDEX,
            "Primitive index doesn't fit a link."
        );
        Self {
            packed: (primitive_index << 1) | 1,
        }
    }

    #[inline(always)]
    pub fn is_primitive(&self) -> bool {
        self.packed != u32::MAX && self.packed & 1 == 1
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.packed == u32::MAX
    }

    /// Raw packed value.
    #[inline(always)]
    pub fn packed(&self) -> u32 {
        self.packed
    }

    #[inline(always)]
    pub fn decode(&self) -> Link {
        if self.packed == u32::MAX {
            Link::Empty
        } else if self.packed & 1 == 1 {
            Link::Primitive(self.packed >> 1)
        } else {
            Link::Child(self.packed >> 1)
        }
    }
}

impl From<Link> for NodeLink {
    #[inline(always)]
    fn from(link: Link) -> Self {
        match link {
            Link::Child(index) => Self::child(index),
            Link::Primitive(index) => Self::primitive(index),
            Link::Empty => Self::EMPTY,
        }
    }
}
