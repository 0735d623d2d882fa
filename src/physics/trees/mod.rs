pub mod bounding_volume;
pub mod link;
pub mod node;
pub mod optimized_tree;
pub mod quantization;
pub mod tree;
pub mod tree_builder;
pub mod tree_ray_cast;
pub mod tree_volume_query;

pub use self::bounding_volume::{CollisionAabb, Dequantization, NodeVolume, QuantizedAabb};
pub use self::link::{Link, NodeLink};
pub use self::node::{CollisionNode, ImplicitNode, NoLeafNode, NodeContent};
pub use self::optimized_tree::{
    AabbCollisionTree, AabbNoLeafTree, AabbQuantizedNoLeafTree, AabbQuantizedTree,
    AnyOptimizedTree, OptimizedTree, TreeId,
};
pub use self::tree::{AabbTree, BuildError, SourceNode};
pub use self::tree_builder::BuildSettings;
