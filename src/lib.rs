//! Bounding volume trees over triangle meshes, and the colliders that query them.
//!
//! A [`CollisionModel`] pairs a mesh with one of four packed tree layouts. Colliders take a
//! query shape, an optional pair of world transforms and a caller-owned cache, and report the
//! touched triangles (or triangle pairs, for tree against tree).

#[macro_use]
mod private_macros;

pub mod config;
pub mod physics;
pub mod utilities;

pub use crate::config::{CollisionConfig, Config, ConfigError};
pub use crate::physics::collidables::{
    CallbackMesh, CollisionModel, IMeshInterface, IndexedMesh, ModelSettings, Obb, Ray, Segment,
    Sphere, Triangle, TriangleMesh,
};
pub use crate::physics::collision_detection::{
    cast_rays_parallel, AabbCache, AabbCollider, ColliderError, ColliderFlags, CollisionFace, CollisionFaces,
    ObbCache, ObbCollider, PlanesCache, PlanesCollider, QueryStats, RayCache, RayCollider,
    SphereCache, SphereCollider, TreeCache, TreeCollider,
};
pub use crate::physics::trees::{
    AabbCollisionTree, AabbNoLeafTree, AabbQuantizedNoLeafTree, AabbQuantizedTree, AabbTree,
    AnyOptimizedTree, BuildError, BuildSettings, CollisionAabb, OptimizedTree,
};
