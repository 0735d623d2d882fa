pub mod aabb_collider;
pub mod collider;
pub mod obb_collider;
pub mod planes_collider;
pub mod ray_batch;
pub mod ray_collider;
pub mod sphere_collider;
pub mod tree_collider;
mod volume_query;

pub use self::aabb_collider::{AabbCache, AabbCollider};
pub use self::collider::{ColliderError, ColliderFlags, QueryStats};
pub use self::obb_collider::{ObbCache, ObbCollider};
pub use self::planes_collider::{PlanesCache, PlanesCollider, MAX_PLANES};
pub use self::ray_batch::cast_rays_parallel;
pub use self::ray_collider::{CollisionFace, CollisionFaces, RayCache, RayCollider};
pub use self::sphere_collider::{SphereCache, SphereCollider};
pub use self::tree_collider::{TreeCache, TreeCollider};
