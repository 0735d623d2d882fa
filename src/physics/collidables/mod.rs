pub mod box_shape;
pub mod mesh;
pub mod ray;
pub mod sphere;
pub mod triangle;

pub use self::box_shape::Obb;
pub use self::mesh::{
    CallbackMesh, CollisionModel, IMeshInterface, IndexedMesh, ModelSettings, TriangleMesh,
};
pub use self::ray::{Ray, Segment};
pub use self::sphere::Sphere;
pub use self::triangle::{Triangle, TriangleHit};
