pub mod bounding_box;
pub mod containment_type;
pub mod for_each_ref;
pub mod matrix3x3;
pub mod plane;
pub mod rigid_transform;
pub mod sat;

pub use self::bounding_box::BoundingBox;
pub use self::containment_type::ContainmentType;
pub use self::matrix3x3::Matrix3x3;
pub use self::plane::Plane;
pub use self::rigid_transform::RigidTransform;
