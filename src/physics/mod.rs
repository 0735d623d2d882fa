pub mod collidables;
pub mod collision_detection;
pub mod trees;
