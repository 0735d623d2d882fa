//! Collider defaults, loadable from `.toml` or `.ron` files.

use crate::physics::collision_detection::aabb_collider::DEFAULT_AABB_FAT_COEFF;
use crate::physics::collision_detection::collider::ColliderFlags;
use crate::physics::collision_detection::obb_collider::DEFAULT_OBB_FAT_COEFF;
use crate::physics::collision_detection::ray_collider::DEFAULT_MAX_DIST;
use crate::physics::collision_detection::sphere_collider::DEFAULT_SPHERE_FAT_COEFF;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable settings with file persistence. The format follows the extension.
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match Format::of(path)? {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };
        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("ron") => Ok(Format::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayConfig {
    pub closest_hit: bool,
    pub culling: bool,
    pub max_dist: f32,
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            closest_hit: false,
            culling: true,
            max_dist: DEFAULT_MAX_DIST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereConfig {
    pub fat_coeff: f32,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            fat_coeff: DEFAULT_SPHERE_FAT_COEFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AabbConfig {
    pub fat_coeff: f32,
}

impl Default for AabbConfig {
    fn default() -> Self {
        Self {
            fat_coeff: DEFAULT_AABB_FAT_COEFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObbConfig {
    pub fat_coeff: f32,
    pub full_box_box_test: bool,
}

impl Default for ObbConfig {
    fn default() -> Self {
        Self {
            fat_coeff: DEFAULT_OBB_FAT_COEFF,
            full_box_box_test: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub full_box_box_test: bool,
    pub full_prim_box_test: bool,
    /// Keep appending pairs across queries instead of resetting the cache.
    pub accumulate_pairs: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            full_box_box_test: true,
            full_prim_box_test: true,
            accumulate_pairs: false,
        }
    }
}

/// Settings for every collider. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub flags: ColliderFlags,
    pub ray: RayConfig,
    pub sphere: SphereConfig,
    pub aabb: AabbConfig,
    pub obb: ObbConfig,
    pub tree: TreeConfig,
}

impl Config for CollisionConfig {}
