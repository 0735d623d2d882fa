use crate::utilities::bounding_box::BoundingBox;
use glam::Vec3;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;

use super::quantization;

/// Axis aligned box stored as center and half extents, the layout every tree node uses.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionAabb {
    pub center: Vec3,
    /// Half extents, every component >= 0. Zero is valid (point primitives).
    pub extents: Vec3,
}

impl CollisionAabb {
    #[inline(always)]
    pub fn new(center: Vec3, extents: Vec3) -> Self {
        Self { center, extents }
    }

    #[inline(always)]
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            // Halving first keeps boxes spanning the whole f32 range finite.
            center: min * 0.5 + max * 0.5,
            extents: max * 0.5 - min * 0.5,
        }
    }

    #[inline(always)]
    pub fn from_bounding_box(bounds: &BoundingBox) -> Self {
        Self::from_min_max(bounds.min, bounds.max)
    }

    #[inline(always)]
    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    #[inline(always)]
    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    #[inline(always)]
    pub fn to_bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.min(), self.max())
    }

    /// True if `other` lies entirely inside this box.
    #[inline(always)]
    pub fn contains(&self, other: &CollisionAabb) -> bool {
        self.min().cmple(other.min()).all() && self.max().cmpge(other.max()).all()
    }

    /// Size measure used to decide which side of a pair to descend first.
    #[inline(always)]
    pub fn size(&self) -> f32 {
        self.extents.length_squared()
    }
}

/// Scale factors turning quantized integers back into floats. Stored once per tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dequantization {
    pub center_coeff: Vec3,
    pub extents_coeff: Vec3,
}

/// Center and extents compressed to 16 bits per component.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedAabb {
    pub center: [i16; 3],
    pub extents: [u16; 3],
}

impl QuantizedAabb {
    #[inline(always)]
    pub fn dequantize(&self, dequantization: &Dequantization) -> CollisionAabb {
        let c = Vec3::new(
            self.center[0] as f32,
            self.center[1] as f32,
            self.center[2] as f32,
        );
        let e = Vec3::new(
            self.extents[0] as f32,
            self.extents[1] as f32,
            self.extents[2] as f32,
        );
        CollisionAabb {
            center: c * dequantization.center_coeff,
            extents: e * dequantization.extents_coeff,
        }
    }
}

/// Bounding volume representation stored in a tree node.
pub trait NodeVolume: Copy + Debug + Default + PartialEq + Serialize + DeserializeOwned {
    const QUANTIZED: bool;

    /// Float box used by the overlap tests.
    fn decode(&self, dequantization: &Dequantization) -> CollisionAabb;

    /// Converts the full precision node boxes of a tree, returning the coefficients the tree
    /// must keep to decode them.
    fn encode_all(boxes: &[CollisionAabb]) -> (Vec<Self>, Dequantization);
}

impl NodeVolume for CollisionAabb {
    const QUANTIZED: bool = false;

    #[inline(always)]
    fn decode(&self, _dequantization: &Dequantization) -> CollisionAabb {
        *self
    }

    fn encode_all(boxes: &[CollisionAabb]) -> (Vec<Self>, Dequantization) {
        (boxes.to_vec(), Dequantization::default())
    }
}

impl NodeVolume for QuantizedAabb {
    const QUANTIZED: bool = true;

    #[inline(always)]
    fn decode(&self, dequantization: &Dequantization) -> CollisionAabb {
        self.dequantize(dequantization)
    }

    fn encode_all(boxes: &[CollisionAabb]) -> (Vec<Self>, Dequantization) {
        quantization::quantize_all(boxes)
    }
}
