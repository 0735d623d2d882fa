//! Conservative 16 bit compression of node boxes.

use glam::Vec3;

use super::bounding_volume::{CollisionAabb, Dequantization, QuantizedAabb};

const CENTER_RANGE: f32 = i16::MAX as f32;
const EXTENTS_RANGE: f32 = u16::MAX as f32;
/// Headroom left at the top of the extents range for the rounding fix-up below.
const EXTENTS_MARGIN: f32 = 1.0001;
/// Ceil is off by at most a couple of ulps, so a few increments settle it.
const FIXUP_STEPS: u32 = 4;

/// Picks per axis coefficients for a set of boxes.
///
/// The extents coefficient also covers one center step, so a quantized extent can always
/// absorb the center's rounding error without leaving the 16 bit range.
pub fn compute_dequantization(boxes: &[CollisionAabb]) -> Dequantization {
    let mut max_center = Vec3::ZERO;
    let mut max_extents = Vec3::ZERO;
    for aabb in boxes {
        max_center = max_center.max(aabb.center.abs());
        max_extents = max_extents.max(aabb.extents);
    }
    let center_coeff = max_center / CENTER_RANGE;
    // Divided before summing so that extents close to f32::MAX keep a finite coefficient.
    let extents_coeff = (max_extents / EXTENTS_RANGE + center_coeff / EXTENTS_RANGE) * EXTENTS_MARGIN;
    Dequantization {
        center_coeff,
        extents_coeff,
    }
}

#[inline(always)]
fn quantize_center(value: f32, coeff: f32) -> i16 {
    if coeff == 0.0 {
        return 0;
    }
    (value / coeff).round().clamp(-CENTER_RANGE, CENTER_RANGE) as i16
}

#[inline(always)]
fn quantize_extent(min: f32, max: f32, center: f32, coeff: f32) -> u16 {
    if coeff == 0.0 {
        return 0;
    }
    let needed = (max - center).max(center - min).max(0.0);
    let mut q = (needed / coeff).ceil().min(EXTENTS_RANGE) as u16;
    // Division and ceil can still land a hair short once multiplied back.
    for _ in 0..FIXUP_STEPS {
        let e = q as f32 * coeff;
        if q == u16::MAX || (center + e >= max && center - e <= min) {
            return q;
        }
        q += 1;
    }
    u16::MAX
}

/// Quantizes one box so that its dequantized form contains the original.
pub fn quantize(aabb: &CollisionAabb, dequantization: &Dequantization) -> QuantizedAabb {
    let min = aabb.min().to_array();
    let max = aabb.max().to_array();
    let c = aabb.center.to_array();
    let cc = dequantization.center_coeff.to_array();
    let ec = dequantization.extents_coeff.to_array();

    let mut quantized = QuantizedAabb::default();
    for axis in 0..3 {
        let q = quantize_center(c[axis], cc[axis]);
        quantized.center[axis] = q;
        let decoded_center = q as f32 * cc[axis];
        quantized.extents[axis] = quantize_extent(min[axis], max[axis], decoded_center, ec[axis]);
    }
    quantized
}

pub fn quantize_all(boxes: &[CollisionAabb]) -> (Vec<QuantizedAabb>, Dequantization) {
    let dequantization = compute_dequantization(boxes);
    let quantized = boxes
        .iter()
        .map(|aabb| quantize(aabb, &dequantization))
        .collect();
    (quantized, dequantization)
}
