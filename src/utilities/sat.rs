//! Separating axis tests between boxes.
//!
//! All comparisons go through [`greater`], and every absolute rotation entry carries
//! [`ABS_ROTATION_EPSILON`], so the numeric behavior is the same for every collider.

use crate::utilities::rigid_transform::RigidTransform;
use glam::Vec3;

/// Added to each entry of an absolute rotation matrix. Keeps edge pairs that are nearly
/// parallel from producing a null cross axis.
pub const ABS_ROTATION_EPSILON: f32 = 1e-6;

/// `|x| > y`
#[inline(always)]
pub fn greater(x: f32, y: f32) -> bool {
    x.abs() > y
}

/// Axis aligned box against axis aligned box, both given as center and extents.
#[inline(always)]
pub fn aabb_aabb_overlap(center_a: Vec3, extents_a: Vec3, center_b: Vec3, extents_b: Vec3) -> bool {
    let t = center_a - center_b;
    let e = extents_a + extents_b;
    !(greater(t.x, e.x) || greater(t.y, e.y) || greater(t.z, e.z))
}

/// Relative placement of frame B inside frame A, precomputed once per query.
///
/// `rotation[i][j]` is the component of B's axis `j` along A's axis `i`.
#[derive(Clone, Copy, Debug)]
pub struct BoxFrame {
    pub rotation: [[f32; 3]; 3],
    pub abs_rotation: [[f32; 3]; 3],
    /// Origin of B expressed in A.
    pub translation: Vec3,
}

impl BoxFrame {
    /// Builds the frame from the transform mapping B's local points into A.
    pub fn from_transform(b_to_a: &RigidTransform) -> Self {
        // Rows of the orientation are B's axes in A; the transpose indexes them by A's axes.
        let axes = b_to_a.orientation.transposed();
        let abs_axes = axes.absolute(ABS_ROTATION_EPSILON);
        Self {
            rotation: [axes.x.to_array(), axes.y.to_array(), axes.z.to_array()],
            abs_rotation: [abs_axes.x.to_array(), abs_axes.y.to_array(), abs_axes.z.to_array()],
            translation: b_to_a.translation,
        }
    }

    /// Position of a B point in A.
    #[inline(always)]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let r = &self.rotation;
        Vec3::new(
            r[0][0] * p.x + r[0][1] * p.y + r[0][2] * p.z,
            r[1][0] * p.x + r[1][1] * p.y + r[1][2] * p.z,
            r[2][0] * p.x + r[2][1] * p.y + r[2][2] * p.z,
        ) + self.translation
    }

    /// Half extents along A's axes of a B box with extents `e`.
    #[inline(always)]
    pub fn projected_extents(&self, e: Vec3) -> Vec3 {
        let r = &self.abs_rotation;
        Vec3::new(
            r[0][0] * e.x + r[0][1] * e.y + r[0][2] * e.z,
            r[1][0] * e.x + r[1][1] * e.y + r[1][2] * e.z,
            r[2][0] * e.x + r[2][1] * e.y + r[2][2] * e.z,
        )
    }

    /// Separating axis test between box A (`center_a`, `extents_a`, in A) and box B
    /// (`center_b`, `extents_b`, in B).
    ///
    /// Class I axes are A's, class II are B's, class III are the nine cross products, tested
    /// only when `full_test` is set.
    pub fn box_box_overlap(
        &self,
        extents_a: Vec3,
        center_a: Vec3,
        extents_b: Vec3,
        center_b: Vec3,
        full_test: bool,
    ) -> bool {
        let r = &self.rotation;
        let ar = &self.abs_rotation;
        let ea = extents_a.to_array();
        let eb = extents_b.to_array();
        let t = (self.transform_point(center_b) - center_a).to_array();

        // Class I
        for i in 0..3 {
            let rb = eb[0] * ar[i][0] + eb[1] * ar[i][1] + eb[2] * ar[i][2];
            if greater(t[i], ea[i] + rb) {
                return false;
            }
        }

        // Class II
        for j in 0..3 {
            let ts = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            let ra = ea[0] * ar[0][j] + ea[1] * ar[1][j] + ea[2] * ar[2][j];
            if greater(ts, ra + eb[j]) {
                return false;
            }
        }

        // Class III
        if full_test {
            for i in 0..3 {
                let i1 = (i + 1) % 3;
                let i2 = (i + 2) % 3;
                for j in 0..3 {
                    let j1 = (j + 1) % 3;
                    let j2 = (j + 2) % 3;
                    let ts = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                    let ra = ea[i1] * ar[i2][j] + ea[i2] * ar[i1][j];
                    let rb = eb[j1] * ar[i][j2] + eb[j2] * ar[i][j1];
                    if greater(ts, ra + rb) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// True if box B lies entirely inside box A.
    #[inline(always)]
    pub fn contains(&self, extents_a: Vec3, center_a: Vec3, extents_b: Vec3, center_b: Vec3) -> bool {
        let t = (self.transform_point(center_b) - center_a).abs();
        let reach = t + self.projected_extents(extents_b);
        reach.cmple(extents_a).all()
    }
}
