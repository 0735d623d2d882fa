use crate::physics::collidables::mesh::IMeshInterface;
use crate::utilities::rigid_transform::RigidTransform;
use glam::Mat4;
use log::warn;
use serde::{Deserialize, Serialize};

/// Reasons a collide call refuses to run.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColliderError {
    #[error("Invalid collider settings: {0}")]
    InvalidSettings(&'static str),
    #[error("Tree references {tree_primitives} primitives but the mesh only has {mesh_triangles} triangles")]
    MeshMismatch {
        tree_primitives: u32,
        mesh_triangles: u32,
    },
}

pub(crate) const TEMPORAL_COHERENCE_NEEDS_FIRST_CONTACT: &str =
    "Temporal coherence only works with first contact mode";
pub(crate) const PRIMITIVE_TESTS_REQUIRED: &str =
    "This collider cannot skip primitive tests";

/// Behavior switches every collider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColliderFlags {
    /// Stop at the first reported primitive (or pair).
    pub first_contact: bool,
    /// Reuse the caller's cache across queries.
    pub temporal_coherence: bool,
    /// Test triangles at the leaves. When off, leaves whose box overlaps are reported as is.
    pub primitive_tests: bool,
}

impl Default for ColliderFlags {
    fn default() -> Self {
        Self {
            first_contact: false,
            temporal_coherence: false,
            primitive_tests: true,
        }
    }
}

/// Per query counters, reset at the start of every collide call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Query shape (or node) against node box.
    pub bv_bv_tests: u32,
    /// Query shape (or node box) against triangle.
    pub bv_prim_tests: u32,
    /// Triangle against triangle.
    pub prim_prim_tests: u32,
}

/// State every collider carries: its flags, the counters and the contact status of the
/// last query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColliderBase {
    pub flags: ColliderFlags,
    pub stats: QueryStats,
    pub contact: bool,
}

impl ColliderBase {
    pub fn new(flags: ColliderFlags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    #[inline(always)]
    pub(crate) fn begin_query(&mut self) {
        self.stats = QueryStats::default();
        self.contact = false;
    }

    /// Settings checks shared by the ray and tree colliders, which have no fattened cache and
    /// always need triangle tests.
    pub(crate) fn validate_exact(&self) -> Option<&'static str> {
        if self.flags.temporal_coherence && !self.flags.first_contact {
            return Some(TEMPORAL_COHERENCE_NEEDS_FIRST_CONTACT);
        }
        if !self.flags.primitive_tests {
            return Some(PRIMITIVE_TESTS_REQUIRED);
        }
        None
    }
}

/// Turns a `validate_settings` diagnostic into the error collide calls return.
pub(crate) fn check_settings(diagnostic: Option<&'static str>) -> Result<(), ColliderError> {
    match diagnostic {
        Some(message) => {
            warn!("Rejected collide call: {}", message);
            Err(ColliderError::InvalidSettings(message))
        }
        None => Ok(()),
    }
}

/// Fails if the mesh cannot serve every primitive the tree references.
pub(crate) fn check_mesh<M: IMeshInterface + ?Sized>(
    tree_primitives: u32,
    mesh: &M,
) -> Result<(), ColliderError> {
    let mesh_triangles = mesh.triangle_count();
    if mesh_triangles < tree_primitives {
        warn!(
            "Rejected collide call: tree references {} primitives, mesh has {}",
            tree_primitives, mesh_triangles
        );
        return Err(ColliderError::MeshMismatch {
            tree_primitives,
            mesh_triangles,
        });
    }
    Ok(())
}

/// Transform taking shape space into model space. Missing matrices mean identity; both are
/// assumed to be rotation and translation only.
pub(crate) fn shape_to_model(world_shape: Option<&Mat4>, world_model: Option<&Mat4>) -> RigidTransform {
    let shape = world_shape
        .map(RigidTransform::from_mat4)
        .unwrap_or_else(RigidTransform::identity);
    match world_model {
        Some(model) => RigidTransform::relative(&shape, &RigidTransform::from_mat4(model)),
        None => shape,
    }
}
