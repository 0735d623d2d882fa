use crate::config::CollisionConfig;
use crate::physics::collidables::box_shape::Obb;
use crate::physics::collidables::mesh::{CollisionModel, IMeshInterface};
use crate::physics::collidables::triangle::Triangle;
use crate::physics::trees::bounding_volume::CollisionAabb;
use crate::physics::trees::node::CollisionNode;
use crate::physics::trees::optimized_tree::{OptimizedTree, TreeId};
use crate::utilities::plane::Plane;
use crate::utilities::rigid_transform::RigidTransform;
use glam::Mat4;
use log::trace;

use super::collider::{check_mesh, check_settings, ColliderBase, ColliderError, ColliderFlags};
use super::volume_query::{keep_single_contact, IVolumeQuery, NodeTest, VolumeWalker};

/// Planes are addressed by the bits of a `u32` clip mask.
pub const MAX_PLANES: usize = 32;

const TOO_MANY_PLANES: &str = "Planes collider accepts at most 32 planes";

/// Results of the last planes query.
#[derive(Debug, Clone, Default)]
pub struct PlanesCache {
    touched: Vec<u32>,
    tree: Option<TreeId>,
}

impl PlanesCache {
    #[inline(always)]
    pub fn touched(&self) -> &[u32] {
        &self.touched
    }

    pub fn invalidate(&mut self) {
        self.touched.clear();
        self.tree = None;
    }
}

/// Convex volume bounded by planes in model space. A point is inside when it is on the
/// negative side of every plane.
struct PlanesQuery {
    planes: [Plane; MAX_PLANES],
    count: usize,
}

impl PlanesQuery {
    fn new(world_planes: &[Plane], model_to_world: &RigidTransform) -> Self {
        let mut planes = [Plane::default(); MAX_PLANES];
        for (local, plane) in planes.iter_mut().zip(world_planes) {
            *local = plane.to_local(model_to_world);
        }
        Self {
            planes,
            count: world_planes.len(),
        }
    }

    #[inline(always)]
    fn active(&self, mask: u32) -> impl Iterator<Item = (u32, &Plane)> + '_ {
        self.planes[..self.count]
            .iter()
            .enumerate()
            .map(|(i, plane)| (1u32 << i, plane))
            .filter(move |(bit, _)| mask & bit != 0)
    }
}

impl IVolumeQuery for PlanesQuery {
    /// Planes the current node still straddles.
    type State = u32;

    #[inline(always)]
    fn root_state(&self) -> u32 {
        if self.count == MAX_PLANES {
            u32::MAX
        } else {
            (1u32 << self.count) - 1
        }
    }

    #[inline(always)]
    fn test_node(&self, bounds: &CollisionAabb, mask: u32, _: bool) -> NodeTest<u32> {
        let mut out_mask = 0;
        for (bit, plane) in self.active(mask) {
            let distance = plane.distance(bounds.center);
            let reach = bounds.extents.dot(plane.normal.abs());
            if distance > reach {
                return NodeTest::Disjoint;
            }
            if distance > -reach {
                out_mask |= bit;
            }
        }
        if out_mask == 0 {
            NodeTest::Contained
        } else {
            NodeTest::Overlap(out_mask)
        }
    }

    #[inline(always)]
    fn test_primitive(&self, triangle: &Triangle, mask: u32) -> bool {
        // Only a triangle entirely outside one plane is rejected.
        !self.active(mask).any(|(_, plane)| {
            plane.distance(triangle.a) > 0.0
                && plane.distance(triangle.b) > 0.0
                && plane.distance(triangle.c) > 0.0
        })
    }
}

/// Convex set of planes (typically a view frustum) against model.
#[derive(Debug, Clone, Default)]
pub struct PlanesCollider {
    base: ColliderBase,
}

impl_collider_flags!(PlanesCollider);

impl PlanesCollider {
    pub fn new(flags: ColliderFlags) -> Self {
        Self {
            base: ColliderBase::new(flags),
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.flags)
    }

    pub fn validate_settings(&self) -> Option<&'static str> {
        None
    }

    /// Finds the triangles of `model` not entirely outside any of `planes`. Planes are in
    /// world space, normals pointing out of the volume.
    pub fn collide<M: IMeshInterface>(
        &mut self,
        cache: &mut PlanesCache,
        planes: &[Plane],
        model: &CollisionModel<M>,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError> {
        let mesh = model.mesh();
        with_optimized_tree!(model.tree(), tree => {
            self.collide_tree(cache, planes, tree, mesh, world_model)
        })
    }

    /// Box against model, expressed as the box's six face planes.
    pub fn collide_obb<M: IMeshInterface>(
        &mut self,
        cache: &mut PlanesCache,
        obb: &Obb,
        model: &CollisionModel<M>,
        world_box: Option<&Mat4>,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError> {
        let world_obb = match world_box {
            Some(world) => obb.transformed(&RigidTransform::from_mat4(world)),
            None => *obb,
        };
        self.collide(cache, &world_obb.planes(), model, world_model)
    }

    pub fn collide_tree<N, M>(
        &mut self,
        cache: &mut PlanesCache,
        planes: &[Plane],
        tree: &OptimizedTree<N>,
        mesh: &M,
        world_model: Option<&Mat4>,
    ) -> Result<(), ColliderError>
    where
        N: CollisionNode,
        M: IMeshInterface + ?Sized,
    {
        check_settings(self.validate_settings())?;
        if planes.len() > MAX_PLANES {
            check_settings(Some(TOO_MANY_PLANES))?;
        }
        check_mesh(tree.nb_primitives(), mesh)?;
        self.base.begin_query();

        let model_to_world = world_model
            .map(RigidTransform::from_mat4)
            .unwrap_or_else(RigidTransform::identity);
        let query = PlanesQuery::new(planes, &model_to_world);
        let flags = self.base.flags;
        let root = query.root_state();
        if flags.temporal_coherence && flags.first_contact && cache.tree == Some(tree.id()) {
            if keep_single_contact(&mut cache.touched, mesh, &mut self.base.stats, |triangle| {
                query.test_primitive(triangle, root)
            }) {
                trace!("Planes query kept its cached contact");
                self.base.contact = true;
                return Ok(());
            }
        }

        cache.touched.clear();
        VolumeWalker::new(
            tree,
            mesh,
            &query,
            flags.first_contact,
            flags.primitive_tests,
            &mut self.base.stats,
            &mut cache.touched,
        )
        .walk();
        cache.tree = Some(tree.id());
        self.base.contact = !cache.touched.is_empty();
        Ok(())
    }
}
