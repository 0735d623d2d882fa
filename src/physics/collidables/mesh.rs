use crate::physics::trees::optimized_tree::AnyOptimizedTree;
use crate::physics::trees::tree::{AabbTree, BuildError};
use crate::physics::trees::tree_builder::BuildSettings;
use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use super::triangle::Triangle;

/// Access to the triangles a tree's primitive indices refer to.
///
/// Trees never store geometry; colliders fetch vertices through this seam whenever they
/// reach a primitive.
pub trait IMeshInterface {
    /// Gets the number of triangles exposed.
    fn triangle_count(&self) -> u32;

    /// Vertices of triangle `index`, in the mesh's local space.
    fn get_triangle(&self, index: u32) -> [Vec3; 3];

    #[inline(always)]
    fn triangle(&self, index: u32) -> Triangle {
        Triangle::from(self.get_triangle(index))
    }
}

impl<T: IMeshInterface + ?Sized> IMeshInterface for &T {
    #[inline(always)]
    fn triangle_count(&self) -> u32 {
        (**self).triangle_count()
    }

    #[inline(always)]
    fn get_triangle(&self, index: u32) -> [Vec3; 3] {
        (**self).get_triangle(index)
    }
}

/// Borrowed indexed triangle list. Indices must be in range of `vertices`.
#[derive(Debug, Clone, Copy)]
pub struct IndexedMesh<'a> {
    pub triangles: &'a [[u32; 3]],
    pub vertices: &'a [Vec3],
}

impl<'a> IndexedMesh<'a> {
    pub fn new(triangles: &'a [[u32; 3]], vertices: &'a [Vec3]) -> Self {
        Self {
            triangles,
            vertices,
        }
    }
}

impl<'a> IMeshInterface for IndexedMesh<'a> {
    #[inline(always)]
    fn triangle_count(&self) -> u32 {
        self.triangles.len() as u32
    }

    #[inline(always)]
    fn get_triangle(&self, index: u32) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index as usize];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }
}

/// Owned indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub triangles: Vec<[u32; 3]>,
    pub vertices: Vec<Vec3>,
}

impl TriangleMesh {
    pub fn new(triangles: Vec<[u32; 3]>, vertices: Vec<Vec3>) -> Self {
        Self {
            triangles,
            vertices,
        }
    }

    #[inline(always)]
    pub fn as_indexed(&self) -> IndexedMesh<'_> {
        IndexedMesh::new(&self.triangles, &self.vertices)
    }
}

impl IMeshInterface for TriangleMesh {
    #[inline(always)]
    fn triangle_count(&self) -> u32 {
        self.triangles.len() as u32
    }

    #[inline(always)]
    fn get_triangle(&self, index: u32) -> [Vec3; 3] {
        self.as_indexed().get_triangle(index)
    }
}

/// Geometry supplied by a callback, for meshes stored in a layout the other sources can't
/// read.
pub struct CallbackMesh<F> {
    count: u32,
    callback: F,
}

impl<F: Fn(u32) -> [Vec3; 3]> CallbackMesh<F> {
    pub fn new(count: u32, callback: F) -> Self {
        Self { count, callback }
    }
}

impl<F: Fn(u32) -> [Vec3; 3]> IMeshInterface for CallbackMesh<F> {
    #[inline(always)]
    fn triangle_count(&self) -> u32 {
        self.count
    }

    #[inline(always)]
    fn get_triangle(&self, index: u32) -> [Vec3; 3] {
        (self.callback)(index)
    }
}

/// Layout of the tree a model builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Fold leaves into their parents: `n - 1` nodes instead of `2n - 1`.
    pub no_leaf: bool,
    /// Store node boxes as 16 bit integers.
    pub quantized: bool,
}

/// A mesh together with the optimized tree built over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionModel<M> {
    tree: AnyOptimizedTree,
    mesh: M,
}

impl<M: IMeshInterface> CollisionModel<M> {
    /// Builds a tree over every triangle of `mesh` in the requested layout.
    pub fn build(mesh: M, settings: ModelSettings) -> Result<Self, BuildError> {
        let source = AabbTree::from_mesh(&mesh, BuildSettings::default())?;
        let tree = AnyOptimizedTree::build(&source, &settings)?;
        debug!(
            "Built collision model: {} triangles, {} nodes, {} bytes",
            mesh.triangle_count(),
            tree.nb_nodes(),
            tree.used_bytes()
        );
        Ok(Self { tree, mesh })
    }

    /// Pairs an existing tree, built or loaded elsewhere, with its mesh.
    pub fn from_parts(tree: AnyOptimizedTree, mesh: M) -> Self {
        Self { tree, mesh }
    }

    #[inline(always)]
    pub fn tree(&self) -> &AnyOptimizedTree {
        &self.tree
    }

    #[inline(always)]
    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    pub fn into_parts(self) -> (AnyOptimizedTree, M) {
        (self.tree, self.mesh)
    }
}
