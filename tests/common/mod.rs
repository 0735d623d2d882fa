#![allow(dead_code)]

use glam::Vec3;
use rust_meshcollide::TriangleMesh;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Small deterministic generator so scenes are reproducible.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }

    pub fn vec3(&mut self, scale: f32) -> Vec3 {
        Vec3::new(self.next_f32(), self.next_f32(), self.next_f32()) * scale
    }
}

/// `count` independent small triangles scattered in a cube of side `size`.
pub fn triangle_soup(count: u32, size: f32, seed: u64) -> TriangleMesh {
    let mut rng = Lcg::new(seed);
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    for i in 0..count {
        let center = rng.vec3(size);
        for _ in 0..3 {
            vertices.push(center + rng.vec3(2.0) - Vec3::ONE);
        }
        triangles.push([i * 3, i * 3 + 1, i * 3 + 2]);
    }
    TriangleMesh::new(triangles, vertices)
}

/// Regular height field over `size` x `size` cells.
pub fn terrain(size: u32) -> TriangleMesh {
    let row = size + 1;
    let mut vertices = Vec::new();
    for y in 0..row {
        for x in 0..row {
            let (fx, fy) = (x as f32, y as f32);
            vertices.push(Vec3::new(fx, fy, (fx * 0.7).sin() * (fy * 0.4).cos()));
        }
    }
    let mut triangles = Vec::new();
    for y in 0..size {
        for x in 0..size {
            let i = y * row + x;
            triangles.push([i, i + 1, i + row]);
            triangles.push([i + 1, i + row + 1, i + row]);
        }
    }
    TriangleMesh::new(triangles, vertices)
}

pub const LAYOUTS: [(bool, bool); 4] = [(false, false), (true, false), (false, true), (true, true)];
