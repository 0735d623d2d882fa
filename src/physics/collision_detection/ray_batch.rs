use crate::physics::collidables::mesh::{CollisionModel, IMeshInterface};
use crate::physics::collidables::ray::Ray;
use glam::Mat4;
use log::debug;

use super::collider::ColliderError;
use super::ray_collider::{CollisionFaces, RayCache, RayCollider};

/// Casts `rays` against one shared model on up to `threads` scoped threads.
///
/// Each thread runs its own copy of `collider`, so the settings of the template apply to every
/// ray. The returned lists are in the order of `rays`.
pub fn cast_rays_parallel<M>(
    model: &CollisionModel<M>,
    world_model: Option<&Mat4>,
    rays: &[Ray],
    collider: &RayCollider,
    threads: usize,
) -> Result<Vec<CollisionFaces>, ColliderError>
where
    M: IMeshInterface + Sync,
{
    if let Some(message) = collider.validate_settings() {
        return Err(ColliderError::InvalidSettings(message));
    }
    if rays.is_empty() {
        return Ok(Vec::new());
    }
    let threads = threads.clamp(1, rays.len());
    let chunk_size = rays.len().div_ceil(threads);
    debug!("Casting {} rays on {} threads", rays.len(), threads);

    let scoped = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = rays
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move |_| -> Result<Vec<CollisionFaces>, ColliderError> {
                    let mut collider = collider.clone();
                    let mut cache = RayCache::default();
                    chunk
                        .iter()
                        .map(|ray| {
                            let mut faces = CollisionFaces::new();
                            collider.collide(&mut cache, &mut faces, ray, model, world_model)?;
                            Ok(faces)
                        })
                        .collect()
                })
            })
            .collect();

        let mut results = Vec::with_capacity(rays.len());
        for handle in handles {
            match handle.join() {
                Ok(faces) => results.extend(faces?),
                Err(e) => std::panic::resume_unwind(e),
            }
        }
        Ok(results)
    });
    match scoped {
        Ok(results) => results,
        Err(e) => std::panic::resume_unwind(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collidables::mesh::{ModelSettings, TriangleMesh};
    use glam::Vec3;

    #[test]
    fn parallel_matches_sequential() {
        let mesh = TriangleMesh::new(
            vec![[0, 1, 2], [2, 1, 3]],
            vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 4.0, 0.0), Vec3::new(4.0, 4.0, 0.0)],
        );
        let model = CollisionModel::build(mesh, ModelSettings::default()).unwrap();
        let rays: Vec<Ray> = (0..37)
            .map(|i| Ray::new(Vec3::new(0.05 + i as f32 * 0.13, 1.9, 3.0), -Vec3::Z))
            .collect();
        let template = RayCollider::default();

        let parallel = cast_rays_parallel(&model, None, &rays, &template, 4).unwrap();
        assert_eq!(parallel.len(), rays.len());

        let mut collider = template.clone();
        let mut cache = RayCache::default();
        for (ray, faces) in rays.iter().zip(&parallel) {
            let mut expected = CollisionFaces::new();
            collider.collide(&mut cache, &mut expected, ray, &model, None).unwrap();
            assert_eq!(&expected, faces);
        }
        assert!(parallel[0].len() == 1 && parallel[36].is_empty());
    }

    #[test]
    fn template_settings_are_checked_up_front() {
        let mesh = TriangleMesh::new(vec![[0, 1, 2]], vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        let model = CollisionModel::build(mesh, ModelSettings::default()).unwrap();
        let mut template = RayCollider::default();
        template.set_max_dist(-2.0);
        assert!(cast_rays_parallel(&model, None, &[Ray::default()], &template, 2).is_err());
        assert!(cast_rays_parallel(&model, None, &[], &RayCollider::default(), 2)
            .unwrap()
            .is_empty());
    }
}
