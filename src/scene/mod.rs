pub mod mesh;
pub mod mesh_bvh;
pub mod primitives;

pub use mesh::{MeshAsset, MeshInstance};
pub use primitives::{OrientedBox, Sphere};

use crate::geometry::{FloatType, HitRecord, Ray};

/// Renderable instance. A tagged variant keeps the intersectors visible to
/// the optimizer instead of hiding them behind a vtable.
pub enum Instance {
    Sphere(Sphere),
    OrientedBox(OrientedBox),
    Mesh(MeshInstance),
}

impl Instance {
    pub fn intersect(&self, ray: &Ray, t_min: FloatType, t_max: FloatType) -> Option<HitRecord> {
        match self {
            Instance::Sphere(sphere) => sphere.intersect(ray, t_min, t_max),
            Instance::OrientedBox(oriented_box) => oriented_box.intersect(ray, t_min, t_max),
            Instance::Mesh(mesh) => mesh.intersect(ray, t_min, t_max),
        }
    }
}

/// Flat list of instances. Mutated only between frames; read-only while a
/// frame is in flight.
#[derive(Default)]
pub struct Scene {
    instances: Vec<Instance>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene::default()
    }

    pub fn add_instance(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut [Instance] {
        &mut self.instances
    }

    /// Nearest hit along the ray within `[t_min, t_max]`, or `None` when the
    /// ray escapes to the background.
    pub fn nearest_hit(&self, ray: &Ray, t_min: FloatType, t_max: FloatType) -> Option<HitRecord> {
        let mut closest_t = t_max;
        let mut best = None;

        for instance in &self.instances {
            if let Some(hit) = instance.intersect(ray, t_min, closest_t) {
                closest_t = hit.t;
                best = Some(hit);
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WorldPoint;
    use crate::material::Material;
    use assert2::assert;

    fn sphere_at(z: FloatType) -> Instance {
        Instance::Sphere(Sphere {
            center: WorldPoint::new(0.0, 0.0, z),
            radius: 1.0,
            material: Material::default(),
        })
    }

    #[test]
    fn nearest_hit_picks_the_closer_instance() {
        let mut scene = Scene::new();
        scene.add_instance(sphere_at(-10.0));
        scene.add_instance(sphere_at(-5.0));

        let ray = Ray::new(WorldPoint::origin(), [0.0, 0.0, -1.0].into());
        let hit = scene
            .nearest_hit(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");
        assert!((hit.t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn cleared_scene_misses() {
        let mut scene = Scene::new();
        scene.add_instance(sphere_at(-5.0));
        scene.clear();

        let ray = Ray::new(WorldPoint::origin(), [0.0, 0.0, -1.0].into());
        assert!(scene.nearest_hit(&ray, 1e-4, FloatType::INFINITY).is_none());
    }

    #[test]
    fn window_excludes_distant_hits() {
        let mut scene = Scene::new();
        scene.add_instance(sphere_at(-5.0));

        let ray = Ray::new(WorldPoint::origin(), [0.0, 0.0, -1.0].into());
        assert!(scene.nearest_hit(&ray, 1e-4, 3.0).is_none());
    }
}
