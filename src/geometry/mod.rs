mod aabb;
mod ray_triangle_intersection;

use nalgebra::{Point2, Point3, Rotation3, Unit, Vector3};

pub use aabb::Aabb;
pub use ray_triangle_intersection::{TriangleHit, intersect_triangle};

use crate::material::Material;

pub type FloatType = f32;

/// Error tolerance for general purpose calculations in the raytracer.
/// This is not the same as machine epsilon (FloatType::EPSILON).
pub const EPSILON: FloatType = 1e-6;

/// Offset applied to secondary ray origins to avoid self-intersection.
pub const RAY_OFFSET: FloatType = 1e-4;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;
pub type TexturePoint = Point2<FloatType>;

/// Ray going through the world. Only positive direction is considered to be on the ray.
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: Unit<WorldVector>,

    /// Componentwise inverse of the ray direction.
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,

    /// Refractive index of the medium the ray currently travels inside (1.0 in air).
    pub current_ior: FloatType,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray::with_ior(origin, direction, 1.0)
    }

    pub fn with_ior(origin: WorldPoint, direction: WorldVector, current_ior: FloatType) -> Ray {
        let direction = Unit::new_normalize(direction);
        let inv_direction =
            direction.map(|x| if x == 0.0 { FloatType::INFINITY } else { 1.0 / x });

        Ray {
            origin,
            direction,
            inv_direction,
            current_ior,
        }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction.as_ref() * distance
    }
}

/// Intersection of a ray and the scene
#[derive(Copy, Clone, Debug)]
pub struct HitRecord {
    /// Position along the ray
    pub t: FloatType,
    /// Point where the ray hit the geometry
    pub point: WorldPoint,
    /// Normalized shading normal, oriented against the incoming ray
    pub normal: Unit<WorldVector>,
    /// True iff the ray struck the geometric outside of the surface
    pub front_face: bool,
    /// Shading parameters sampled at the hit point
    pub material: Material,
}

/// Rotation from Euler angles in degrees, composed X then Y then Z.
pub fn euler_rotation_deg(angles: &WorldVector) -> Rotation3<FloatType> {
    Rotation3::from_axis_angle(&WorldVector::x_axis(), angles.x.to_radians())
        * Rotation3::from_axis_angle(&WorldVector::y_axis(), angles.y.to_radians())
        * Rotation3::from_axis_angle(&WorldVector::z_axis(), angles.z.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn ray_direction_is_normalized() {
        let ray = Ray::new([1.0, 2.0, 3.0].into(), [10.0, -4.0, 2.5].into());
        assert!((ray.direction.norm() - 1.0).abs() < 1e-5);
        assert!(ray.current_ior == 1.0);
    }

    #[test]
    fn ray_inverse_direction_handles_zeros() {
        let ray = Ray::new([0.0, 0.0, 0.0].into(), [0.0, 1.0, 0.0].into());
        assert!(ray.inv_direction.x == FloatType::INFINITY);
        assert!(ray.inv_direction.y == 1.0);
        assert!(ray.inv_direction.z == FloatType::INFINITY);
    }

    #[test]
    fn euler_rotation_single_axis() {
        let rot = euler_rotation_deg(&WorldVector::new(0.0, 90.0, 0.0));
        let v = rot * WorldVector::new(0.0, 0.0, -1.0);
        assert!((v - WorldVector::new(-1.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn euler_rotation_composition_order() {
        // X is applied last: (0,0,1) swings to (1,0,0) around Y, which X then
        // leaves in place.
        let rot = euler_rotation_deg(&WorldVector::new(90.0, 90.0, 0.0));
        let v = rot * WorldVector::new(0.0, 0.0, 1.0);
        assert!((v - WorldVector::new(1.0, 0.0, 0.0)).norm() < 1e-6);
    }
}
