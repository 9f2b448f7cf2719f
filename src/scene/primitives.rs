use nalgebra::Unit;

use crate::geometry::{FloatType, HitRecord, Ray, WorldPoint, WorldVector, euler_rotation_deg};
use crate::material::Material;

pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
    pub material: Material,
}

impl Sphere {
    /// Quadratic intersection with half-b factoring; the ray direction is
    /// unit so the leading coefficient drops out.
    pub fn intersect(&self, ray: &Ray, t_min: FloatType, t_max: FloatType) -> Option<HitRecord> {
        let oc = ray.origin - self.center;
        let half_b = oc.dot(&ray.direction);
        let c = oc.norm_squared() - self.radius * self.radius;

        let discriminant = half_b * half_b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_disc = discriminant.sqrt();

        // Nearer root preferred, farther one accepted if the near one falls
        // outside the window
        let mut t = -half_b - sqrt_disc;
        if t < t_min || t > t_max {
            t = -half_b + sqrt_disc;
            if t < t_min || t > t_max {
                return None;
            }
        }

        let point = ray.point_at(t);
        let outward = (point - self.center) / self.radius;
        let front_face = ray.direction.dot(&outward) < 0.0;
        let normal = Unit::new_normalize(if front_face { outward } else { -outward });

        Some(HitRecord {
            t,
            point,
            normal,
            front_face,
            material: self.material,
        })
    }
}

pub struct OrientedBox {
    pub center: WorldPoint,
    /// Euler rotation in degrees, applied X then Y then Z
    pub rotation_deg: WorldVector,
    /// Full extents; all components positive
    pub size: WorldVector,
    pub material: Material,
}

impl OrientedBox {
    /// Slab test in the box's local frame. The ray is rotated into local
    /// space (the rotation inverse is its transpose), tested against the
    /// axis-aligned box `[-half, half]` and the hit normal rotated back.
    pub fn intersect(&self, ray: &Ray, t_min: FloatType, t_max: FloatType) -> Option<HitRecord> {
        let world_from_local = euler_rotation_deg(&self.rotation_deg);
        let local_from_world = world_from_local.inverse();

        let origin_local = local_from_world * (ray.origin - self.center);
        let dir_local = local_from_world * ray.direction.into_inner();

        let half = self.size * 0.5;

        // Near-zero direction components get huge finite reciprocals so the
        // slab arithmetic stays NaN-free
        const BIG: FloatType = 1e30;
        let inv_dir = dir_local.map(|d| {
            if d != 0.0 {
                1.0 / d
            } else if d.is_sign_positive() {
                BIG
            } else {
                -BIG
            }
        });

        let t1 = (-half - origin_local).component_mul(&inv_dir);
        let t2 = (half - origin_local).component_mul(&inv_dir);
        let t_min3 = t1.inf(&t2);
        let t_max3 = t1.sup(&t2);

        let t_entry = t_min3.max();
        let t_exit = t_max3.min();

        if t_exit < t_entry || t_exit < t_min {
            return None;
        }
        let mut t_hit = t_entry;
        if t_hit < t_min {
            // Started inside the box, the exit face is the first valid hit
            t_hit = t_exit;
        }
        if t_hit < t_min || t_hit > t_max {
            return None;
        }

        let p_local = origin_local + dir_local * t_hit;

        // Find which face the hit point lies on, within a scale-relative
        // tolerance
        let eps = 1e-4 * half.max();
        let normal_local = if (p_local.z - half.z).abs() <= eps {
            WorldVector::new(0.0, 0.0, 1.0)
        } else if (p_local.z + half.z).abs() <= eps {
            WorldVector::new(0.0, 0.0, -1.0)
        } else if (p_local.y - half.y).abs() <= eps {
            WorldVector::new(0.0, 1.0, 0.0)
        } else if (p_local.y + half.y).abs() <= eps {
            WorldVector::new(0.0, -1.0, 0.0)
        } else if (p_local.x - half.x).abs() <= eps {
            WorldVector::new(1.0, 0.0, 0.0)
        } else if (p_local.x + half.x).abs() <= eps {
            WorldVector::new(-1.0, 0.0, 0.0)
        } else {
            // Slightly off every face due to floating point; fall back to the
            // axis whose slab produced the entry distance
            if t_entry == t_min3.x {
                WorldVector::new((origin_local.x + t_entry * dir_local.x).signum(), 0.0, 0.0)
            } else if t_entry == t_min3.y {
                WorldVector::new(0.0, (origin_local.y + t_entry * dir_local.y).signum(), 0.0)
            } else {
                WorldVector::new(0.0, 0.0, (origin_local.z + t_entry * dir_local.z).signum())
            }
        };

        let normal_world = (world_from_local * normal_local).normalize();
        let front_face = ray.direction.dot(&normal_world) < 0.0;
        let normal = Unit::new_normalize(if front_face {
            normal_world
        } else {
            -normal_world
        });

        Some(HitRecord {
            t: t_hit,
            point: ray.point_at(t_hit),
            normal,
            front_face,
            material: self.material,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    fn sphere() -> Sphere {
        Sphere {
            center: [1.0, 2.0, 3.0].into(),
            radius: 1.0,
            material: Material::default(),
        }
    }

    #[test]
    fn sphere_direct_hit_through_center() {
        let ray = Ray::new([1.0, 2.0, 0.0].into(), [0.0, 0.0, 1.0].into());
        let hit = sphere()
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");

        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!(hit.front_face);
        assert!((hit.normal.into_inner() - WorldVector::new(0.0, 0.0, -1.0)).norm() < 1e-5);
    }

    #[test]
    fn sphere_narrow_miss() {
        let ray = Ray::new([2.0, 2.01, 0.0].into(), [0.0, 0.0, 1.0].into());
        assert!(sphere().intersect(&ray, 1e-4, FloatType::INFINITY).is_none());
    }

    #[test]
    fn sphere_from_inside_hits_far_wall() {
        let ray = Ray::new([1.0, 2.0, 3.0].into(), [0.0, 0.0, 1.0].into());
        let hit = sphere()
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");

        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!(!hit.front_face);
        // Shading normal faces back toward the ray origin
        assert!(hit.normal.dot(&ray.direction) < 0.0);
    }

    #[test]
    fn sphere_respects_window() {
        let ray = Ray::new([1.0, 2.0, 0.0].into(), [0.0, 0.0, 1.0].into());
        assert!(sphere().intersect(&ray, 1e-4, 1.5).is_none());
        // Window excluding only the near root falls through to the far one
        let hit = sphere().intersect(&ray, 2.5, 10.0).expect("far root");
        assert!((hit.t - 4.0).abs() < 1e-5);
    }

    fn rotated_box() -> OrientedBox {
        OrientedBox {
            center: WorldPoint::origin(),
            rotation_deg: [0.0, 45.0, 0.0].into(),
            size: [2.0, 2.0, 2.0].into(),
            material: Material::default(),
        }
    }

    #[test]
    fn box_hit_on_rotated_face() {
        let ray = Ray::new([0.0, 0.0, 3.0].into(), [0.0, 0.0, -1.0].into());
        let hit = rotated_box()
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");

        let sqrt2 = FloatType::sqrt(2.0);
        assert!((hit.t - (3.0 - sqrt2)).abs() < 1e-4);
        assert!(hit.front_face);
        let expected = WorldVector::new(sqrt2 / 2.0, 0.0, sqrt2 / 2.0);
        assert!((hit.normal.into_inner() - expected).norm() < 1e-4);
    }

    #[test_case([ 5.0, 0.0, 0.0], [-1.0, 0.0, 0.0], [ 1.0, 0.0, 0.0] ; "pos_x_face")]
    #[test_case([-5.0, 0.0, 0.0], [ 1.0, 0.0, 0.0], [-1.0, 0.0, 0.0] ; "neg_x_face")]
    #[test_case([0.0,  5.0, 0.0], [0.0, -1.0, 0.0], [0.0,  1.0, 0.0] ; "pos_y_face")]
    #[test_case([0.0, -5.0, 0.0], [0.0,  1.0, 0.0], [0.0, -1.0, 0.0] ; "neg_y_face")]
    fn axis_aligned_box_face_normals(
        origin: [FloatType; 3],
        direction: [FloatType; 3],
        normal: [FloatType; 3],
    ) {
        let oriented_box = OrientedBox {
            center: WorldPoint::origin(),
            rotation_deg: WorldVector::zeros(),
            size: [2.0, 2.0, 2.0].into(),
            material: Material::default(),
        };
        let ray = Ray::new(origin.into(), direction.into());
        let hit = oriented_box
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");

        assert!((hit.t - 4.0).abs() < 1e-4);
        assert!((hit.normal.into_inner() - WorldVector::from(normal)).norm() < 1e-5);
    }

    #[test]
    fn box_from_inside_reports_back_face() {
        let oriented_box = OrientedBox {
            center: WorldPoint::origin(),
            rotation_deg: WorldVector::zeros(),
            size: [2.0, 2.0, 2.0].into(),
            material: Material::default(),
        };
        let ray = Ray::new(WorldPoint::origin(), [0.0, 0.0, -1.0].into());
        let hit = oriented_box
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");

        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!(!hit.front_face);
        assert!(hit.normal.dot(&ray.direction) < 0.0);
    }

    #[test]
    fn box_behind_ray_misses() {
        let oriented_box = rotated_box();
        let ray = Ray::new([0.0, 0.0, 5.0].into(), [0.0, 0.0, 1.0].into());
        assert!(
            oriented_box
                .intersect(&ray, 1e-4, FloatType::INFINITY)
                .is_none()
        );
    }

    #[test]
    fn box_axis_parallel_ray_outside_slab_misses() {
        let oriented_box = OrientedBox {
            center: WorldPoint::origin(),
            rotation_deg: WorldVector::zeros(),
            size: [2.0, 2.0, 2.0].into(),
            material: Material::default(),
        };
        let ray = Ray::new([5.0, 0.0, 5.0].into(), [0.0, 0.0, -1.0].into());
        assert!(
            oriented_box
                .intersect(&ray, 1e-4, FloatType::INFINITY)
                .is_none()
        );
    }
}
