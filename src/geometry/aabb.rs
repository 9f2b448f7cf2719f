use crate::geometry::{FloatType, Ray, WorldPoint, WorldVector};

/// Axis-aligned bounding box, `[min, max]` in 3D.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl Aabb {
    pub fn new(min: WorldPoint, max: WorldPoint) -> Aabb {
        Aabb { min, max }
    }

    /// An inverted box that grows to enclose the first point added to it.
    pub fn empty() -> Aabb {
        Aabb {
            min: WorldPoint::new(
                FloatType::INFINITY,
                FloatType::INFINITY,
                FloatType::INFINITY,
            ),
            max: WorldPoint::new(
                FloatType::NEG_INFINITY,
                FloatType::NEG_INFINITY,
                FloatType::NEG_INFINITY,
            ),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> Aabb {
        let mut result = Aabb::empty();
        for p in points {
            result.grow_point(p);
        }
        result
    }

    pub fn grow_point(&mut self, p: &WorldPoint) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn grow(&mut self, other: &Aabb) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    pub fn extent(&self) -> WorldVector {
        self.max - self.min
    }

    pub fn center(&self) -> WorldPoint {
        WorldPoint::from((self.min.coords + self.max.coords) * 0.5)
    }

    /// Index of the axis with the largest extent.
    pub fn largest_axis(&self) -> usize {
        let e = self.extent();
        if e.y > e.x && e.y >= e.z {
            1
        } else if e.z > e.x && e.z >= e.y {
            2
        } else {
            0
        }
    }

    /// Calculates first and last ray intersection with the box using the slab
    /// test. Returns entry and exit distance along the ray; the ray intersects
    /// iff entry <= exit. The caller clamps against its own [t_min, t_max]
    /// window.
    pub fn intersect(&self, ray: &Ray) -> (FloatType, FloatType) {
        // Componentwise distances along the ray to the box's min and max corners.
        // Zeros in the direction became +inf in inv_direction; 0 * inf products
        // are NaN and f32::min/max skip NaN operands, so an on-plane parallel
        // ray falls back to the other slab plane.
        let to_min = (self.min - ray.origin).component_mul(&ray.inv_direction);
        let to_max = (self.max - ray.origin).component_mul(&ray.inv_direction);

        let smaller = to_min.zip_map(&to_max, FloatType::min);
        let bigger = to_min.zip_map(&to_max, FloatType::max);

        let entry = smaller.x.max(smaller.y).max(smaller.z);
        let exit = bigger.x.min(bigger.y).min(bigger.z);

        (entry, exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    fn unit_box() -> Aabb {
        Aabb::new([-1.0, -1.0, -1.0].into(), [1.0, 1.0, 1.0].into())
    }

    #[test_case([0.0, 0.0,  5.0], [0.0, 0.0, -1.0], 4.0, 6.0 ; "straight_on_z")]
    #[test_case([5.0, 0.0,  0.0], [-1.0, 0.0, 0.0], 4.0, 6.0 ; "straight_on_x")]
    #[test_case([0.0, 0.0,  0.0], [0.0, 0.0,  1.0], -1.0, 1.0 ; "origin_inside")]
    fn hit(origin: [FloatType; 3], direction: [FloatType; 3], entry: FloatType, exit: FloatType) {
        let ray = Ray::new(origin.into(), direction.into());
        let (t0, t1) = unit_box().intersect(&ray);
        assert!((t0 - entry).abs() < 1e-5);
        assert!((t1 - exit).abs() < 1e-5);
    }

    #[test]
    fn miss_parallel_outside_slab() {
        let ray = Ray::new([0.0, 5.0, 5.0].into(), [0.0, 0.0, -1.0].into());
        let (t0, t1) = unit_box().intersect(&ray);
        assert!(t1 < t0);
    }

    #[test]
    fn behind_origin_still_reports_negative_window() {
        let ray = Ray::new([0.0, 0.0, 5.0].into(), [0.0, 0.0, 1.0].into());
        let (t0, t1) = unit_box().intersect(&ray);
        assert!(t0 <= t1);
        assert!(t1 < 0.0);
    }

    #[test]
    fn grows_to_enclose_points() {
        let b = Aabb::from_points(&[
            WorldPoint::new(1.0, -2.0, 0.5),
            WorldPoint::new(-1.0, 3.0, 0.0),
        ]);
        assert!(b.min == WorldPoint::new(-1.0, -2.0, 0.0));
        assert!(b.max == WorldPoint::new(1.0, 3.0, 0.5));
        assert!(b.largest_axis() == 1);
    }
}
