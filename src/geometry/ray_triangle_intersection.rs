use crate::geometry::{FloatType, Ray, WorldPoint};

/// Triangles whose determinant magnitude falls below this are treated as
/// parallel or degenerate and reported as a miss.
const DET_EPSILON: FloatType = 1e-8;

/// Distance and barycentric coordinates of a ray/triangle intersection.
#[derive(Copy, Clone, Debug)]
pub struct TriangleHit {
    pub t: FloatType,
    pub u: FloatType,
    pub v: FloatType,
}

/// Calculates ray intersection with the (two sided) triangle.
/// Adapted from https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm
pub fn intersect_triangle(
    ray: &Ray,
    v0: &WorldPoint,
    v1: &WorldPoint,
    v2: &WorldPoint,
) -> Option<TriangleHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;

    let ray_cross_e2 = ray.direction.cross(&e2);
    let det = e1.dot(&ray_cross_e2);

    if det.abs() < DET_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let u = inv_det * s.dot(&ray_cross_e2);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let s_cross_e1 = s.cross(&e1);
    let v = inv_det * ray.direction.dot(&s_cross_e1);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * e2.dot(&s_cross_e1);
    if t <= DET_EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}
