use rand::Rng;

use crate::geometry::{FloatType, HitRecord, RAY_OFFSET, Ray, WorldVector};
use crate::material::LinearRgb;
use crate::scene::Scene;

const T_MAX: FloatType = 1e30;
/// Floor for the lobe-selection pdf, keeps the weights finite.
const PDF_EPSILON: FloatType = 1e-4;

/// Recursive radiance estimator: emission plus one sampled BSDF lobe per
/// bounce (dielectric transmission, GGX specular or Lambertian diffuse),
/// with the estimate reweighted by the selection probability.
pub struct PathTracer {
    background: LinearRgb,
}

impl PathTracer {
    pub fn new() -> PathTracer {
        PathTracer::default()
    }

    pub fn with_background(background: LinearRgb) -> PathTracer {
        PathTracer { background }
    }

    pub fn background(&self) -> LinearRgb {
        self.background
    }

    pub fn set_background(&mut self, background: LinearRgb) {
        self.background = background;
    }

    /// Estimates the radiance arriving along `ray`.
    ///
    /// `depth` bounds the recursion; it terminates unconditionally at zero.
    /// With `albedo_only` the estimator returns a distance-darkened base
    /// colour at the first hit instead of recursing (a cheap preview mode).
    pub fn trace_ray(
        &self,
        scene: &Scene,
        ray: &Ray,
        depth: u32,
        albedo_only: bool,
        rng: &mut impl Rng,
    ) -> LinearRgb {
        if depth == 0 {
            return LinearRgb::zeros();
        }

        let Some(hit) = scene.nearest_hit(ray, RAY_OFFSET, T_MAX) else {
            return self.background;
        };

        if albedo_only {
            return hit.material.albedo * (1.0 - (hit.t / 20.0).clamp(0.0, 0.8));
        }

        let mut radiance = hit.material.emission();
        radiance += self.sample_bounce(scene, ray, &hit, depth, rng);
        radiance
    }

    /// Picks one lobe, traces its continuation ray and returns the weighted
    /// estimate. Below-horizon samples contribute zero.
    fn sample_bounce(
        &self,
        scene: &Scene,
        ray: &Ray,
        hit: &HitRecord,
        depth: u32,
        rng: &mut impl Rng,
    ) -> LinearRgb {
        let material = &hit.material;
        let n = hit.normal.into_inner();
        let frame = OrthonormalFrame::around(&n);

        let wo = -ray.direction.into_inner();
        let cos_no = wo.dot(&n).max(0.0);

        let f0 = LinearRgb::new(0.04, 0.04, 0.04).lerp(&material.albedo, material.metallic);
        let alpha = (material.roughness * material.roughness).max(1e-4);

        // Stage A, transmission coin
        let p_transmission = material.transmission.clamp(0.0, 1.0);
        if rng.random::<FloatType>() < p_transmission {
            return self.sample_interface(scene, ray, hit, &frame, alpha, p_transmission, depth, rng);
        }

        // Non-interface: split the remaining probability between the
        // specular and diffuse lobes by the view-angle Fresnel
        let f_view = schlick(&f0, cos_no);
        let spec_prob = (f_view.mean()).clamp(0.05, 0.95);

        if rng.random::<FloatType>() < spec_prob {
            // Specular GGX lobe
            let half = frame.to_world(&sample_ggx_half(alpha, rng));
            let wi = reflect(&wo, &half);
            if wi.dot(&n) <= 0.0 {
                return LinearRgb::zeros();
            }

            let pdf = (spec_prob * (1.0 - p_transmission)).max(PDF_EPSILON);
            let weight = microfacet_weight(&f0, alpha, &wo, &wi, &half, &n) / pdf;

            let next = Ray::with_ior(hit.point + n * RAY_OFFSET, wi, ray.current_ior);
            weight.component_mul(&self.trace_ray(scene, &next, depth - 1, false, rng))
        } else {
            // Diffuse lobe, cosine-weighted hemisphere sample
            let wi = frame.to_world(&sample_cosine_hemisphere(rng));

            let pdf = ((1.0 - spec_prob) * (1.0 - p_transmission)).max(PDF_EPSILON);
            let weight = material.albedo * (1.0 - material.metallic) / pdf;

            let next = Ray::with_ior(hit.point + n * RAY_OFFSET, wi, ray.current_ior);
            weight.component_mul(&self.trace_ray(scene, &next, depth - 1, false, rng))
        }
    }

    /// Dielectric interface branch: Fresnel decides between a rough GGX
    /// reflection and refraction into the other medium.
    #[allow(clippy::too_many_arguments)]
    fn sample_interface(
        &self,
        scene: &Scene,
        ray: &Ray,
        hit: &HitRecord,
        frame: &OrthonormalFrame,
        alpha: FloatType,
        p_transmission: FloatType,
        depth: u32,
        rng: &mut impl Rng,
    ) -> LinearRgb {
        let material = &hit.material;
        let n = hit.normal.into_inner();
        let wo = -ray.direction.into_inner();

        let eta_i = ray.current_ior;
        let eta_t = if hit.front_face { material.ior } else { 1.0 };
        let eta = eta_i / eta_t;

        let cos_i = wo.dot(&n).clamp(0.0, 1.0);
        let r0 = ((eta_i - eta_t) / (eta_i + eta_t)).powi(2);
        let f_interface = r0 + (1.0 - r0) * (1.0 - cos_i).powi(5);
        let total_internal_reflection = eta * eta * (1.0 - cos_i * cos_i) > 1.0;

        // Stage B, reflect vs refract coin
        let p_reflect = if total_internal_reflection {
            1.0
        } else {
            f_interface
        };

        if rng.random::<FloatType>() < p_reflect {
            let f0 = LinearRgb::new(0.04, 0.04, 0.04).lerp(&material.albedo, material.metallic);
            let half = frame.to_world(&sample_ggx_half(alpha, rng));
            let wi = reflect(&wo, &half);
            if wi.dot(&n) <= 0.0 {
                return LinearRgb::zeros();
            }

            let pdf = (p_transmission * p_reflect).max(PDF_EPSILON);
            let weight = microfacet_weight(&f0, alpha, &wo, &wi, &half, &n) / pdf;

            let next = Ray::with_ior(hit.point + n * RAY_OFFSET, wi, ray.current_ior);
            weight.component_mul(&self.trace_ray(scene, &next, depth - 1, false, rng))
        } else {
            let wi = refract(&ray.direction.into_inner(), &n, eta, cos_i);

            let pdf = (p_transmission * (1.0 - p_reflect)).max(PDF_EPSILON);
            let weight = (1.0 - f_interface) / pdf;

            // Offset along the outgoing direction: the refracted ray starts
            // on the far side of the surface
            let next = Ray::with_ior(hit.point + wi * RAY_OFFSET, wi, eta_t);
            self.trace_ray(scene, &next, depth - 1, false, rng) * weight
        }
    }
}

impl Default for PathTracer {
    fn default() -> PathTracer {
        PathTracer {
            background: LinearRgb::new(0.2, 0.2, 0.2),
        }
    }
}

/// Tangent frame around a shading normal.
struct OrthonormalFrame {
    t: WorldVector,
    b: WorldVector,
    n: WorldVector,
}

impl OrthonormalFrame {
    /// Derives the tangent from whichever reference axis is not parallel to
    /// the normal.
    fn around(n: &WorldVector) -> OrthonormalFrame {
        let reference = if n.z.abs() < 0.999 {
            WorldVector::z()
        } else {
            WorldVector::x()
        };
        let t = reference.cross(n).normalize();
        let b = n.cross(&t);
        OrthonormalFrame { t, b, n: *n }
    }

    fn to_world(&self, local: &WorldVector) -> WorldVector {
        self.t * local.x + self.b * local.y + self.n * local.z
    }
}

/// Fresnel-Schlick reflectance.
fn schlick(f0: &LinearRgb, cos_theta: FloatType) -> LinearRgb {
    let one = LinearRgb::new(1.0, 1.0, 1.0);
    f0 + (one - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}

/// Mirror reflection of `wo` across the half-vector.
fn reflect(wo: &WorldVector, half: &WorldVector) -> WorldVector {
    half * (2.0 * wo.dot(half)) - wo
}

/// Refraction of the incoming direction `d` at a surface with normal `n`,
/// `eta = eta_i / eta_t`. The caller has already ruled out total internal
/// reflection.
fn refract(d: &WorldVector, n: &WorldVector, eta: FloatType, cos_i: FloatType) -> WorldVector {
    let perpendicular = (d + n * cos_i) * eta;
    let parallel = -n * (1.0 - perpendicular.norm_squared()).max(0.0).sqrt();
    perpendicular + parallel
}

/// Samples a GGX half-vector in the local frame (z up) from two uniforms:
/// `phi = 2 pi u1`, `tan^2 theta = alpha^2 u2 / (1 - u2)`.
fn sample_ggx_half(alpha: FloatType, rng: &mut impl Rng) -> WorldVector {
    let u1: FloatType = rng.random();
    let u2: FloatType = rng.random();

    let phi = 2.0 * std::f32::consts::PI * u1;
    let tan2_theta = alpha * alpha * u2 / (1.0 - u2).max(1e-8);
    let cos_theta = 1.0 / (1.0 + tan2_theta).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    WorldVector::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Cosine-weighted hemisphere sample in the local frame (z up).
fn sample_cosine_hemisphere(rng: &mut impl Rng) -> WorldVector {
    let u1: FloatType = rng.random();
    let u2: FloatType = rng.random();

    let r = u1.sqrt();
    let phi = 2.0 * std::f32::consts::PI * u2;
    WorldVector::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt())
}

/// Single-sample microfacet BRDF estimate for a GGX reflection:
/// `F * G * cos_vh / (cos_no * cos_nh)` with separable Smith shadowing.
fn microfacet_weight(
    f0: &LinearRgb,
    alpha: FloatType,
    wo: &WorldVector,
    wi: &WorldVector,
    half: &WorldVector,
    n: &WorldVector,
) -> LinearRgb {
    let cos_no = wo.dot(n).max(0.0);
    let cos_ni = wi.dot(n).max(0.0);
    let cos_nh = half.dot(n).max(0.0);
    let cos_vh = wo.dot(half).max(0.0);

    if cos_no <= 0.0 || cos_nh <= 0.0 {
        return LinearRgb::zeros();
    }

    let g = smith_g1(cos_no, alpha) * smith_g1(cos_ni, alpha);
    schlick(f0, cos_vh) * (g * cos_vh / (cos_no * cos_nh))
}

/// One-sided Smith masking term for GGX.
fn smith_g1(cos_theta: FloatType, alpha: FloatType) -> FloatType {
    if cos_theta <= 0.0 {
        return 0.0;
    }
    let tan2_theta = (1.0 - cos_theta * cos_theta) / (cos_theta * cos_theta);
    2.0 / (1.0 + (1.0 + alpha * alpha * tan2_theta).sqrt())
}
