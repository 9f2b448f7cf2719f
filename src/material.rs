use nalgebra::Vector3;

use crate::geometry::FloatType;

/// Linear RGB radiance or reflectance. Arithmetic on these values is
/// physically meaningful, unlike on gamma-encoded display values.
pub type LinearRgb = Vector3<FloatType>;

/// Shading parameters at a surface point.
///
/// The BSDF described by these is a weighted combination of a Lambertian
/// diffuse lobe, a GGX specular lobe and a dielectric transmission lobe; the
/// integrator picks one lobe per bounce.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    /// Base colour, linear RGB in [0,1]
    pub albedo: LinearRgb,
    pub roughness: FloatType,
    pub metallic: FloatType,
    /// Unbounded linear RGB; scaled by `emission_strength`
    pub emission_colour: LinearRgb,
    pub emission_strength: FloatType,
    /// Index of refraction, >= 1
    pub ior: FloatType,
    /// Fraction of light passing through the surface, in [0,1]
    pub transmission: FloatType,
}

impl Material {
    pub fn emission(&self) -> LinearRgb {
        self.emission_colour * self.emission_strength
    }
}

impl Default for Material {
    fn default() -> Material {
        Material {
            albedo: LinearRgb::new(1.0, 1.0, 1.0),
            roughness: 1.0,
            metallic: 0.0,
            emission_colour: LinearRgb::new(1.0, 1.0, 1.0),
            emission_strength: 0.0,
            ior: 1.5,
            transmission: 0.0,
        }
    }
}
