mod gltf_import;

use nalgebra::Vector4;

pub use gltf_import::AssetError;

use crate::geometry::{FloatType, TexturePoint, WorldPoint, WorldVector};
use crate::material::LinearRgb;

/// One vertex of a mesh face: position, shading normal and UV, all in the
/// asset's local space.
#[derive(Copy, Clone, Debug)]
pub struct FaceVertex {
    pub position: WorldPoint,
    pub normal: WorldVector,
    pub texcoord: TexturePoint,
}

/// One triangle of a mesh asset.
#[derive(Copy, Clone, Debug)]
pub struct Face {
    pub a: FaceVertex,
    pub b: FaceVertex,
    pub c: FaceVertex,
    /// Index into the asset's material group table
    pub material_group: Option<u32>,
}

impl Face {
    pub fn positions(&self) -> [&WorldPoint; 3] {
        [&self.a.position, &self.b.position, &self.c.position]
    }

    /// Barycentric interpolation over the face with weights `(1-u-v, u, v)`.
    pub fn interpolate<T, F>(&self, u: FloatType, v: FloatType, select: F) -> T
    where
        T: std::ops::Add<Output = T>,
        T: std::ops::Mul<FloatType, Output = T>,
        F: Fn(&FaceVertex) -> T,
    {
        let w = 1.0 - u - v;
        select(&self.a) * w + select(&self.b) * u + select(&self.c) * v
    }
}

/// How the base colour alpha affects visibility, following the glTF alpha
/// modes. `Blend` faces are treated as fully visible.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// PBR metallic-roughness material group of a mesh asset.
///
/// Texture fields index into the asset's embedded image set.
#[derive(Clone, Debug)]
pub struct MaterialGroup {
    pub base_colour_factor: Vector4<FloatType>,
    pub metallic_factor: FloatType,
    pub roughness_factor: FloatType,
    pub emissive_factor: LinearRgb,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: FloatType,
    pub double_sided: bool,
    pub normal_scale: FloatType,
    pub occlusion_strength: FloatType,
    pub transmission_factor: FloatType,
    pub ior: FloatType,

    pub base_colour_texture: Option<usize>,
    pub metallic_roughness_texture: Option<usize>,
    pub normal_texture: Option<usize>,
    pub emissive_texture: Option<usize>,
    pub transmission_texture: Option<usize>,
}

impl Default for MaterialGroup {
    fn default() -> MaterialGroup {
        MaterialGroup {
            base_colour_factor: Vector4::new(1.0, 1.0, 1.0, 1.0),
            metallic_factor: 0.0,
            roughness_factor: 1.0,
            emissive_factor: LinearRgb::zeros(),
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            transmission_factor: 0.0,
            ior: 1.5,
            base_colour_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            emissive_texture: None,
            transmission_texture: None,
        }
    }
}

/// Raw 8-bit image embedded in a mesh asset.
#[derive(Clone, Debug)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    /// e.g. 3 = RGB, 4 = RGBA
    pub channels: u32,
    pub data: Vec<u8>,
}

impl EmbeddedImage {
    /// Nearest-neighbour sample with repeat wrapping.
    ///
    /// Missing channels read as zero, except alpha which reads as one.
    /// Invalid or empty images sample as opaque white.
    pub fn sample_nearest(&self, uv: TexturePoint) -> Vector4<FloatType> {
        if self.width == 0 || self.height == 0 || self.channels == 0 || self.data.is_empty() {
            return Vector4::new(1.0, 1.0, 1.0, 1.0);
        }

        let wrap = |c: FloatType| {
            let f = c.fract();
            if f < 0.0 { f + 1.0 } else { f }
        };
        let x = ((wrap(uv.x) * self.width as FloatType) as u32).min(self.width - 1);
        let y = ((wrap(uv.y) * self.height as FloatType) as u32).min(self.height - 1);

        let channels = self.channels as usize;
        let index = (y * self.width + x) as usize * channels;
        let get = |c: usize| {
            if c < channels {
                self.data[index + c] as FloatType / 255.0
            } else if c == 3 {
                1.0
            } else {
                0.0
            }
        };
        Vector4::new(get(0), get(1), get(2), get(3))
    }
}

/// Pre-parsed mesh table: flat triangle list, material groups and embedded
/// images, exactly as delivered by the asset parser.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub faces: Vec<Face>,
    pub material_groups: Vec<MaterialGroup>,
    pub images: Vec<EmbeddedImage>,
}

impl MeshData {
    /// Loads the table from a `.gltf`/`.glb` file.
    pub fn from_gltf(path: impl AsRef<std::path::Path>) -> Result<MeshData, AssetError> {
        gltf_import::load(path.as_ref())
    }
}
