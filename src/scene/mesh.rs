use std::path::Path;
use std::sync::Arc;

use assert2::assert;
use bon::bon;
use nalgebra::{Matrix3, Matrix4, Translation3, Unit, Vector3};

use crate::assets::{AssetError, Face, MaterialGroup, MeshData};
use crate::geometry::{
    FloatType, HitRecord, Ray, TexturePoint, WorldPoint, WorldVector, euler_rotation_deg,
};
use crate::material::{LinearRgb, Material};
use crate::scene::mesh_bvh::{DEFAULT_LEAF_THRESHOLD, FaceHit, MeshBvh};

/// Immutable mesh asset: the pre-parsed face/material/image table plus the
/// acceleration structure built over it. Loaded once and shared by any
/// number of instances through an `Arc`.
pub struct MeshAsset {
    data: MeshData,
    bvh: MeshBvh,
}

impl MeshAsset {
    pub fn new(data: MeshData) -> MeshAsset {
        MeshAsset::with_leaf_threshold(data, DEFAULT_LEAF_THRESHOLD)
    }

    pub fn with_leaf_threshold(data: MeshData, leaf_threshold: u32) -> MeshAsset {
        let bvh = MeshBvh::build(&data.faces, leaf_threshold);
        MeshAsset { data, bvh }
    }

    pub fn from_gltf(path: impl AsRef<Path>) -> Result<MeshAsset, AssetError> {
        Ok(MeshAsset::new(MeshData::from_gltf(path)?))
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }
}

/// One placement of a shared [`MeshAsset`] in the scene: translation, Euler
/// rotation and non-uniform scale. The instance matrices are cached and
/// recomputed by the transform setters.
pub struct MeshInstance {
    asset: Arc<MeshAsset>,

    translation: WorldVector,
    rotation_deg: WorldVector,
    scale: WorldVector,

    world_from_object: Matrix4<FloatType>,
    object_from_world: Matrix4<FloatType>,
    /// Inverse-transpose of the instance linear part, for normals
    normal_matrix: Matrix3<FloatType>,
}

#[bon]
impl MeshInstance {
    #[builder]
    pub fn new(
        asset: Arc<MeshAsset>,
        translation: Option<WorldVector>,
        rotation_deg: Option<WorldVector>,
        scale: Option<WorldVector>,
    ) -> MeshInstance {
        let mut instance = MeshInstance {
            asset,
            translation: translation.unwrap_or_else(WorldVector::zeros),
            rotation_deg: rotation_deg.unwrap_or_else(WorldVector::zeros),
            scale: scale.unwrap_or_else(|| WorldVector::new(1.0, 1.0, 1.0)),
            world_from_object: Matrix4::identity(),
            object_from_world: Matrix4::identity(),
            normal_matrix: Matrix3::identity(),
        };
        instance.recalculate_matrices();
        instance
    }
}

impl MeshInstance {
    pub fn asset(&self) -> &Arc<MeshAsset> {
        &self.asset
    }

    pub fn translation(&self) -> WorldVector {
        self.translation
    }

    pub fn set_translation(&mut self, translation: WorldVector) {
        self.translation = translation;
        self.recalculate_matrices();
    }

    pub fn rotation_deg(&self) -> WorldVector {
        self.rotation_deg
    }

    pub fn set_rotation_deg(&mut self, rotation_deg: WorldVector) {
        self.rotation_deg = rotation_deg;
        self.recalculate_matrices();
    }

    pub fn scale(&self) -> WorldVector {
        self.scale
    }

    pub fn set_scale(&mut self, scale: WorldVector) {
        self.scale = scale;
        self.recalculate_matrices();
    }

    fn recalculate_matrices(&mut self) {
        assert!(self.scale.iter().all(|&s| s != 0.0));

        let rotation = euler_rotation_deg(&self.rotation_deg);
        self.world_from_object = Translation3::from(self.translation).to_homogeneous()
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale);

        let inv_scale = self.scale.map(|s| 1.0 / s);
        self.object_from_world = Matrix4::new_nonuniform_scaling(&inv_scale)
            * rotation.inverse().to_homogeneous()
            * Translation3::from(-self.translation).to_homogeneous();

        self.normal_matrix = self
            .object_from_world
            .fixed_view::<3, 3>(0, 0)
            .transpose();
    }

    /// Traverses the asset's BVH with the ray taken to object space.
    ///
    /// The object-space direction is renormalized; the normalization factor
    /// converts distances back to world units (`t_world = t_object / k`).
    pub fn intersect(&self, ray: &Ray, t_min: FloatType, t_max: FloatType) -> Option<HitRecord> {
        let origin_object = self.object_from_world.transform_point(&ray.origin);
        let dir_object = self.object_from_world.transform_vector(&ray.direction);

        let k = dir_object.norm();
        if k == 0.0 {
            return None;
        }
        let ray_object = Ray::new(origin_object, dir_object);

        let face_hit =
            self.asset
                .bvh
                .intersect(&self.asset.data, &ray_object, t_min * k, t_max * k)?;

        Some(self.shade_hit(ray, &face_hit, k))
    }

    /// Interpolates the hit attributes, applies the normal map and samples
    /// the material at the hit UV.
    fn shade_hit(&self, ray: &Ray, face_hit: &FaceHit, k: FloatType) -> HitRecord {
        let data = &self.asset.data;
        let face = &data.faces[face_hit.face_index as usize];
        let (u, v) = (face_hit.u, face_hit.v);

        let p_object = WorldPoint::from(face.interpolate(u, v, |vert| vert.position.coords));
        let uv = TexturePoint::from(face.interpolate(u, v, |vert| vert.texcoord.coords));

        let [a, b, c] = face.positions();
        let normal_geometric_object = (b - a).cross(&(c - a)).normalize();
        let mut normal_object = face
            .interpolate(u, v, |vert| vert.normal)
            .normalize();

        let group = face
            .material_group
            .map(|index| &data.material_groups[index as usize]);

        if let Some(group) = group {
            if let Some(texture) = group.normal_texture {
                normal_object = apply_normal_map(
                    face,
                    normal_object,
                    data.images[texture].sample_nearest(uv).xyz(),
                    group.normal_scale,
                );
            }
        }

        let mut normal_world = (self.normal_matrix * normal_object).normalize();
        let normal_geometric_world = (self.normal_matrix * normal_geometric_object).normalize();

        // The geometric face orientation decides the side; the shading
        // normal only flips to match it
        let front_face = ray.direction.dot(&normal_geometric_world) < 0.0;
        if !front_face {
            normal_world = -normal_world;
        }

        let material = group.map_or_else(Material::default, |g| evaluate_material(g, data, uv));

        HitRecord {
            t: face_hit.t / k,
            point: self.world_from_object.transform_point(&p_object),
            normal: Unit::new_unchecked(normal_world),
            front_face,
            material,
        }
    }
}

/// Takes a tangent-space normal map sample to object space through the TBN
/// frame derived from the triangle's UV layout.
fn apply_normal_map(
    face: &Face,
    normal: WorldVector,
    sample: Vector3<FloatType>,
    normal_scale: FloatType,
) -> WorldVector {
    let dp1 = face.b.position - face.a.position;
    let dp2 = face.c.position - face.a.position;
    let duv1 = face.b.texcoord - face.a.texcoord;
    let duv2 = face.c.texcoord - face.a.texcoord;

    let det = duv1.x * duv2.y - duv1.y * duv2.x;
    let (tangent, bitangent) = if det.abs() > 1e-8 {
        let r = 1.0 / det;
        let t = (dp1 * duv2.y - dp2 * duv1.y) * r;
        // Gram-Schmidt, tangent orthogonal to the shading normal
        let t = (t - normal * normal.dot(&t)).normalize();
        (t, normal.cross(&t).normalize())
    } else {
        // Degenerate UVs, any orthonormal basis around the normal works
        let up = if normal.z.abs() < 0.999 {
            WorldVector::z()
        } else {
            WorldVector::x()
        };
        let t = up.cross(&normal).normalize();
        (t, normal.cross(&t))
    };

    // Unpack [0,1] texels to [-1,1]; glTF normal maps point +Z outward and
    // normal_scale applies to x/y only
    let mut n_tangent = sample * 2.0 - Vector3::new(1.0, 1.0, 1.0);
    n_tangent.x *= normal_scale;
    n_tangent.y *= normal_scale;
    let n_tangent = n_tangent.normalize();

    (tangent * n_tangent.x + bitangent * n_tangent.y + normal * n_tangent.z).normalize()
}

/// Evaluates the PBR material group at the hit UV.
fn evaluate_material(group: &MaterialGroup, data: &MeshData, uv: TexturePoint) -> Material {
    let sample = |texture: Option<usize>| texture.map(|i| data.images[i].sample_nearest(uv));

    let mut base = group.base_colour_factor;
    if let Some(texel) = sample(group.base_colour_texture) {
        base.component_mul_assign(&texel);
    }

    let mut roughness = group.roughness_factor;
    let mut metallic = group.metallic_factor;
    if let Some(texel) = sample(group.metallic_roughness_texture) {
        // glTF metallic-roughness packing: G = roughness, B = metallic
        roughness = (texel.y * roughness).clamp(0.001, 1.0);
        metallic = (texel.z * metallic).clamp(0.0, 1.0);
    }

    let mut emissive = group.emissive_factor;
    if let Some(texel) = sample(group.emissive_texture) {
        emissive.component_mul_assign(&texel.xyz());
    }

    let mut transmission = group.transmission_factor;
    if let Some(texel) = sample(group.transmission_texture) {
        transmission *= texel.x;
    }

    Material {
        albedo: LinearRgb::new(base.x, base.y, base.z),
        roughness,
        metallic,
        emission_colour: emissive,
        emission_strength: if emissive != LinearRgb::zeros() { 1.0 } else { 0.0 },
        ior: group.ior,
        transmission: transmission.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{EmbeddedImage, FaceVertex};
    use assert2::assert;

    fn triangle_asset() -> Arc<MeshAsset> {
        let vertex = |p: [FloatType; 3]| FaceVertex {
            position: p.into(),
            normal: WorldVector::z(),
            texcoord: [p[0], p[1]].into(),
        };
        Arc::new(MeshAsset::new(MeshData {
            faces: vec![Face {
                a: vertex([0.0, 0.0, -1.0]),
                b: vertex([1.0, 0.0, -1.0]),
                c: vertex([0.0, 1.0, -1.0]),
                material_group: None,
            }],
            material_groups: Vec::new(),
            images: Vec::new(),
        }))
    }

    #[test]
    fn untransformed_instance_matches_asset_space() {
        let instance = MeshInstance::builder().asset(triangle_asset()).build();
        let ray = Ray::new([0.25, 0.25, 0.0].into(), [0.0, 0.0, -1.0].into());

        let hit = instance
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");
        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!(hit.front_face);
        assert!((hit.normal.into_inner() - WorldVector::z()).norm() < 1e-5);
        assert!((hit.point - WorldPoint::new(0.25, 0.25, -1.0)).norm() < 1e-5);
    }

    #[test]
    fn translation_moves_the_mesh() {
        let instance = MeshInstance::builder()
            .asset(triangle_asset())
            .translation([0.0, 0.0, -4.0].into())
            .build();
        let ray = Ray::new([0.25, 0.25, 0.0].into(), [0.0, 0.0, -1.0].into());

        let hit = instance
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");
        assert!((hit.t - 5.0).abs() < 1e-5);
    }

    #[test]
    fn nonuniform_scale_keeps_world_distances() {
        // Scaling the asset by 0.5 halves the triangle, the ray through the
        // middle of the shrunk triangle still reports world-space t
        let instance = MeshInstance::builder()
            .asset(triangle_asset())
            .scale([0.5, 0.5, 2.0].into())
            .build();
        let ray = Ray::new([0.1, 0.1, 0.0].into(), [0.0, 0.0, -1.0].into());

        let hit = instance
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!((hit.point.z - -2.0).abs() < 1e-5);
    }

    #[test]
    fn back_face_flips_shading_normal() {
        let instance = MeshInstance::builder().asset(triangle_asset()).build();
        let ray = Ray::new([0.25, 0.25, -2.0].into(), [0.0, 0.0, 1.0].into());

        let hit = instance
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");
        assert!(!hit.front_face);
        assert!(hit.normal.dot(&ray.direction) < 0.0);
    }

    #[test]
    fn rotated_instance_rotates_normals() {
        let instance = MeshInstance::builder()
            .asset(triangle_asset())
            .rotation_deg([0.0, 90.0, 0.0].into())
            .build();
        // The yaw takes the asset's +z normal to +x and its plane to x = -1
        let ray = Ray::new([5.0, 0.25, -0.25].into(), [-1.0, 0.0, 0.0].into());

        let hit = instance
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");
        assert!((hit.t - 6.0).abs() < 1e-4);
        assert!((hit.normal.into_inner() - WorldVector::x()).norm() < 1e-4);
    }

    #[test]
    fn material_group_is_sampled_at_hit_uv() {
        let vertex = |p: [FloatType; 3]| FaceVertex {
            position: p.into(),
            normal: WorldVector::z(),
            texcoord: [p[0], p[1]].into(),
        };
        let data = MeshData {
            faces: vec![Face {
                a: vertex([0.0, 0.0, -1.0]),
                b: vertex([1.0, 0.0, -1.0]),
                c: vertex([0.0, 1.0, -1.0]),
                material_group: Some(0),
            }],
            material_groups: vec![MaterialGroup {
                base_colour_texture: Some(0),
                transmission_factor: 0.5,
                ior: 1.33,
                ..MaterialGroup::default()
            }],
            // 2x1 texture: left texel red, right texel green
            images: vec![EmbeddedImage {
                width: 2,
                height: 1,
                channels: 3,
                data: vec![255, 0, 0, 0, 255, 0],
            }],
        };
        let instance = MeshInstance::builder()
            .asset(Arc::new(MeshAsset::new(data)))
            .build();

        let ray = Ray::new([0.1, 0.1, 0.0].into(), [0.0, 0.0, -1.0].into());
        let hit = instance
            .intersect(&ray, 1e-4, FloatType::INFINITY)
            .expect("We should have a hit!");

        assert!(hit.material.albedo == LinearRgb::new(1.0, 0.0, 0.0));
        assert!(hit.material.transmission == 0.5);
        assert!(hit.material.ior == 1.33);
    }
}
