use std::path::Path;

use itertools::Itertools as _;
use thiserror::Error;

use crate::assets::{AlphaMode, EmbeddedImage, Face, FaceVertex, MaterialGroup, MeshData};
use crate::geometry::{TexturePoint, WorldPoint, WorldVector};
use crate::material::LinearRgb;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to import glTF: {0}")]
    Import(#[from] gltf::Error),

    #[error("primitive {primitive} of mesh {mesh} is not a triangle list")]
    NonTriangles { mesh: usize, primitive: usize },

    #[error("primitive {primitive} of mesh {mesh} has no POSITION attribute")]
    MissingPositions { mesh: usize, primitive: usize },

    #[error("primitive {primitive} of mesh {mesh} is not indexed geometry")]
    MissingIndices { mesh: usize, primitive: usize },

    #[error("image {index} is not 8-bit ({format:?})")]
    UnsupportedImageFormat {
        index: usize,
        format: gltf::image::Format,
    },

    #[error("no triangle faces found in the file")]
    NoFaces,
}

pub fn load(path: &Path) -> Result<MeshData, AssetError> {
    let (document, buffers, images) = gltf::import(path)?;

    let images = images
        .into_iter()
        .enumerate()
        .map(|(index, data)| convert_image(index, data))
        .collect::<Result<Vec<_>, _>>()?;

    let material_groups = document.materials().map(convert_material).collect::<Vec<_>>();

    let mut faces = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let location = (mesh.index(), primitive.index());
            read_faces(&primitive, &buffers, location, &mut faces)?;
        }
    }
    if faces.is_empty() {
        return Err(AssetError::NoFaces);
    }

    log::debug!(
        "loaded {:?}: {} faces, {} material groups, {} images",
        path,
        faces.len(),
        material_groups.len(),
        images.len()
    );

    Ok(MeshData {
        faces,
        material_groups,
        images,
    })
}

fn read_faces(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    (mesh, prim): (usize, usize),
    faces: &mut Vec<Face>,
) -> Result<(), AssetError> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return Err(AssetError::NonTriangles {
            mesh,
            primitive: prim,
        });
    }

    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or(AssetError::MissingPositions {
            mesh,
            primitive: prim,
        })?
        .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let texcoords: Option<Vec<[f32; 2]>> =
        reader.read_tex_coords(0).map(|t| t.into_f32().collect());

    let indices = reader.read_indices().ok_or(AssetError::MissingIndices {
        mesh,
        primitive: prim,
    })?;
    let material_group = primitive.material().index().map(|i| i as u32);

    for (i0, i1, i2) in indices.into_u32().tuples() {
        let corners = [i0 as usize, i1 as usize, i2 as usize];

        let p = corners.map(|i| WorldPoint::from(positions[i]));
        // Faces without shading normals get their geometric one
        let face_normal = (p[1] - p[0]).cross(&(p[2] - p[0]));
        let vertex = |corner: usize| FaceVertex {
            position: p[corner],
            normal: normals
                .as_ref()
                .map_or(face_normal, |n| WorldVector::from(n[corners[corner]])),
            texcoord: texcoords
                .as_ref()
                .map_or_else(TexturePoint::origin, |t| {
                    TexturePoint::from(t[corners[corner]])
                }),
        };

        faces.push(Face {
            a: vertex(0),
            b: vertex(1),
            c: vertex(2),
            material_group,
        });
    }

    Ok(())
}

fn convert_material(material: gltf::Material) -> MaterialGroup {
    let pbr = material.pbr_metallic_roughness();
    let image_of = |texture: gltf::texture::Texture| texture.source().index();

    let mut group = MaterialGroup {
        base_colour_factor: pbr.base_color_factor().into(),
        metallic_factor: pbr.metallic_factor(),
        roughness_factor: pbr.roughness_factor(),
        emissive_factor: LinearRgb::from(material.emissive_factor())
            * material.emissive_strength().unwrap_or(1.0),
        alpha_mode: match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        alpha_cutoff: material.alpha_cutoff().unwrap_or(0.5),
        double_sided: material.double_sided(),
        base_colour_texture: pbr.base_color_texture().map(|t| image_of(t.texture())),
        metallic_roughness_texture: pbr
            .metallic_roughness_texture()
            .map(|t| image_of(t.texture())),
        ..MaterialGroup::default()
    };

    if let Some(normal) = material.normal_texture() {
        group.normal_scale = normal.scale();
        group.normal_texture = Some(image_of(normal.texture()));
    }
    if let Some(occlusion) = material.occlusion_texture() {
        group.occlusion_strength = occlusion.strength();
    }
    if let Some(emissive) = material.emissive_texture() {
        group.emissive_texture = Some(image_of(emissive.texture()));
    }
    if let Some(transmission) = material.transmission() {
        group.transmission_factor = transmission.transmission_factor();
        group.transmission_texture = transmission
            .transmission_texture()
            .map(|t| image_of(t.texture()));
    }
    if let Some(ior) = material.ior() {
        group.ior = ior;
    }

    group
}

fn convert_image(index: usize, data: gltf::image::Data) -> Result<EmbeddedImage, AssetError> {
    use gltf::image::Format;

    let channels = match data.format {
        Format::R8 => 1,
        Format::R8G8 => 2,
        Format::R8G8B8 => 3,
        Format::R8G8B8A8 => 4,
        format => return Err(AssetError::UnsupportedImageFormat { index, format }),
    };

    Ok(EmbeddedImage {
        width: data.width,
        height: data.height,
        channels,
        data: data.pixels,
    })
}
