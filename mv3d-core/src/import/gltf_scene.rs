//! glTF 2.0 importer.
//!
//! The node hierarchy of the default scene is kept as is. Each mesh primitive
//! becomes its own [`SceneMesh`], so a node referencing a glTF mesh ends up
//! referencing one scene mesh per primitive. Images are not decoded here:
//! external images turn into texture paths and buffer-view images into
//! [`EmbeddedTexture`]s addressed as `*N`.

use std::path::Path;

use fxhash::FxHashMap;
use glam::{Mat4, Vec2, Vec3, Vec4};
use gltf::{buffer, image::Source, mesh::Mode};

use crate::{
    error::ImportError,
    material::TextureKind,
    scene::{EmbeddedTexture, Face, ImportedScene, SceneMaterial, SceneMesh, SceneNode},
};

/// Imports a `.gltf` or `.glb` file. External buffers are resolved relative
/// to the file.
pub fn import(path: &Path) -> Result<ImportedScene, ImportError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)?;
    build_scene(super::root_name(path), &document, &buffers)
}

struct SceneBuilder<'a> {
    scene: ImportedScene,
    buffers: &'a [buffer::Data],
    /// glTF image index to embedded texture index.
    embedded_ids: FxHashMap<usize, usize>,
    /// glTF mesh index to the scene meshes made from its primitives.
    mesh_ids: FxHashMap<usize, Vec<usize>>,
}

fn build_scene(
    name: String,
    document: &gltf::Document,
    buffers: &[buffer::Data],
) -> Result<ImportedScene, ImportError> {
    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(ImportError::NoScene)?;

    let mut builder = SceneBuilder {
        scene: ImportedScene::new(name),
        buffers,
        embedded_ids: FxHashMap::default(),
        mesh_ids: FxHashMap::default(),
    };

    for material in document.materials() {
        let converted = builder.convert_material(&material);
        builder.scene.materials.push(converted);
    }
    for mesh in document.meshes() {
        builder.convert_mesh(&mesh);
    }

    let children: Vec<SceneNode> = gltf_scene
        .nodes()
        .map(|node| builder.convert_node(&node))
        .collect();
    builder.scene.root.children = children;

    Ok(builder.scene)
}

impl SceneBuilder<'_> {
    fn convert_node(&self, node: &gltf::Node<'_>) -> SceneNode {
        let mut converted = SceneNode::new(
            node.name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node{}", node.index())),
        );
        converted.transform = Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            if let Some(ids) = self.mesh_ids.get(&mesh.index()) {
                converted.meshes.extend_from_slice(ids);
            }
        }
        converted.children = node
            .children()
            .map(|child| self.convert_node(&child))
            .collect();
        converted
    }

    fn convert_mesh(&mut self, mesh: &gltf::Mesh<'_>) {
        let mut ids = Vec::new();
        for primitive in mesh.primitives() {
            let name = match mesh.name() {
                Some(name) => format!("{name}.{}", primitive.index()),
                None => format!("mesh{}.{}", mesh.index(), primitive.index()),
            };
            match self.convert_primitive(name, &primitive) {
                Some(converted) => {
                    ids.push(self.scene.meshes.len());
                    self.scene.meshes.push(converted);
                }
                None => log::warn!(
                    "Skipping primitive {} of mesh {}: mode {:?} is not supported",
                    primitive.index(),
                    mesh.index(),
                    primitive.mode()
                ),
            }
        }
        self.mesh_ids.insert(mesh.index(), ids);
    }

    fn convert_primitive(&self, name: String, primitive: &gltf::Primitive<'_>) -> Option<SceneMesh> {
        let reader = primitive.reader(|buffer| self.buffers.get(buffer.index()).map(|d| &d.0[..]));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .map(|iter| iter.map(Vec3::from).collect())
            .unwrap_or_default();
        let vertex_count = positions.len();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertex_count as u32).collect(),
        };
        let faces = faces_for_mode(primitive.mode(), &indices)?;

        let normals: Option<Vec<Vec3>> = reader
            .read_normals()
            .map(|iter| iter.map(Vec3::from).collect());
        // glTF puts the texture origin top-left, scenes keep it bottom-left.
        let tex_coords: Option<Vec<Vec2>> = reader.read_tex_coords(0).map(|coords| {
            coords
                .into_f32()
                .map(|[u, v]| Vec2::new(u, 1.0 - v))
                .collect()
        });

        let (tangents, bitangents) = match (reader.read_tangents(), normals.as_ref()) {
            (Some(tangents), Some(normals)) => {
                let tangents: Vec<Vec4> = tangents.map(Vec4::from).collect();
                let bitangents: Vec<Vec3> = tangents
                    .iter()
                    .zip(normals)
                    .map(|(t, n)| n.cross(t.truncate()) * t.w)
                    .collect();
                (
                    Some(tangents.iter().map(|t| t.truncate()).collect()),
                    Some(bitangents),
                )
            }
            _ => (None, None),
        };

        Some(SceneMesh {
            name,
            positions,
            normals,
            tex_coords,
            tangents,
            bitangents,
            faces,
            material_index: primitive.material().index(),
        })
    }

    fn convert_material(&mut self, material: &gltf::Material<'_>) -> SceneMaterial {
        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material{}", material.index().unwrap_or_default()));
        let mut converted = SceneMaterial::new(name);

        let slots = [
            (
                TextureKind::Diffuse,
                material
                    .pbr_metallic_roughness()
                    .base_color_texture()
                    .map(|info| info.texture()),
            ),
            (
                TextureKind::Height,
                material.normal_texture().map(|normal| normal.texture()),
            ),
            (
                TextureKind::Ambient,
                material.occlusion_texture().map(|occlusion| occlusion.texture()),
            ),
        ];
        for (kind, texture) in slots {
            if let Some(path) = texture.and_then(|texture| self.texture_path(&texture)) {
                converted.add_texture(kind, path);
            }
        }
        converted
    }

    fn texture_path(&mut self, texture: &gltf::Texture<'_>) -> Option<String> {
        let image = texture.source();
        match image.source() {
            Source::Uri { uri, .. } if uri.starts_with("data:") => {
                log::warn!("Skipping data URI image {}", image.index());
                None
            }
            Source::Uri { uri, .. } => match urlencoding::decode(uri) {
                Ok(decoded) => Some(decoded.into_owned()),
                Err(e) => {
                    log::warn!("Skipping image {} with undecodable URI {uri}: {e}", image.index());
                    None
                }
            },
            Source::View { view, mime_type } => {
                if let Some(&id) = self.embedded_ids.get(&image.index()) {
                    return Some(format!("*{id}"));
                }
                let buffer = self.buffers.get(view.buffer().index())?;
                let data = buffer.0.get(view.offset()..view.offset() + view.length())?;
                let id = self.scene.embedded_textures.len();
                self.scene.embedded_textures.push(EmbeddedTexture {
                    data: data.to_vec(),
                    format_hint: Some(mime_type.to_string()),
                });
                self.embedded_ids.insert(image.index(), id);
                Some(format!("*{id}"))
            }
        }
    }
}

/// Turns a primitive's index list into triangle faces. Returns `None` for
/// point and line primitives.
fn faces_for_mode(mode: Mode, indices: &[u32]) -> Option<Vec<Face>> {
    let faces = match mode {
        Mode::Triangles => indices
            .chunks_exact(3)
            .map(|tri| Face {
                indices: tri.to_vec(),
            })
            .collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                // Every other triangle of a strip is wound the other way.
                if i % 2 == 0 {
                    Face::from([w[0], w[1], w[2]])
                } else {
                    Face::from([w[1], w[0], w[2]])
                }
            })
            .collect(),
        Mode::TriangleFan => match indices.split_first() {
            Some((&first, rest)) => rest
                .windows(2)
                .map(|w| Face::from([first, w[0], w[1]]))
                .collect(),
            None => Vec::new(),
        },
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => return None,
    };
    Some(faces)
}
