//! Wavefront OBJ/MTL importer built on `tobj`.
//!
//! Every OBJ object becomes a child of the root node referencing exactly one
//! mesh. Faces are kept with their original arity so triangulation stays a
//! post-processing decision.

use std::path::Path;

use glam::{Vec2, Vec3};

use crate::{
    error::ImportError,
    material::TextureKind,
    scene::{Face, ImportedScene, SceneMaterial, SceneMesh, SceneNode},
};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Imports an OBJ file, resolving its MTL libraries relative to the file.
pub fn import(path: &Path) -> Result<ImportedScene, ImportError> {
    let (models, materials) = tobj::load_obj(path, &load_options())?;
    Ok(build_scene(super::root_name(path), models, materials))
}

/// Imports OBJ source from a reader. `material_loader` resolves `mtllib`
/// statements.
pub fn import_buf<B, ML>(
    name: &str,
    reader: &mut B,
    material_loader: ML,
) -> Result<ImportedScene, ImportError>
where
    B: std::io::BufRead,
    ML: Fn(&Path) -> tobj::MTLLoadResult,
{
    let (models, materials) = tobj::load_obj_buf(reader, &load_options(), material_loader)?;
    Ok(build_scene(name.to_string(), models, materials))
}

fn build_scene(
    name: String,
    models: Vec<tobj::Model>,
    materials: Result<Vec<tobj::Material>, tobj::LoadError>,
) -> ImportedScene {
    let mut scene = ImportedScene::new(name);

    match materials {
        Ok(materials) => scene.materials = materials.iter().map(convert_material).collect(),
        Err(e) => log::warn!("Failed to load OBJ materials, continuing without them: {e}"),
    }

    for model in models {
        let mesh = convert_mesh(model.name.clone(), model.mesh);
        let material_count = scene.materials.len();
        let mesh = SceneMesh {
            material_index: mesh.material_index.filter(|&i| i < material_count),
            ..mesh
        };

        let mut node = SceneNode::new(model.name);
        node.meshes.push(scene.meshes.len());
        scene.meshes.push(mesh);
        scene.root.children.push(node);
    }

    scene
}

fn convert_mesh(name: String, mesh: tobj::Mesh) -> SceneMesh {
    let positions: Vec<Vec3> = mesh.positions.chunks_exact(3).map(Vec3::from_slice).collect();
    let vertex_count = positions.len();

    let normals = (mesh.normals.len() == vertex_count * 3 && vertex_count > 0)
        .then(|| mesh.normals.chunks_exact(3).map(Vec3::from_slice).collect());
    let tex_coords = (mesh.texcoords.len() == vertex_count * 2 && vertex_count > 0)
        .then(|| mesh.texcoords.chunks_exact(2).map(Vec2::from_slice).collect());

    // An empty arity list means every face is a triangle.
    let faces = if mesh.face_arities.is_empty() {
        mesh.indices
            .chunks_exact(3)
            .map(|tri| Face {
                indices: tri.to_vec(),
            })
            .collect()
    } else {
        let mut faces = Vec::with_capacity(mesh.face_arities.len());
        let mut start = 0;
        for &arity in &mesh.face_arities {
            let end = start + arity as usize;
            let Some(indices) = mesh.indices.get(start..end) else {
                break;
            };
            faces.push(Face {
                indices: indices.to_vec(),
            });
            start = end;
        }
        faces
    };

    log::debug!(
        "OBJ object '{name}': {vertex_count} vertices, {} faces",
        faces.len()
    );

    SceneMesh {
        name,
        positions,
        normals,
        tex_coords,
        tangents: None,
        bitangents: None,
        faces,
        material_index: mesh.material_id,
    }
}

fn convert_material(material: &tobj::Material) -> SceneMaterial {
    let mut converted = SceneMaterial::new(material.name.clone());
    let slots = [
        (TextureKind::Diffuse, &material.diffuse_texture),
        (TextureKind::Specular, &material.specular_texture),
        (TextureKind::Height, &material.normal_texture),
        (TextureKind::Ambient, &material.ambient_texture),
    ];
    for (kind, texture) in slots {
        if let Some(path) = texture.as_deref().and_then(texture_path) {
            converted.add_texture(kind, path);
        }
    }
    converted
}

/// Cleans an MTL map statement down to the file path, dropping any leading
/// options and their values.
fn texture_path(raw: &str) -> Option<String> {
    let mut tokens = raw.split_whitespace().peekable();
    while let Some(option) = tokens.next_if(|token| token.starts_with('-')) {
        // The first value is always taken, later ones only while numeric.
        let arity = option_arity(option);
        if tokens.next().is_none() {
            return None;
        }
        for _ in 1..arity {
            if tokens.next_if(|token| token.parse::<f32>().is_ok()).is_none() {
                break;
            }
        }
    }
    let path = tokens.collect::<Vec<_>>().join(" ").replace('\\', "/");
    (!path.is_empty()).then_some(path)
}

/// Most values an MTL map option takes.
fn option_arity(option: &str) -> usize {
    match option {
        "-o" | "-s" | "-t" => 3,
        "-mm" => 2,
        _ => 1,
    }
}
