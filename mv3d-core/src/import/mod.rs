//! Model importers.
//!
//! [`import_file`] picks an importer from the file extension, converts the file
//! into an [`ImportedScene`] and runs the post-processing steps selected in
//! [`ImportOptions`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::ImportError, postprocess, scene::ImportedScene};

pub mod gltf_scene;
pub mod wavefront;

/// Post-processing flags for an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Split polygons into triangles.
    pub triangulate: bool,
    /// Mirror V texture coordinates for top-row-first images.
    pub flip_uvs: bool,
    /// Derive tangents and bitangents for meshes that do not carry them.
    pub calc_tangent_space: bool,
    /// Derive smooth normals for meshes that do not carry them.
    pub gen_normals: bool,
    /// Bake node transforms into the vertex data while flattening.
    pub pre_transform: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            flip_uvs: true,
            calc_tangent_space: true,
            gen_normals: true,
            pre_transform: false,
        }
    }
}

/// The file formats understood by [`import_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Obj,
    Gltf,
}

impl ModelFormat {
    /// Guesses the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("obj") => Ok(ModelFormat::Obj),
            Some("gltf" | "glb") => Ok(ModelFormat::Gltf),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

/// Imports a model file and post-processes it.
pub fn import_file(path: &Path, options: &ImportOptions) -> Result<ImportedScene, ImportError> {
    let start = std::time::Instant::now();

    let mut scene = match ModelFormat::from_path(path)? {
        ModelFormat::Obj => wavefront::import(path)?,
        ModelFormat::Gltf => gltf_scene::import(path)?,
    };
    postprocess::apply(&mut scene, options);

    log::info!(
        "Imported {} ({} nodes, {} meshes, {} materials) in {:?}",
        path.display(),
        scene.root.node_count(),
        scene.mesh_count(),
        scene.materials.len(),
        start.elapsed()
    );

    Ok(scene)
}

/// Name given to the root node of an imported file.
pub(crate) fn root_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
}
