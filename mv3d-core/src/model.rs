//! Flattened, render-ready model data.
//!
//! [`Model::from_scene`] walks an [`ImportedScene`] depth-first and copies each
//! referenced mesh into an owned [`MeshData`] with interleaved vertices, a flat
//! index list and resolved textures. Texture loading goes through a
//! [`TextureLoader`], so this module never talks to the GPU itself.

use std::path::{Path, PathBuf};

use fxhash::{FxHashMap, FxHashSet};
use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::{
    error::ImportError,
    import::{ImportOptions, import_file},
    material::{SamplerBinding, TextureKind, sampler_bindings},
    scene::{EmbeddedTexture, ImportedScene, SceneMesh},
};

/// A single vertex as laid out in the GPU vertex buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct ModelVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

/// Where a texture's pixels come from.
#[derive(Debug, Clone, Copy)]
pub enum TextureSource<'a> {
    /// A file on disk, already joined with the model directory.
    File(&'a Path),
    Embedded(&'a EmbeddedTexture),
}

/// Turns texture sources into whatever the renderer binds.
pub trait TextureLoader {
    type Texture: Clone;

    /// Loads one texture. `kind` is the slot of the first material that
    /// references the path. Later slots reusing the path get the loaded
    /// texture back under their own kind, so a map shared between diffuse
    /// and specular is named for each slot it fills.
    fn load(
        &mut self,
        source: TextureSource<'_>,
        kind: TextureKind,
    ) -> Result<Self::Texture, ImportError>;
}

/// A texture attached to a mesh.
#[derive(Debug, Clone)]
pub struct MeshTexture<T> {
    pub texture: T,
    pub kind: TextureKind,
    /// Path as written in the material, used as the deduplication key.
    pub path: String,
}

/// One mesh ready for upload.
#[derive(Debug, Clone)]
pub struct MeshData<T> {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<MeshTexture<T>>,
}

impl<T> MeshData<T> {
    /// Texture units and sampler names for this mesh's textures.
    pub fn sampler_bindings(&self) -> Vec<SamplerBinding> {
        sampler_bindings(self.textures.iter().map(|t| t.kind))
    }

    pub fn has_texture(&self, kind: TextureKind) -> bool {
        self.textures.iter().any(|t| t.kind == kind)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing all points, or `None` for no points.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |aabb, p| Self {
            min: aabb.min.min(p),
            max: aabb.max.max(p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the sphere around [`Aabb::center`] touching the corners.
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }
}

/// A loaded model: every mesh of the scene plus the textures loaded for it.
#[derive(Debug, Clone)]
pub struct Model<T> {
    /// Directory texture paths are resolved against.
    pub directory: PathBuf,
    pub meshes: Vec<MeshData<T>>,
    /// Each distinct texture loaded for this model, in load order.
    pub textures_loaded: Vec<MeshTexture<T>>,
}

impl<T: Clone> Model<T> {
    /// Imports the file at `path` and flattens it, loading textures through
    /// `loader`.
    pub fn load<L>(path: &Path, options: &ImportOptions, loader: &mut L) -> Result<Self, ImportError>
    where
        L: TextureLoader<Texture = T>,
    {
        let scene = import_file(path, options)?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::from_scene(&scene, directory, options.pre_transform, loader))
    }

    /// Flattens an imported scene. Meshes appear in depth-first node order; a
    /// mesh referenced by several nodes is copied once per reference.
    pub fn from_scene<L>(
        scene: &ImportedScene,
        directory: impl Into<PathBuf>,
        pre_transform: bool,
        loader: &mut L,
    ) -> Self
    where
        L: TextureLoader<Texture = T>,
    {
        let mut builder = ModelBuilder {
            scene,
            loader,
            model: Model {
                directory: directory.into(),
                meshes: Vec::with_capacity(scene.mesh_count()),
                textures_loaded: Vec::new(),
            },
            loaded_ids: FxHashMap::default(),
            failed: FxHashSet::default(),
        };

        scene.root.walk(&mut |node, global| {
            for &mesh_index in &node.meshes {
                let Some(mesh) = scene.meshes.get(mesh_index) else {
                    log::warn!("Node '{}' references missing mesh {mesh_index}", node.name);
                    continue;
                };
                let transform = pre_transform.then_some(global);
                builder.process_mesh(mesh, transform);
            }
        });

        let model = builder.model;
        log::info!(
            "Model has {} meshes, {} vertices, {} indices, {} textures",
            model.meshes.len(),
            model.vertex_count(),
            model.index_count(),
            model.textures_loaded.len()
        );
        model
    }
}

impl<T> Model<T> {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len()).sum()
    }

    /// Bounds of every vertex of every mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(
            self.meshes
                .iter()
                .flat_map(|m| m.vertices.iter().map(|v| v.position)),
        )
    }
}

struct ModelBuilder<'a, L: TextureLoader> {
    scene: &'a ImportedScene,
    loader: &'a mut L,
    model: Model<L::Texture>,
    /// Material path to index in `model.textures_loaded`.
    loaded_ids: FxHashMap<String, usize>,
    /// Paths that failed once and are not retried.
    failed: FxHashSet<String>,
}

impl<L: TextureLoader> ModelBuilder<'_, L> {
    fn process_mesh(&mut self, mesh: &SceneMesh, transform: Option<Mat4>) {
        let scene = self.scene;
        let mut vertices = copy_vertices(mesh);
        if let Some(transform) = transform {
            apply_transform(&mut vertices, transform);
        }

        let indices: Vec<u32> = mesh
            .faces
            .iter()
            .flat_map(|face| face.indices.iter().copied())
            .collect();

        let mut textures = Vec::new();
        if let Some(material) = mesh.material_index.and_then(|i| scene.materials.get(i)) {
            for kind in TextureKind::ALL {
                for path in material.textures(kind) {
                    if let Some(texture) = self.resolve_texture(path, kind) {
                        textures.push(MeshTexture {
                            texture,
                            kind,
                            path: path.clone(),
                        });
                    }
                }
            }
        }

        log::debug!(
            "Mesh '{}': {} vertices, {} indices, {} textures",
            mesh.name,
            vertices.len(),
            indices.len(),
            textures.len()
        );

        self.model.meshes.push(MeshData {
            name: mesh.name.clone(),
            vertices,
            indices,
            textures,
        });
    }

    /// Returns the texture for a material path, loading it the first time the
    /// path is seen.
    fn resolve_texture(&mut self, path: &str, kind: TextureKind) -> Option<L::Texture> {
        if let Some(&id) = self.loaded_ids.get(path) {
            return Some(self.model.textures_loaded[id].texture.clone());
        }
        if self.failed.contains(path) {
            return None;
        }

        let scene = self.scene;
        let file_path;
        let source = match scene.embedded_texture(path) {
            Some(embedded) => TextureSource::Embedded(embedded),
            None => {
                file_path = self.model.directory.join(path);
                TextureSource::File(&file_path)
            }
        };

        match self.loader.load(source, kind) {
            Ok(texture) => {
                log::debug!("Loaded texture {path}");
                self.loaded_ids
                    .insert(path.to_string(), self.model.textures_loaded.len());
                self.model.textures_loaded.push(MeshTexture {
                    texture: texture.clone(),
                    kind,
                    path: path.to_string(),
                });
                Some(texture)
            }
            Err(e) => {
                log::warn!("Skipping texture {path}: {e}");
                self.failed.insert(path.to_string());
                None
            }
        }
    }
}

fn copy_vertices(mesh: &SceneMesh) -> Vec<ModelVertex> {
    let attr3 = |values: &Option<Vec<Vec3>>, i: usize| {
        values
            .as_ref()
            .and_then(|v| v.get(i).copied())
            .unwrap_or(Vec3::ZERO)
    };
    (0..mesh.vertex_count())
        .map(|i| ModelVertex {
            position: mesh.positions[i],
            normal: attr3(&mesh.normals, i),
            tex_coords: mesh
                .tex_coords
                .as_ref()
                .and_then(|uv| uv.get(i).copied())
                .unwrap_or(Vec2::ZERO),
            tangent: attr3(&mesh.tangents, i),
            bitangent: attr3(&mesh.bitangents, i),
        })
        .collect()
}

fn apply_transform(vertices: &mut [ModelVertex], transform: Mat4) {
    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
    for vertex in vertices {
        vertex.position = transform.transform_point3(vertex.position);
        vertex.normal = (normal_matrix * vertex.normal).normalize_or_zero();
        vertex.tangent = (normal_matrix * vertex.tangent).normalize_or_zero();
        vertex.bitangent = (normal_matrix * vertex.bitangent).normalize_or_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Face, SceneMaterial, SceneNode};

    /// Hands out increasing ids and remembers every source it was asked for.
    #[derive(Default)]
    struct CountingLoader {
        requests: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl TextureLoader for CountingLoader {
        type Texture = usize;

        fn load(
            &mut self,
            source: TextureSource<'_>,
            _kind: TextureKind,
        ) -> Result<usize, ImportError> {
            let name = match source {
                TextureSource::File(path) => path.to_string_lossy().replace('\\', "/"),
                TextureSource::Embedded(embedded) => format!("embedded:{}", embedded.data.len()),
            };
            if self.fail_on.is_some_and(|f| name.ends_with(f)) {
                return Err(ImportError::Texture {
                    path: name,
                    reason: "broken".to_string(),
                });
            }
            self.requests.push(name);
            Ok(self.requests.len())
        }
    }

    fn triangle(name: &str, material: Option<usize>, offset: f32) -> SceneMesh {
        SceneMesh {
            name: name.to_string(),
            positions: vec![
                Vec3::new(offset, 0.0, 0.0),
                Vec3::new(offset + 1.0, 0.0, 0.0),
                Vec3::new(offset, 1.0, 0.0),
            ],
            normals: Some(vec![Vec3::Z; 3]),
            tex_coords: Some(vec![Vec2::ZERO, Vec2::X, Vec2::Y]),
            faces: vec![Face::from([0, 1, 2])],
            material_index: material,
            ..Default::default()
        }
    }

    fn suit_scene() -> ImportedScene {
        let mut scene = ImportedScene::new("suit");

        let mut body = SceneMaterial::new("body");
        body.add_texture(TextureKind::Diffuse, "body_dif.png");
        body.add_texture(TextureKind::Specular, "body_spec.png");
        body.add_texture(TextureKind::Height, "body_ddn.png");
        let mut arm = SceneMaterial::new("arm");
        arm.add_texture(TextureKind::Specular, "body_spec.png");
        arm.add_texture(TextureKind::Diffuse, "arm_dif.png");
        scene.materials = vec![body, arm];

        scene.meshes = vec![
            triangle("torso", Some(0), 0.0),
            triangle("arm", Some(1), 2.0),
            triangle("helmet", None, 4.0),
        ];

        let mut torso = SceneNode::new("Torso");
        torso.meshes.push(0);
        let mut arm = SceneNode::new("Arm");
        arm.meshes.push(1);
        let mut helmet = SceneNode::new("Helmet");
        helmet.meshes.push(2);
        torso.children.push(arm);
        scene.root.children = vec![torso, helmet];
        scene
    }

    #[test]
    fn test_meshes_follow_depth_first_order() {
        let mut loader = CountingLoader::default();
        let model = Model::from_scene(&suit_scene(), "models", false, &mut loader);
        let names: Vec<_> = model.meshes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["torso", "arm", "helmet"]);
        assert_eq!(model.vertex_count(), 9);
        assert_eq!(model.index_count(), 9);
        for mesh in &model.meshes {
            assert_eq!(mesh.vertices.len(), 3);
            assert_eq!(mesh.indices, [0, 1, 2]);
        }
    }

    #[test]
    fn test_textures_are_loaded_once_per_path() {
        let mut loader = CountingLoader::default();
        let model = Model::from_scene(&suit_scene(), "models", false, &mut loader);

        assert_eq!(
            loader.requests,
            [
                "models/body_dif.png",
                "models/body_spec.png",
                "models/body_ddn.png",
                "models/arm_dif.png",
            ]
        );
        assert_eq!(model.textures_loaded.len(), 4);

        let torso = &model.meshes[0];
        let kinds: Vec<_> = torso.textures.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TextureKind::Diffuse, TextureKind::Specular, TextureKind::Height]
        );

        // Diffuse first, then the shared specular map from the torso.
        let arm = &model.meshes[1];
        assert_eq!(arm.textures[0].path, "arm_dif.png");
        assert_eq!(arm.textures[1].path, "body_spec.png");
        assert_eq!(arm.textures[1].texture, torso.textures[1].texture);

        assert!(model.meshes[2].textures.is_empty());
    }

    #[test]
    fn test_reused_texture_takes_the_kind_of_its_slot() {
        let mut scene = ImportedScene::new("plate");
        let mut metal = SceneMaterial::new("metal");
        metal.add_texture(TextureKind::Diffuse, "metal.png");
        metal.add_texture(TextureKind::Specular, "metal.png");
        scene.materials = vec![metal];
        scene.meshes = vec![triangle("plate", Some(0), 0.0)];
        scene.root.meshes.push(0);

        let mut loader = CountingLoader::default();
        let model = Model::from_scene(&scene, "models", false, &mut loader);

        assert_eq!(loader.requests, ["models/metal.png"]);
        assert_eq!(model.textures_loaded[0].kind, TextureKind::Diffuse);
        let kinds: Vec<_> = model.meshes[0].textures.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [TextureKind::Diffuse, TextureKind::Specular]);
        assert_eq!(
            model.meshes[0].textures[0].texture,
            model.meshes[0].textures[1].texture
        );
    }

    #[test]
    fn test_sampler_bindings_for_mesh() {
        let mut loader = CountingLoader::default();
        let model = Model::from_scene(&suit_scene(), "models", false, &mut loader);
        let names: Vec<_> = model.meshes[0]
            .sampler_bindings()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, ["texture_diffuse1", "texture_specular1", "texture_normal1"]);
        assert!(model.meshes[0].has_texture(TextureKind::Height));
        assert!(!model.meshes[1].has_texture(TextureKind::Height));
    }

    #[test]
    fn test_failed_texture_is_skipped_and_not_retried() {
        let mut loader = CountingLoader {
            fail_on: Some("body_spec.png"),
            ..Default::default()
        };
        let model = Model::from_scene(&suit_scene(), "models", false, &mut loader);
        assert_eq!(model.meshes[0].textures.len(), 2);
        assert_eq!(model.meshes[1].textures.len(), 1);
        assert_eq!(loader.requests.len(), 3);
        assert!(model.textures_loaded.iter().all(|t| t.path != "body_spec.png"));
    }

    #[test]
    fn test_embedded_textures_bypass_the_directory() {
        let mut scene = suit_scene();
        scene.embedded_textures.push(EmbeddedTexture {
            data: vec![0; 16],
            format_hint: None,
        });
        let mut material = SceneMaterial::new("embedded");
        material.add_texture(TextureKind::Diffuse, "*0");
        scene.materials[0] = material;

        let mut loader = CountingLoader::default();
        let model = Model::from_scene(&scene, "models", false, &mut loader);
        assert_eq!(loader.requests[0], "embedded:16");
        assert_eq!(model.meshes[0].textures[0].path, "*0");
    }

    #[test]
    fn test_missing_attributes_become_zero() {
        let mut scene = ImportedScene::new("bare");
        scene.meshes.push(SceneMesh {
            name: "bare".to_string(),
            positions: vec![Vec3::ONE, Vec3::ZERO],
            faces: vec![],
            ..Default::default()
        });
        scene.root.meshes.push(0);
        let model = Model::from_scene(&scene, "", false, &mut CountingLoader::default());
        let vertex = model.meshes[0].vertices[0];
        assert_eq!(vertex.position, Vec3::ONE);
        assert_eq!(vertex.normal, Vec3::ZERO);
        assert_eq!(vertex.tex_coords, Vec2::ZERO);
        assert_eq!(vertex.tangent, Vec3::ZERO);
        assert!(model.meshes[0].indices.is_empty());
    }

    #[test]
    fn test_pre_transform_bakes_node_transforms() {
        let mut scene = ImportedScene::new("moved");
        scene.meshes.push(triangle("tri", None, 0.0));
        let mut node = SceneNode::new("node");
        node.transform = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
            * Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        node.meshes.push(0);
        scene.root.children.push(node);

        let mut loader = CountingLoader::default();
        let baked = Model::from_scene(&scene, "", true, &mut loader);
        let vertex = baked.meshes[0].vertices[1];
        assert!((vertex.position - Vec3::new(0.0, 0.0, -6.0)).length() < 1e-5);
        assert!((vertex.normal - Vec3::X).length() < 1e-5);

        let raw = Model::from_scene(&scene, "", false, &mut loader);
        assert_eq!(raw.meshes[0].vertices[1].position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_bounds() {
        let mut loader = CountingLoader::default();
        let model = Model::from_scene(&suit_scene(), "", false, &mut loader);
        let bounds = model.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(5.0, 1.0, 0.0));
        assert_eq!(bounds.center(), Vec3::new(2.5, 0.5, 0.0));

        let empty: Model<usize> = Model {
            directory: PathBuf::new(),
            meshes: Vec::new(),
            textures_loaded: Vec::new(),
        };
        assert!(empty.bounds().is_none());
    }
}
