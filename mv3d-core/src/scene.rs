//! The imported scene graph.
//!
//! Importers translate their file format into an [`ImportedScene`]: a tree of
//! [`SceneNode`]s that reference meshes and materials stored in flat lists on
//! the scene. Nothing in here touches the GPU.

use glam::{Mat4, Vec2, Vec3};

use crate::material::TextureKind;

/// A whole model file after import and post-processing.
#[derive(Debug, Clone)]
pub struct ImportedScene {
    pub root: SceneNode,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
    pub embedded_textures: Vec<EmbeddedTexture>,
}

impl ImportedScene {
    /// Creates an empty scene with a root node of the given name.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root: SceneNode::new(root_name),
            meshes: Vec::new(),
            materials: Vec::new(),
            embedded_textures: Vec::new(),
        }
    }

    /// Number of meshes stored in the scene, referenced or not.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Looks up an embedded texture from a `*N` material path.
    pub fn embedded_texture(&self, path: &str) -> Option<&EmbeddedTexture> {
        let index = path.strip_prefix('*')?.parse::<usize>().ok()?;
        self.embedded_textures.get(index)
    }
}

/// A node of the scene hierarchy.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Mat4,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Visits the tree depth-first in pre-order, passing each node together
    /// with its global transform.
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&SceneNode, Mat4),
    {
        self.walk_with(Mat4::IDENTITY, visit);
    }

    fn walk_with<F>(&self, parent: Mat4, visit: &mut F)
    where
        F: FnMut(&SceneNode, Mat4),
    {
        let global = parent * self.transform;
        visit(self, global);
        for child in &self.children {
            child.walk_with(global, visit);
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

/// A polygon. Holds exactly three indices after triangulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub indices: Vec<u32>,
}

impl From<[u32; 3]> for Face {
    fn from(indices: [u32; 3]) -> Self {
        Self {
            indices: indices.to_vec(),
        }
    }
}

/// Raw per-attribute mesh data as produced by an importer.
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    /// First texture coordinate set, bottom-left origin.
    pub tex_coords: Option<Vec<Vec2>>,
    pub tangents: Option<Vec<Vec3>>,
    pub bitangents: Option<Vec<Vec3>>,
    pub faces: Vec<Face>,
    pub material_index: Option<usize>,
}

impl SceneMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Iterates over triangle faces, skipping anything that is not one.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.faces.iter().filter_map(|face| match face.indices.as_slice() {
            &[a, b, c] => Some([a as usize, b as usize, c as usize]),
            _ => None,
        })
    }
}

/// Texture references of a single material, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct SceneMaterial {
    pub name: String,
    textures: [Vec<String>; TextureKind::ALL.len()],
}

impl SceneMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Appends a texture path to the given slot.
    pub fn add_texture(&mut self, kind: TextureKind, path: impl Into<String>) {
        self.textures[kind.index()].push(path.into());
    }

    pub fn textures(&self, kind: TextureKind) -> &[String] {
        &self.textures[kind.index()]
    }

    pub fn texture_count(&self, kind: TextureKind) -> usize {
        self.textures[kind.index()].len()
    }
}

/// Encoded image bytes stored inside the model file.
#[derive(Debug, Clone)]
pub struct EmbeddedTexture {
    pub data: Vec<u8>,
    /// MIME type or extension, when the file provides one.
    pub format_hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, meshes: Vec<usize>, children: Vec<SceneNode>) -> SceneNode {
        SceneNode {
            meshes,
            children,
            ..SceneNode::new(name)
        }
    }

    #[test]
    fn test_walk_is_depth_first_preorder() {
        let root = node(
            "root",
            vec![0],
            vec![
                node("a", vec![1], vec![node("a1", vec![2], vec![])]),
                node("b", vec![3], vec![]),
            ],
        );
        let mut order = Vec::new();
        root.walk(&mut |n, _| order.push(n.name.clone()));
        assert_eq!(order, ["root", "a", "a1", "b"]);
        assert_eq!(root.node_count(), 4);
    }

    #[test]
    fn test_walk_accumulates_transforms() {
        let mut child = SceneNode::new("child");
        child.transform = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let mut root = SceneNode::new("root");
        root.transform = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        root.children.push(child);

        let mut globals = Vec::new();
        root.walk(&mut |_, global| globals.push(global.transform_point3(Vec3::ZERO)));
        assert_eq!(globals, [Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 0.0)]);
    }

    #[test]
    fn test_material_textures_by_kind() {
        let mut material = SceneMaterial::new("suit");
        material.add_texture(TextureKind::Diffuse, "body_dif.png");
        material.add_texture(TextureKind::Diffuse, "arm_dif.png");
        material.add_texture(TextureKind::Height, "body_ddn.png");
        assert_eq!(material.texture_count(TextureKind::Diffuse), 2);
        assert_eq!(material.texture_count(TextureKind::Specular), 0);
        assert_eq!(material.textures(TextureKind::Height), ["body_ddn.png"]);
    }

    #[test]
    fn test_embedded_texture_lookup() {
        let mut scene = ImportedScene::new("scene");
        scene.embedded_textures.push(EmbeddedTexture {
            data: vec![1, 2, 3],
            format_hint: Some("image/png".to_string()),
        });
        assert!(scene.embedded_texture("*0").is_some());
        assert!(scene.embedded_texture("*1").is_none());
        assert!(scene.embedded_texture("0").is_none());
        assert!(scene.embedded_texture("*x").is_none());
    }
}
