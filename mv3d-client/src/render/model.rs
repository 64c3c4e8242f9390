//! Uploading and drawing imported models.

use std::{mem::offset_of, path::Path, rc::Rc, sync::Arc};

use glow::HasContext;
use image::{DynamicImage, Rgba, RgbaImage};
use mv3d_core::{
    ImportError, ImportOptions, Model, ModelVertex, SamplerBinding, TextureKind, TextureLoader,
    TextureSource, model::Aabb,
};

use crate::abs::{Mesh, ShaderProgram, Texture, Vertex};

impl Vertex for ModelVertex {
    fn vertex_attribs(gl: &glow::Context) {
        unsafe {
            let stride = std::mem::size_of::<ModelVertex>() as i32;

            // Position attribute
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(
                0,
                3,
                glow::FLOAT,
                false,
                stride,
                offset_of!(ModelVertex, position) as i32,
            );

            // Normal attribute
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(
                1,
                3,
                glow::FLOAT,
                false,
                stride,
                offset_of!(ModelVertex, normal) as i32,
            );

            // Texture coordinate attribute
            gl.enable_vertex_attrib_array(2);
            gl.vertex_attrib_pointer_f32(
                2,
                2,
                glow::FLOAT,
                false,
                stride,
                offset_of!(ModelVertex, tex_coords) as i32,
            );

            // Tangent attribute
            gl.enable_vertex_attrib_array(3);
            gl.vertex_attrib_pointer_f32(
                3,
                3,
                glow::FLOAT,
                false,
                stride,
                offset_of!(ModelVertex, tangent) as i32,
            );

            // Bitangent attribute
            gl.enable_vertex_attrib_array(4);
            gl.vertex_attrib_pointer_f32(
                4,
                3,
                glow::FLOAT,
                false,
                stride,
                offset_of!(ModelVertex, bitangent) as i32,
            );
        }
    }
}

/// Decodes textures with `image` and uploads them straight to the GPU.
pub struct GlTextureLoader {
    gl: Arc<glow::Context>,
    /// Store diffuse maps as sRGB.
    srgb_diffuse: bool,
}

impl GlTextureLoader {
    pub fn new(gl: &Arc<glow::Context>, srgb_diffuse: bool) -> Self {
        Self {
            gl: Arc::clone(gl),
            srgb_diffuse,
        }
    }
}

impl TextureLoader for GlTextureLoader {
    type Texture = Rc<Texture>;

    fn load(
        &mut self,
        source: TextureSource<'_>,
        kind: TextureKind,
    ) -> Result<Rc<Texture>, ImportError> {
        let (name, decoded) = match source {
            TextureSource::File(path) => (path.display().to_string(), image::open(path)),
            TextureSource::Embedded(embedded) => (
                format!("embedded {}", embedded.format_hint.as_deref().unwrap_or("image")),
                image::load_from_memory(&embedded.data),
            ),
        };
        let image = decoded.map_err(|e| ImportError::Texture {
            path: name.clone(),
            reason: e.to_string(),
        })?;

        let srgb = self.srgb_diffuse && kind == TextureKind::Diffuse;
        let texture = Texture::new(&self.gl, &image, srgb)
            .map_err(|reason| ImportError::Texture { path: name, reason })?;
        log::debug!(
            "Uploaded {kind} texture {}x{}",
            texture.width(),
            texture.height()
        );
        Ok(Rc::new(texture))
    }
}

struct GpuMesh {
    mesh: Mesh,
    textures: Vec<(SamplerBinding, Rc<Texture>)>,
    has_diffuse: bool,
    has_specular: bool,
    has_normal: bool,
}

/// A model whose meshes live in GPU buffers.
pub struct GpuModel {
    gl: Arc<glow::Context>,
    meshes: Vec<GpuMesh>,
    /// Bound in place of a missing diffuse map.
    white: Texture,
    bounds: Option<Aabb>,
}

impl GpuModel {
    /// Loads the model at `path` and uploads it.
    pub fn load(
        gl: &Arc<glow::Context>,
        path: &Path,
        options: &ImportOptions,
        srgb_diffuse: bool,
    ) -> Result<Self, String> {
        let mut loader = GlTextureLoader::new(gl, srgb_diffuse);
        let model = Model::load(path, options, &mut loader).map_err(|e| e.to_string())?;
        Self::new(gl, &model)
    }

    /// Uploads every mesh's vertex and index buffers.
    pub fn new(gl: &Arc<glow::Context>, model: &Model<Rc<Texture>>) -> Result<Self, String> {
        let start = std::time::Instant::now();

        let mut meshes = Vec::with_capacity(model.meshes.len());
        for data in &model.meshes {
            let mesh = Mesh::new(gl, &data.vertices, &data.indices, glow::TRIANGLES)?;
            let textures = data
                .sampler_bindings()
                .into_iter()
                .zip(&data.textures)
                .map(|(binding, texture)| (binding, Rc::clone(&texture.texture)))
                .collect();
            meshes.push(GpuMesh {
                mesh,
                textures,
                has_diffuse: data.has_texture(TextureKind::Diffuse),
                has_specular: data.has_texture(TextureKind::Specular),
                has_normal: data.has_texture(TextureKind::Height),
            });
        }

        let white = Texture::new(
            gl,
            &DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]))),
            false,
        )?;

        log::info!(
            "Uploaded {} meshes ({} indices) in {:?}",
            meshes.len(),
            meshes.iter().map(|m| m.mesh.index_count()).sum::<usize>(),
            start.elapsed()
        );

        Ok(Self {
            gl: Arc::clone(gl),
            meshes,
            white,
            bounds: model.bounds(),
        })
    }

    /// Bounds of the model in model space.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Issues one draw call per mesh. The program must be in use.
    pub fn draw(&self, program: &ShaderProgram) {
        for gpu_mesh in &self.meshes {
            for (binding, texture) in &gpu_mesh.textures {
                texture.bind(binding.unit);
                program.set_uniform(&binding.name, binding.unit as i32);
            }
            if !gpu_mesh.has_diffuse {
                let unit = gpu_mesh.textures.len() as u32;
                self.white.bind(unit);
                program.set_uniform("texture_diffuse1", unit as i32);
            }
            program.set_uniform("u_has_specular_map", gpu_mesh.has_specular);
            program.set_uniform("u_has_normal_map", gpu_mesh.has_normal);

            gpu_mesh.mesh.draw();
        }
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
        }
    }
}
