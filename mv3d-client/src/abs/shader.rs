//! OpenGL Shaders
//!
//! [`ShaderProgram`] links the viewer's vertex/fragment pair; values reach it
//! through the [`Uniform`] trait.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use glow::HasContext;

/// A compiled shader stage. Only needed until the program is linked.
pub struct Shader {
    gl: Arc<glow::Context>,
    id: glow::Shader,
}

impl Shader {
    /// Compiles one stage, returning the driver's info log on failure.
    pub fn new(gl: &Arc<glow::Context>, stage: u32, source: &str) -> Result<Self, String> {
        unsafe {
            let id = gl.create_shader(stage)?;
            gl.shader_source(id, source);
            gl.compile_shader(id);

            if !gl.get_shader_compile_status(id) {
                let log = gl.get_shader_info_log(id);
                gl.delete_shader(id);
                return Err(log);
            }

            Ok(Self {
                gl: Arc::clone(gl),
                id,
            })
        }
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_shader(self.id);
        }
    }
}

/// A value that can be uploaded to a named uniform. Uniforms the program
/// does not use are silently ignored.
pub trait Uniform {
    fn upload(&self, gl: &glow::Context, location: &glow::UniformLocation);
}

impl Uniform for i32 {
    fn upload(&self, gl: &glow::Context, location: &glow::UniformLocation) {
        unsafe { gl.uniform_1_i32(Some(location), *self) }
    }
}

impl Uniform for bool {
    fn upload(&self, gl: &glow::Context, location: &glow::UniformLocation) {
        (*self as i32).upload(gl, location);
    }
}

impl Uniform for Vec3 {
    fn upload(&self, gl: &glow::Context, location: &glow::UniformLocation) {
        unsafe { gl.uniform_3_f32(Some(location), self.x, self.y, self.z) }
    }
}

impl Uniform for Mat4 {
    fn upload(&self, gl: &glow::Context, location: &glow::UniformLocation) {
        unsafe { gl.uniform_matrix_4_f32_slice(Some(location), false, self.as_ref()) }
    }
}

/// A linked shader program.
pub struct ShaderProgram {
    gl: Arc<glow::Context>,
    id: glow::Program,
}

impl ShaderProgram {
    /// Compiles and links a vertex/fragment shader pair. Errors name the
    /// stage that failed.
    pub fn from_sources(
        gl: &Arc<glow::Context>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, String> {
        let vert = Shader::new(gl, glow::VERTEX_SHADER, vertex_source)
            .map_err(|e| format!("vertex shader: {e}"))?;
        let frag = Shader::new(gl, glow::FRAGMENT_SHADER, fragment_source)
            .map_err(|e| format!("fragment shader: {e}"))?;

        unsafe {
            let id = gl.create_program()?;
            for stage in [&vert, &frag] {
                gl.attach_shader(id, stage.id);
            }
            gl.link_program(id);
            for stage in [&vert, &frag] {
                gl.detach_shader(id, stage.id);
            }

            if !gl.get_program_link_status(id) {
                let log = gl.get_program_info_log(id);
                gl.delete_program(id);
                return Err(format!("link: {log}"));
            }

            Ok(Self {
                gl: Arc::clone(gl),
                id,
            })
        }
    }

    pub fn use_program(&self) {
        unsafe {
            self.gl.use_program(Some(self.id));
        }
    }

    pub fn unbind(&self) {
        unsafe {
            self.gl.use_program(None);
        }
    }

    /// Uploads `value` to the uniform called `name`. The program must be in use.
    pub fn set_uniform<T: Uniform>(&self, name: &str, value: T) {
        let location = unsafe { self.gl.get_uniform_location(self.id, name) };
        if let Some(location) = location {
            value.upload(&self.gl, &location);
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_program(self.id);
        }
    }
}
