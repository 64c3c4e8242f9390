//! The core of ModelView3D. Everything needed to turn a model file into flat,
//! render-ready mesh data lives here: the imported scene graph, the OBJ and
//! glTF importers, post-processing, flattening with texture deduplication and
//! the camera. Nothing in this crate touches the GPU.

pub mod camera;
pub mod error;
pub mod import;
pub mod material;
pub mod model;
pub mod postprocess;
pub mod scene;

pub use error::ImportError;
pub use import::{ImportOptions, import_file};
pub use material::{SamplerBinding, TextureKind, sampler_bindings};
pub use model::{Aabb, MeshData, MeshTexture, Model, ModelVertex, TextureLoader, TextureSource};
