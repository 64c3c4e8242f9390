//! Errors produced while importing a model.

/// Everything that can go wrong between opening a model file and handing
/// flat mesh data to the renderer.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unsupported model format: {0:?}")]
    UnsupportedFormat(Option<String>),
    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("model contains no scene")]
    NoScene,
    #[error("failed to load texture {path}: {reason}")]
    Texture { path: String, reason: String },
}
