//! Everything that draws: the model renderer and its shaders.

pub mod model;
