//! Texture kinds and the sampler naming convention shared with the shaders.
//!
//! A mesh's textures are bound to consecutive texture units in the order they
//! are stored. Each one is exposed to the fragment shader through a uniform
//! named after its kind and a 1-based counter, e.g. `texture_diffuse1`,
//! `texture_diffuse2`, `texture_specular1`.

use serde::{Deserialize, Serialize};

/// The material texture slots read from imported models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureKind {
    Diffuse,
    Specular,
    /// Bump or normal map.
    Height,
    Ambient,
}

impl TextureKind {
    /// All kinds, in the order textures are gathered for a mesh.
    pub const ALL: [TextureKind; 4] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Height,
        TextureKind::Ambient,
    ];

    /// Prefix of the sampler uniform for this kind.
    ///
    /// Height maps feed the normal-mapping path of the shader and ambient maps
    /// the height slot, hence the crossed names.
    pub fn sampler_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
            TextureKind::Height => "texture_normal",
            TextureKind::Ambient => "texture_height",
        }
    }

    /// Position of this kind in [`TextureKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for TextureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::Specular => "specular",
            TextureKind::Height => "height",
            TextureKind::Ambient => "ambient",
        };
        f.write_str(name)
    }
}

/// A texture unit together with the sampler uniform that should point at it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerBinding {
    pub unit: u32,
    pub name: String,
}

/// Computes the texture unit and sampler name for each texture of a mesh.
pub fn sampler_bindings<I>(kinds: I) -> Vec<SamplerBinding>
where
    I: IntoIterator<Item = TextureKind>,
{
    let mut counters = [0u32; TextureKind::ALL.len()];
    kinds
        .into_iter()
        .enumerate()
        .map(|(unit, kind)| {
            let counter = &mut counters[kind.index()];
            *counter += 1;
            SamplerBinding {
                unit: unit as u32,
                name: format!("{}{}", kind.sampler_prefix(), counter),
            }
        })
        .collect()
}
