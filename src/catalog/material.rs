//! Material records and the diffuse texture fallback chain.

use serde::{Deserialize, Serialize};

/// Colour used when a material has neither a diffuse map nor a diffuse
/// coefficient.
pub const FALLBACK_COLOR: [u8; 3] = [255, 255, 255];

/// Phong material parameters as exported with each model.
///
/// Colour coefficients are stored on the 0-255 scale used by the exporter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Material {
    /// Ambient coefficient.
    #[serde(rename = "Ka", alias = "ambient", default)]
    pub ambient: [f32; 3],
    /// Diffuse coefficient.
    #[serde(rename = "Kd", alias = "diffuse", default)]
    pub diffuse: Option<[f32; 3]>,
    /// Specular coefficient.
    #[serde(rename = "Ks", alias = "specular", default)]
    pub specular: [f32; 3],
    /// Specular exponent.
    #[serde(rename = "Ns", alias = "shininess", default)]
    pub shininess: f32,
    /// Alpha divisor.
    #[serde(rename = "d", alias = "alphaDivisor", default)]
    pub alpha_divisor: f32,
    /// Diffuse texture file, relative to the model's texture path.
    #[serde(
        rename = "map_Kd",
        alias = "diffuseMap",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub diffuse_map: Option<String>,
}

/// Where a mesh's diffuse texel data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureSource {
    /// An image to fetch and decode.
    Url(String),
    /// A 1x1 texture of a flat RGB colour.
    Flat([u8; 3]),
}

impl Material {
    /// Full URL of the diffuse map, if the material has one.
    pub fn texture_url(&self, texture_path: &str) -> Option<String> {
        self.diffuse_map
            .as_deref()
            .filter(|map| !map.is_empty())
            .map(|map| format!("{texture_path}{map}"))
    }

    /// Flat colour derived from the diffuse coefficient, or white.
    pub fn flat_color(&self) -> [u8; 3] {
        self.diffuse.map_or(FALLBACK_COLOR, |kd| {
            kd.map(|c| c.clamp(0.0, 255.0).round() as u8)
        })
    }

    /// Diffuse colour as linear `[0, 1]` floats.
    pub fn diffuse_rgb(&self) -> [f32; 3] {
        self.flat_color().map(|c| f32::from(c) / 255.0)
    }

    /// Specular colour as `[0, 1]` floats.
    pub fn specular_rgb(&self) -> [f32; 3] {
        self.specular.map(|c| (c / 255.0).clamp(0.0, 1.0))
    }

    /// Ambient colour as `[0, 1]` floats.
    pub fn ambient_rgb(&self) -> [f32; 3] {
        self.ambient.map(|c| (c / 255.0).clamp(0.0, 1.0))
    }
}

/// Resolve the texture for `material`: its diffuse map, else its diffuse
/// colour, else white. A material missing from the catalog resolves to
/// white.
pub fn texture_source(
    material: Option<&Material>,
    texture_path: &str,
) -> TextureSource {
    let Some(material) = material else {
        return TextureSource::Flat(FALLBACK_COLOR);
    };
    material
        .texture_url(texture_path)
        .map_or_else(|| TextureSource::Flat(material.flat_color()), TextureSource::Url)
}
