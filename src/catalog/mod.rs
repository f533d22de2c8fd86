//! Explicit asset catalog: every model the viewer can load, with its
//! materials, dequantization constants, chunk manifest, and layer
//! structure.
//!
//! The catalog is constructed once per session and passed by reference to
//! the loader and renderer.

mod entry;
mod material;

use std::collections::BTreeMap;
use std::path::Path;

pub use entry::{MeshEntry, StreamRange};
pub use material::{texture_source, Material, TextureSource, FALLBACK_COLOR};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::codec::DecodeParams;
use crate::error::ViewerError;

/// On-the-wire encoding of a model's chunk files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkFormat {
    /// UTF-8 code points with zig-zag delta attributes and high-water-mark
    /// indices.
    #[default]
    Utf8,
    /// Little-endian u16 attributes and indices, f32 min/max boxes, all at
    /// byte offsets.
    Binary,
}

/// A named opacity layer. Parts are assigned by name first, then by their
/// mesh's material.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerInfo {
    /// Display name.
    pub name: String,
    /// Parts explicitly in this layer.
    pub parts: Vec<String>,
    /// Materials whose parts fall in this layer.
    pub materials: Vec<String>,
}

/// One loadable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Material table keyed by material name.
    #[serde(default)]
    pub materials: FxHashMap<String, Material>,
    /// Attribute dequantization constants shared by every chunk.
    pub decode_params: DecodeParams,
    /// Chunk id (file name or URL suffix) to the entries it contains.
    pub urls: BTreeMap<String, Vec<MeshEntry>>,
    /// Layers, outermost first. An empty list means a single layer.
    #[serde(default)]
    pub layers: Vec<LayerInfo>,
    /// Prefix prepended to texture file names.
    #[serde(default)]
    pub texture_path: String,
    /// Chunk encoding.
    #[serde(default)]
    pub format: ChunkFormat,
}

impl ModelInfo {
    /// Number of opacity layers (at least one).
    pub fn layer_count(&self) -> usize {
        self.layers.len().max(1)
    }

    /// Layer index of `part` drawn with `material`. Unlisted parts fall in
    /// the innermost layer.
    pub fn layer_of(&self, part: &str, material: &str) -> usize {
        self.layers
            .iter()
            .position(|layer| layer.parts.iter().any(|p| p == part))
            .or_else(|| {
                self.layers
                    .iter()
                    .position(|layer| layer.materials.iter().any(|m| m == material))
            })
            .unwrap_or(self.layer_count() - 1)
    }

    /// Material record by name.
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Total number of mesh entries across all chunks.
    pub fn entry_count(&self) -> usize {
        self.urls.values().map(Vec::len).sum()
    }

    /// Iterate `(chunk_id, entry)` pairs in chunk-id order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &MeshEntry)> {
        self.urls
            .iter()
            .flat_map(|(id, entries)| entries.iter().map(move |e| (id.as_str(), e)))
    }

    fn validate(&self, name: &str) -> Result<(), ViewerError> {
        for (_, entry) in self.entries() {
            entry.validate().map_err(|e| {
                ViewerError::Catalog(format!("model '{name}': {e}"))
            })?;
        }
        Ok(())
    }
}

/// Every model known to the session, keyed by model name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetCatalog {
    models: BTreeMap<String, ModelInfo>,
}

impl AssetCatalog {
    /// Parse and validate a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Catalog`] for malformed JSON or entries that
    /// violate the names/lengths invariant.
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        let catalog: Self = serde_json::from_str(json)?;
        for (name, model) in &catalog.models {
            model.validate(name)?;
        }
        log::debug!("catalog loaded: {} models", catalog.models.len());
        Ok(catalog)
    }

    /// Read and parse a catalog file.
    ///
    /// # Errors
    ///
    /// I/O failures plus everything [`AssetCatalog::from_json`] reports.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Register a model programmatically.
    pub fn insert(&mut self, name: impl Into<String>, model: ModelInfo) {
        let _ = self.models.insert(name.into(), model);
    }

    /// Look up a model.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::UnknownModel`] if `name` is absent.
    pub fn model(&self, name: &str) -> Result<&ModelInfo, ViewerError> {
        self.models
            .get(name)
            .ok_or_else(|| ViewerError::UnknownModel(name.to_owned()))
    }

    /// Model names in sorted order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Name of the model after `current`, wrapping around; the first model
    /// when `current` is unknown.
    pub fn next_model(&self, current: &str) -> Option<&str> {
        let mut names = self.model_names().skip_while(|&n| n != current);
        let _ = names.next();
        names.next().or_else(|| self.model_names().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "worm": {
            "materials": {
                "muscle": { "Kd": [122, 163, 81], "Ns": 96.0, "d": 12 }
            },
            "decodeParams": {
                "decodeOffsets": [0, 0, 0, 0, 0, 0, 0, 0],
                "decodeScales": [1, 1, 1, 1, 1, 1, 1, 1]
            },
            "urls": {
                "a.utf8": [{
                    "material": "muscle",
                    "attribRange": [0, 4],
                    "indexRange": [32, 2],
                    "bboxes": 38,
                    "names": ["m1", "m2"],
                    "lengths": [3, 3]
                }],
                "b.utf8": [{
                    "material": "cuticle",
                    "attribRange": [0, 3],
                    "indexRange": [24, 1],
                    "bboxes": 27,
                    "names": ["skin"],
                    "lengths": [3]
                }]
            },
            "layers": [
                { "name": "outer", "materials": ["cuticle"] },
                { "name": "inner", "parts": ["m2"] },
                { "name": "core" }
            ],
            "texturePath": "textures/"
        },
        "other": {
            "decodeParams": { "offsets": [0, 0, 0], "scales": [1, 1, 1] },
            "urls": {},
            "format": "binary"
        }
    }"#;

    #[test]
    fn catalog_parses_and_validates() {
        let catalog = AssetCatalog::from_json(CATALOG).unwrap();
        let worm = catalog.model("worm").unwrap();
        assert_eq!(worm.entry_count(), 2);
        assert_eq!(worm.format, ChunkFormat::Utf8);
        assert_eq!(worm.texture_path, "textures/");
        assert_eq!(worm.decode_params.channel_count(), 8);
        assert_eq!(
            catalog.model("other").unwrap().format,
            ChunkFormat::Binary
        );
    }

    #[test]
    fn unknown_model_is_an_error() {
        let catalog = AssetCatalog::from_json(CATALOG).unwrap();
        assert!(matches!(
            catalog.model("nope"),
            Err(ViewerError::UnknownModel(_))
        ));
    }

    #[test]
    fn invalid_entry_rejects_catalog() {
        let bad = CATALOG.replace(r#""lengths": [3, 3]"#, r#""lengths": [6]"#);
        assert!(matches!(
            AssetCatalog::from_json(&bad),
            Err(ViewerError::Catalog(_))
        ));
    }

    #[test]
    fn layer_assignment_prefers_part_then_material() {
        let catalog = AssetCatalog::from_json(CATALOG).unwrap();
        let worm = catalog.model("worm").unwrap();
        assert_eq!(worm.layer_count(), 3);
        assert_eq!(worm.layer_of("skin", "cuticle"), 0);
        assert_eq!(worm.layer_of("m2", "muscle"), 1);
        assert_eq!(worm.layer_of("m1", "muscle"), 2);

        let other = catalog.model("other").unwrap();
        assert_eq!(other.layer_count(), 1);
        assert_eq!(other.layer_of("anything", "m"), 0);
    }

    #[test]
    fn next_model_wraps() {
        let catalog = AssetCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.next_model("other"), Some("worm"));
        assert_eq!(catalog.next_model("worm"), Some("other"));
        assert_eq!(catalog.next_model("missing"), Some("other"));
    }
}
