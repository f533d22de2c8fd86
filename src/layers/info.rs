//! Per-frame opacity snapshot: layer values plus per-part overrides.

use rustc_hash::FxHashMap;

use super::opacity::LayerOpacityManager;

/// Snapshot of everything that decides how opaque a part is drawn: one value
/// per layer (outermost first) plus per-part overrides supplied by the
/// selection/pin manager.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpacityInfo {
    layers: Vec<f32>,
    parts: FxHashMap<String, f32>,
}

impl OpacityInfo {
    /// Layer opacities with no overrides. Values are clamped to `[0, 1]`.
    pub fn new(layers: &[f32]) -> Self {
        Self {
            layers: layers.iter().map(|v| v.clamp(0.0, 1.0)).collect(),
            parts: FxHashMap::default(),
        }
    }

    /// Snapshot of the manager's current layer opacities.
    pub fn from_manager(manager: &LayerOpacityManager) -> Self {
        Self::new(manager.layer_opacities())
    }

    /// Force `part` to `opacity` regardless of its layer.
    #[must_use]
    pub fn with_override(mut self, part: impl Into<String>, opacity: f32) -> Self {
        self.set_override(part, opacity);
        self
    }

    /// Force `part` to `opacity` regardless of its layer.
    pub fn set_override(&mut self, part: impl Into<String>, opacity: f32) {
        let _ = self.parts.insert(part.into(), opacity.clamp(0.0, 1.0));
    }

    /// Remove every per-part override.
    pub fn clear_overrides(&mut self) {
        self.parts.clear();
    }

    /// Opacity of `layer`. Layers past the end are fully opaque.
    pub fn layer_opacity(&self, layer: usize) -> f32 {
        self.layers.get(layer).copied().unwrap_or(1.0)
    }

    /// Effective opacity of `part` in `layer`: its override if any, else the
    /// layer's value.
    pub fn opacity_of(&self, part: &str, layer: usize) -> f32 {
        self.parts
            .get(part)
            .copied()
            .unwrap_or_else(|| self.layer_opacity(layer))
    }

    /// Layer opacities, outermost first.
    pub fn layers(&self) -> &[f32] {
        &self.layers
    }

    /// Copy with every opacity rounded to 0 or 1, as used by the ID pass:
    /// a part is pickable only if it is at least half opaque.
    pub fn int_valued(&self) -> Self {
        Self {
            layers: self.layers.iter().map(|v| v.round()).collect(),
            parts: self
                .parts
                .iter()
                .map(|(name, v)| (name.clone(), v.round()))
                .collect(),
        }
    }
}
