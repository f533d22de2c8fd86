use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Render", inline)]
#[serde(default)]
/// Colour-pass settings.
pub struct RenderOptions {
    /// Clear colour (linear RGB).
    #[schemars(title = "Background")]
    pub background: [f32; 3],
    /// Shade parts with their material textures; plain white otherwise.
    #[schemars(title = "Colored")]
    pub colored: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: [1.0, 1.0, 1.0],
            colored: true,
        }
    }
}

impl RenderOptions {
    /// Background as a wgpu clear colour.
    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b] = self.background.map(f64::from);
        wgpu::Color { r, g, b, a: 1.0 }
    }
}
