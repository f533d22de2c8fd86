use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Picking", inline)]
#[serde(default)]
/// Colour-ID picking settings.
pub struct PickingOptions {
    /// ID stamped on the first part of a model; later parts count up from
    /// here. 0 is reserved for the background.
    #[schemars(skip)]
    pub base_color_index: u32,
}

impl Default for PickingOptions {
    fn default() -> Self {
        Self {
            base_color_index: 1,
        }
    }
}
