use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[schemars(title = "Loading", inline)]
#[serde(default)]
/// Model and texture loading settings.
pub struct LoadingOptions {
    /// Model opened at startup; empty selects the first catalog entry.
    #[schemars(skip)]
    pub default_model: String,
    /// Replaces every model's texture path prefix when set.
    #[schemars(skip)]
    pub texture_path: Option<String>,
}

impl LoadingOptions {
    /// Texture prefix to use for a model whose catalog prefix is
    /// `model_path`.
    pub fn texture_path<'a>(&'a self, model_path: &'a str) -> &'a str {
        self.texture_path.as_deref().unwrap_or(model_path)
    }
}
