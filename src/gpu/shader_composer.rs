use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage, ShaderType,
};

use crate::error::ViewerError;

/// Every top-level shader the renderer builds a pipeline from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shader {
    /// Textured part mesh for the colour pass.
    PartMesh,
    /// Part-ID output for the picking pass.
    PickingPart,
}

impl Shader {
    /// Every shader, for composition tests.
    pub const ALL: [Self; 2] = [Self::PartMesh, Self::PickingPart];

    fn source(self) -> &'static str {
        match self {
            Self::PartMesh => include_str!("../../assets/shaders/raster/part_mesh.wgsl"),
            Self::PickingPart => {
                include_str!("../../assets/shaders/utility/picking_part.wgsl")
            }
        }
    }

    fn file_path(self) -> &'static str {
        match self {
            Self::PartMesh => "raster/part_mesh.wgsl",
            Self::PickingPart => "utility/picking_part.wgsl",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::PartMesh => "Part Mesh Shader",
            Self::PickingPart => "Picking Part Shader",
        }
    }
}

/// Shared WGSL modules, in dependency order.
const MODULES: &[(&str, &str)] = &[(
    include_str!("../../assets/shaders/modules/camera.wgsl"),
    "modules/camera.wgsl",
)];

/// Wraps `naga_oil::compose::Composer` so shaders can `#import
/// wormview::camera` and friends. Produces `naga::Module` IR directly.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Register every shared module.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, ViewerError> {
        let mut composer = Composer::default();
        for &(source, file_path) in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source,
                    file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    ViewerError::Shader(format!("module '{file_path}': {e:?}"))
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose `shader` into a `wgpu::ShaderModule`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Shader`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
    ) -> Result<wgpu::ShaderModule, ViewerError> {
        let module = self.compose_naga(shader)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        }))
    }

    /// Compose `shader` to naga IR without a device.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Shader`] if composition fails.
    pub fn compose_naga(&mut self, shader: Shader) -> Result<naga::Module, ViewerError> {
        let file_path = shader.file_path();
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source: shader.source(),
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| ViewerError::Shader(format!("'{file_path}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_shaders_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for shader in Shader::ALL {
            let module = composer
                .compose_naga(shader)
                .unwrap_or_else(|e| panic!("{shader:?} failed to compose: {e}"));
            assert!(module.entry_points.iter().any(|e| e.name == "vs_main"));
            assert!(module.entry_points.iter().any(|e| e.name == "fs_main"));
        }
    }
}
