use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Camera", inline)]
#[serde(default)]
/// Camera projection parameters.
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    #[schemars(title = "Field of View", range(min = 10.0, max = 90.0), extend("step" = 1.0))]
    pub fovy: f32,
    /// Near clipping plane distance before the first framing.
    #[schemars(skip)]
    pub znear: f32,
    /// Far clipping plane distance before the first framing.
    #[schemars(skip)]
    pub zfar: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fovy: 30.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

impl CameraOptions {
    /// Camera at the default position with these projection parameters.
    pub fn camera(&self, aspect: f32) -> Camera {
        Camera {
            aspect,
            fovy: self.fovy,
            znear: self.znear,
            zfar: self.zfar,
            ..Camera::default()
        }
    }
}
