//! Viewing camera and its GPU uniform.
//!
//! Navigation (orbit, pan, zoom) belongs to the host; this module only
//! turns a camera state into matrices and frames bounding boxes.

/// Camera state, uniform layout, and bounding-box framing.
pub mod core;
/// Uniform buffer and bind group shared by every pipeline.
pub mod gpu;

pub use self::core::{Camera, CameraUniform};
pub use self::gpu::CameraBinding;
