//! GPU resource management.
//!
//! Device/surface setup, shader composition, material textures, per-draw
//! uniforms, and the part-mesh pipelines.

/// Per-draw opacity slots bound at dynamic offsets.
pub mod draw_uniforms;
/// Part-mesh colour and picking pipelines plus material bind groups.
pub mod pipeline;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Material textures, the URL texture cache, and offscreen targets.
pub mod texture;
