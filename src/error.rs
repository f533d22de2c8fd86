//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the wormview crate.
#[derive(Debug)]
pub enum ViewerError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// The swapchain frame could not be acquired.
    Surface(wgpu::SurfaceError),
    /// Malformed chunk data: bad ranges, channel mismatches, invalid UTF-8,
    /// or part lengths that disagree with the index count.
    Format(String),
    /// An index buffer references a vertex the 16-bit draw path cannot
    /// address, or one past the end of the vertex array.
    IndexLimit {
        /// Offending index value.
        index: u32,
        /// Number of vertices available to the mesh.
        vertex_count: usize,
    },
    /// The asset catalog could not be parsed or is inconsistent.
    Catalog(String),
    /// A model name was requested that the catalog does not contain.
    UnknownModel(String),
    /// WGSL composition failure.
    Shader(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Surface(e) => write!(f, "surface error: {e}"),
            Self::Format(msg) => write!(f, "chunk format error: {msg}"),
            Self::IndexLimit {
                index,
                vertex_count,
            } => write!(
                f,
                "index {index} is outside the 16-bit draw range or the \
                 mesh's {vertex_count} vertices"
            ),
            Self::Catalog(msg) => write!(f, "asset catalog error: {msg}"),
            Self::UnknownModel(name) => {
                write!(f, "model '{name}' is not in the catalog")
            }
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Surface(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for ViewerError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<wgpu::SurfaceError> for ViewerError {
    fn from(e: wgpu::SurfaceError) -> Self {
        Self::Surface(e)
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Catalog(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_limit_names_both_bounds() {
        let past_vertices = ViewerError::IndexLimit {
            index: 3,
            vertex_count: 3,
        };
        let text = past_vertices.to_string();
        assert!(text.contains("index 3"));
        assert!(text.contains("16-bit"));
        assert!(text.contains("3 vertices"));
        assert!(!text.contains("exceeds the 16-bit"));
    }
}
