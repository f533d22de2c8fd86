//! Chunk decoding: quantized attribute streams, index streams, and per-part
//! bounding boxes.
//!
//! Everything here is pure and `Send`, so an orchestrator may run it on a
//! worker thread and hand the resulting [`DecodedMesh`]es to the renderer.

/// Fixed-offset little-endian chunk layout.
pub mod binary;
mod chunk;
/// Per-channel dequantization.
pub mod quantized;
/// UTF-8 code-point chunk layout.
pub mod utf8;

pub use chunk::{Chunk, DecodedMesh};
pub use quantized::{decode, quantize, DecodeParams};
