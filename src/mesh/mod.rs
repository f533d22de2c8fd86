//! Mesh buffers, part ranges, and draw submission.
//!
//! - [`buffers`] validates decoded data and builds the picking stream
//! - [`gpu_mesh`] owns the uploaded wgpu buffers and issues draws
//! - [`draw_range`] maps parts to index ranges and merges display lists

mod bbox;
pub mod buffers;
pub mod draw_range;
pub mod gpu_mesh;

pub use bbox::{grow_bbox, union as union_bboxes, BBox};
pub use buffers::MeshBuffers;
pub use draw_range::{part_starts, DisplayList, PartRange, PartRanges};
pub use gpu_mesh::{DrawSink, GpuMesh};
