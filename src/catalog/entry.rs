//! Mesh entries and the stream ranges locating them in a chunk.

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

/// A `[start, length]` pair locating one stream inside a chunk.
///
/// Units depend on the chunk format: bytes for the binary layout, code
/// points (attributes) and triangles (indices) for the UTF-8 layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct StreamRange {
    /// First element of the stream.
    pub start: usize,
    /// Stream length.
    pub length: usize,
}

impl From<[usize; 2]> for StreamRange {
    fn from([start, length]: [usize; 2]) -> Self {
        Self { start, length }
    }
}

impl From<StreamRange> for [usize; 2] {
    fn from(range: StreamRange) -> Self {
        [range.start, range.length]
    }
}

impl StreamRange {
    /// One past the last element, or `None` if that overflows `usize`.
    pub const fn end(&self) -> Option<usize> {
        self.start.checked_add(self.length)
    }
}

/// Metadata for one network-loaded mesh chunk: where its streams live and
/// which anatomical parts its index buffer covers, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshEntry {
    /// Material name, a key into the model's material table.
    pub material: String,
    /// Location of the quantized attribute stream.
    pub attrib_range: StreamRange,
    /// Location of the index stream.
    pub index_range: StreamRange,
    /// Offset of the per-part bounding boxes.
    pub bboxes: usize,
    /// Part names, in index-buffer order.
    pub names: Vec<String>,
    /// Index count of each part, parallel to `names`.
    pub lengths: Vec<u32>,
}

impl MeshEntry {
    /// Check the structural invariant `names.len() == lengths.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Catalog`] on mismatch.
    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.names.len() != self.lengths.len() {
            return Err(ViewerError::Catalog(format!(
                "mesh entry for '{}' lists {} names but {} lengths",
                self.material,
                self.names.len(),
                self.lengths.len()
            )));
        }
        Ok(())
    }

    /// Sum of all part lengths; must equal the decoded index count.
    pub fn total_index_count(&self) -> usize {
        self.lengths.iter().map(|&l| l as usize).sum()
    }

    /// Number of parts in this entry.
    pub fn part_count(&self) -> usize {
        self.names.len()
    }
}
