//! CPU-side preparation of a mesh entry for upload.
//!
//! Validates the 16-bit index limit and builds the per-vertex colour-index
//! stream used by the ID picking pass.

use super::bbox::BBox;
use super::draw_range::part_starts;
use crate::codec::DecodedMesh;
use crate::error::ViewerError;

/// Largest index the `Uint16` draw path can address.
pub const MAX_INDEX: u32 = u16::MAX as u32;

/// Largest picking ID. IDs travel as `f32` vertex attributes, which hold
/// every integer up to 2^24 exactly.
pub const MAX_PICK_ID: u32 = 1 << 24;

/// Upload-ready buffers for one mesh entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffers {
    /// Interleaved vertex attributes.
    pub attribs: Vec<f32>,
    /// Triangle-list indices.
    pub indices: Vec<u16>,
    /// Per-part bounding boxes.
    pub bboxes: Vec<BBox>,
    /// Per-vertex part ID (`start_color_index + part ordinal`), present when
    /// the mesh takes part in picking.
    pub color_indices: Option<Vec<f32>>,
    /// Floats per vertex.
    pub channel_count: usize,
}

impl MeshBuffers {
    /// Validate and convert a decoded mesh.
    ///
    /// `lengths` are the entry's per-part index counts. When
    /// `start_color_index` is set, every vertex referenced by part `i` is
    /// stamped with `start_color_index + i`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::IndexLimit`] if an index exceeds 65535 or
    /// addresses a vertex past the end of the attribute stream, and
    /// [`ViewerError::Format`] if `lengths` do not cover the index buffer or
    /// the part IDs would pass [`MAX_PICK_ID`].
    pub fn build(
        decoded: DecodedMesh,
        lengths: &[u32],
        start_color_index: Option<u32>,
    ) -> Result<Self, ViewerError> {
        let vertex_count = decoded.vertex_count();
        let indices = narrow_indices(&decoded.indices, vertex_count)?;

        let total: usize = lengths.iter().map(|&l| l as usize).sum();
        if total != indices.len() {
            return Err(ViewerError::Format(format!(
                "part lengths sum to {total} but the mesh has {} indices",
                indices.len()
            )));
        }

        let color_indices = start_color_index
            .map(|start| color_index_array(&indices, lengths, start, vertex_count))
            .transpose()?;

        Ok(Self {
            attribs: decoded.attribs,
            indices,
            bboxes: decoded.bboxes,
            color_indices,
            channel_count: decoded.channel_count,
        })
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.attribs.len() / self.channel_count.max(1)
    }

    /// Number of indices.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Bounding boxes flattened to six floats each.
    pub fn bbox_floats(&self) -> Vec<f32> {
        self.bboxes.iter().flat_map(BBox::to_array).collect()
    }
}

/// Convert indices to `u16`, rejecting anything the 16-bit draw path or the
/// vertex stream cannot serve.
///
/// # Errors
///
/// Returns [`ViewerError::IndexLimit`] for the first offending index.
pub fn narrow_indices(indices: &[u32], vertex_count: usize) -> Result<Vec<u16>, ViewerError> {
    indices
        .iter()
        .map(|&index| {
            if index > MAX_INDEX || index as usize >= vertex_count {
                return Err(ViewerError::IndexLimit {
                    index,
                    vertex_count,
                });
            }
            Ok(index as u16)
        })
        .collect()
}

/// Per-vertex part IDs: every vertex referenced by part `i` gets
/// `start + i`. Unreferenced vertices stay `0`, the background ID.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] if the last part's ID would pass
/// [`MAX_PICK_ID`].
pub fn color_index_array(
    indices: &[u16],
    lengths: &[u32],
    start: u32,
    vertex_count: usize,
) -> Result<Vec<f32>, ViewerError> {
    let fits = u32::try_from(lengths.len())
        .ok()
        .and_then(|count| start.checked_add(count.saturating_sub(1)))
        .is_some_and(|last| last <= MAX_PICK_ID);
    if !fits {
        return Err(ViewerError::Format(format!(
            "{} parts starting at picking ID {start} pass the limit of {MAX_PICK_ID}",
            lengths.len()
        )));
    }
    let mut colors = vec![0.0f32; vertex_count];
    for (id, (&length, part_start)) in (start..).zip(lengths.iter().zip(part_starts(lengths))) {
        let id = id as f32;
        let begin = part_start as usize;
        let end = (begin + length as usize).min(indices.len());
        for &vertex in &indices[begin.min(end)..end] {
            colors[vertex as usize] = id;
        }
    }
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(vertices: usize, indices: Vec<u32>) -> DecodedMesh {
        DecodedMesh {
            attribs: vec![0.0; vertices * 3],
            indices,
            bboxes: Vec::new(),
            channel_count: 3,
        }
    }

    #[test]
    fn color_indices_stamp_each_part() {
        let mesh = decoded(5, vec![0, 1, 2, 2, 3, 4]);
        let buffers = MeshBuffers::build(mesh, &[3, 3], Some(10)).unwrap();
        assert_eq!(
            buffers.color_indices.unwrap(),
            vec![10.0, 10.0, 11.0, 11.0, 11.0]
        );
        assert_eq!(buffers.indices, vec![0, 1, 2, 2, 3, 4]);
    }

    #[test]
    fn color_indices_stop_at_float_precision() {
        let mesh = decoded(3, vec![0, 1, 2, 0, 1, 2]);
        let top = MeshBuffers::build(mesh.clone(), &[3, 3], Some(MAX_PICK_ID - 1)).unwrap();
        assert_eq!(top.color_indices.unwrap()[0], MAX_PICK_ID as f32);
        assert!(matches!(
            MeshBuffers::build(mesh.clone(), &[3, 3], Some(MAX_PICK_ID)),
            Err(ViewerError::Format(_))
        ));
        assert!(MeshBuffers::build(mesh, &[3, 3], Some(u32::MAX)).is_err());
    }

    #[test]
    fn picking_stream_is_optional() {
        let buffers =
            MeshBuffers::build(decoded(3, vec![0, 1, 2]), &[3], None).unwrap();
        assert!(buffers.color_indices.is_none());
        assert_eq!(buffers.vertex_count(), 3);
    }

    #[test]
    fn index_past_16_bits_is_rejected() {
        let err = narrow_indices(&[0, 65_536], 70_000).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::IndexLimit { index: 65_536, .. }
        ));
        assert_eq!(narrow_indices(&[65_535], 65_536).unwrap(), vec![65_535]);
    }

    #[test]
    fn index_past_vertex_count_is_rejected() {
        let err =
            MeshBuffers::build(decoded(3, vec![0, 1, 3]), &[3], None).unwrap_err();
        assert!(matches!(err, ViewerError::IndexLimit { index: 3, .. }));
    }

    #[test]
    fn lengths_must_cover_indices() {
        let err =
            MeshBuffers::build(decoded(3, vec![0, 1, 2]), &[2], None).unwrap_err();
        assert!(matches!(err, ViewerError::Format(_)));
    }
}
