//! Chunk-level decoding of mesh entries.

use web_time::Instant;

use super::quantized::DecodeParams;
use super::{binary, utf8};
use crate::catalog::{ChunkFormat, MeshEntry};
use crate::error::ViewerError;
use crate::mesh::BBox;

/// CPU-side result of decoding one [`MeshEntry`] out of its chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMesh {
    /// Interleaved dequantized vertex attributes.
    pub attribs: Vec<f32>,
    /// Triangle-list indices, local to `attribs`.
    pub indices: Vec<u32>,
    /// One bounding box per part, in entry order.
    pub bboxes: Vec<BBox>,
    /// Floats per vertex.
    pub channel_count: usize,
}

impl DecodedMesh {
    /// Number of vertices in `attribs`.
    pub fn vertex_count(&self) -> usize {
        self.attribs.len() / self.channel_count.max(1)
    }
}

/// A loaded chunk, pre-split into the units its format addresses.
///
/// Several entries usually share a chunk, so the UTF-8 text is expanded into
/// code points once.
#[derive(Debug, Clone)]
pub enum Chunk {
    /// Code points of a UTF-8 chunk.
    Utf8(Vec<u32>),
    /// Raw bytes of a binary chunk.
    Binary(Vec<u8>),
}

impl Chunk {
    /// Prepare raw chunk bytes for decoding.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Format`] if a UTF-8 chunk is malformed.
    pub fn parse(bytes: Vec<u8>, format: ChunkFormat) -> Result<Self, ViewerError> {
        match format {
            ChunkFormat::Utf8 => Ok(Self::Utf8(utf8::code_points(&bytes)?)),
            ChunkFormat::Binary => Ok(Self::Binary(bytes)),
        }
    }

    /// Decode the attribute, index, and bounding-box streams of `entry`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Format`] if any stream is out of range or the
    /// entry's part lengths do not add up to the decoded index count.
    pub fn decode_entry(
        &self,
        entry: &MeshEntry,
        params: &DecodeParams,
    ) -> Result<DecodedMesh, ViewerError> {
        entry.validate()?;
        let started = Instant::now();
        let parts = entry.part_count();
        let (attribs, indices, bboxes) = match self {
            Self::Utf8(cps) => (
                utf8::decode_attributes(cps, entry.attrib_range, params)?,
                utf8::decode_indices(cps, entry.index_range)?,
                utf8::decode_bboxes(cps, entry.bboxes, parts, params)?,
            ),
            Self::Binary(bytes) => (
                binary::decode_attributes(bytes, entry.attrib_range, params)?,
                binary::decode_indices(bytes, entry.index_range)?,
                binary::decode_bboxes(bytes, entry.bboxes, parts)?,
            ),
        };

        if indices.len() != entry.total_index_count() {
            return Err(ViewerError::Format(format!(
                "entry '{}' part lengths sum to {} but {} indices decoded",
                entry.material,
                entry.total_index_count(),
                indices.len()
            )));
        }

        let decoded = DecodedMesh {
            attribs,
            indices,
            bboxes,
            channel_count: params.channel_count(),
        };
        log::debug!(
            "decoded '{}': {} vertices, {} indices, {} parts in {:?}",
            entry.material,
            decoded.vertex_count(),
            decoded.indices.len(),
            parts,
            started.elapsed()
        );
        Ok(decoded)
    }

    /// Decode every entry of a chunk, in manifest order.
    ///
    /// # Errors
    ///
    /// Stops at the first entry that fails to decode.
    pub fn decode_all(
        &self,
        entries: &[MeshEntry],
        params: &DecodeParams,
    ) -> Result<Vec<DecodedMesh>, ViewerError> {
        entries
            .iter()
            .map(|entry| self.decode_entry(entry, params))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::utf8::zigzag;

    fn params() -> DecodeParams {
        DecodeParams::new(vec![0.0; 3], vec![1.0; 3]).unwrap()
    }

    /// One triangle over three vertices followed by one bounding box.
    fn utf8_chunk() -> Vec<u8> {
        let mut cps: Vec<u32> = Vec::new();
        // x: 0, 1, 0   y: 0, 0, 1   z: 0, 0, 0
        cps.extend([zigzag(0), zigzag(1), zigzag(-1)]);
        cps.extend([zigzag(0), zigzag(0), zigzag(1)]);
        cps.extend([zigzag(0), zigzag(0), zigzag(0)]);
        cps.extend([0, 0, 0]);
        cps.extend([0, 0, 0, 2, 2, 0]);
        cps.iter()
            .filter_map(|&c| char::from_u32(c))
            .collect::<String>()
            .into_bytes()
    }

    fn entry(lengths: Vec<u32>) -> MeshEntry {
        MeshEntry {
            material: "m".to_owned(),
            attrib_range: [0, 3].into(),
            index_range: [9, 1].into(),
            bboxes: 12,
            names: vec!["tri".to_owned(); lengths.len()],
            lengths,
        }
    }

    #[test]
    fn utf8_entry_decodes_end_to_end() {
        let chunk = Chunk::parse(utf8_chunk(), ChunkFormat::Utf8).unwrap();
        let mesh = chunk.decode_entry(&entry(vec![3]), &params()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(
            mesh.attribs,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.bboxes[0].to_array(), [0.0, 0.0, 0.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn length_mismatch_is_a_format_error() {
        let chunk = Chunk::parse(utf8_chunk(), ChunkFormat::Utf8).unwrap();
        let err = chunk.decode_entry(&entry(vec![2]), &params()).unwrap_err();
        assert!(matches!(err, ViewerError::Format(_)));
    }

    #[test]
    fn binary_entry_decodes() {
        let mut bytes: Vec<u8> = Vec::new();
        for v in [0u16, 0, 0, 1, 0, 0, 0, 1, 0] {
            bytes.extend(v.to_le_bytes());
        }
        for i in [0u16, 1, 2] {
            bytes.extend(i.to_le_bytes());
        }
        for f in [0.0f32, 0.0, 0.0, 1.0, 1.0, 0.0] {
            bytes.extend(f.to_le_bytes());
        }
        let entry = MeshEntry {
            material: "m".to_owned(),
            attrib_range: [0, 18].into(),
            index_range: [18, 6].into(),
            bboxes: 24,
            names: vec!["tri".to_owned()],
            lengths: vec![3],
        };
        let chunk = Chunk::parse(bytes, ChunkFormat::Binary).unwrap();
        let mesh = chunk.decode_entry(&entry, &params()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.bboxes[0].max.x, 1.0);
    }
}
