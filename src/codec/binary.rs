//! Fixed-offset little-endian chunk layout.
//!
//! Ranges are byte ranges. Attributes and indices are `u16`; bounding boxes
//! are six `f32` per part, already in min/max form.

use super::quantized::{decode_u16, DecodeParams};
use crate::catalog::StreamRange;
use crate::error::ViewerError;
use crate::mesh::BBox;

/// Dequantize the attribute stream at `range`.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] for out-of-range, odd-length, or
/// channel-misaligned streams.
pub fn decode_attributes(
    bytes: &[u8],
    range: StreamRange,
    params: &DecodeParams,
) -> Result<Vec<f32>, ViewerError> {
    let raw = read_u16s(bytes, range, "attribute")?;
    decode_u16(&raw, params)
}

/// Read the index stream at `range`.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] for out-of-range or odd-length streams.
pub fn decode_indices(bytes: &[u8], range: StreamRange) -> Result<Vec<u32>, ViewerError> {
    Ok(read_u16s(bytes, range, "index")?
        .into_iter()
        .map(u32::from)
        .collect())
}

/// Read `count` min/max boxes starting at byte `offset`.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] if the boxes run past the chunk.
pub fn decode_bboxes(
    bytes: &[u8],
    offset: usize,
    count: usize,
) -> Result<Vec<BBox>, ViewerError> {
    let end = count
        .checked_mul(24)
        .and_then(|len| offset.checked_add(len))
        .ok_or_else(|| {
            ViewerError::Format(format!("{count} bounding boxes at {offset} overflow"))
        })?;
    let data = bytes.get(offset..end).ok_or_else(|| {
        ViewerError::Format(format!(
            "bounding boxes [{offset}, {end}) exceed chunk of {} bytes",
            bytes.len()
        ))
    })?;
    Ok(data
        .chunks_exact(24)
        .map(|b| {
            let mut v = [0.0f32; 6];
            for (dst, src) in v.iter_mut().zip(b.chunks_exact(4)) {
                *dst = f32::from_le_bytes([src[0], src[1], src[2], src[3]]);
            }
            BBox::from_array(v)
        })
        .collect())
}

fn read_u16s(
    bytes: &[u8],
    range: StreamRange,
    what: &str,
) -> Result<Vec<u16>, ViewerError> {
    if range.length % 2 != 0 {
        return Err(ViewerError::Format(format!(
            "{what} stream length {} is not a whole number of u16s",
            range.length
        )));
    }
    let end = range.end().ok_or_else(|| {
        ViewerError::Format(format!(
            "{what} stream at {} overflows with length {}",
            range.start, range.length
        ))
    })?;
    let data = bytes.get(range.start..end).ok_or_else(|| {
        ViewerError::Format(format!(
            "{what} stream [{}, {end}) exceeds chunk of {} bytes",
            range.start,
            bytes.len()
        ))
    })?;
    Ok(data
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_bytes(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn attributes_dequantize_from_bytes() {
        let params = DecodeParams::new(vec![-1.0, 0.0], vec![0.5, 2.0]).unwrap();
        let bytes = u16_bytes(&[4, 3, 10, 1]);
        let range = StreamRange { start: 0, length: 8 };
        let out = decode_attributes(&bytes, range, &params).unwrap();
        assert_eq!(out, vec![1.0, 6.0, 4.0, 2.0]);
    }

    #[test]
    fn indices_read_at_offset() {
        let mut bytes = vec![0xAA; 3];
        bytes.extend(u16_bytes(&[0, 1, 2, 65535]));
        let range = StreamRange { start: 3, length: 8 };
        assert_eq!(decode_indices(&bytes, range).unwrap(), vec![0, 1, 2, 65535]);
    }

    #[test]
    fn odd_and_overlong_ranges_fail() {
        let bytes = u16_bytes(&[1, 2]);
        assert!(decode_indices(&bytes, StreamRange { start: 0, length: 3 }).is_err());
        assert!(decode_indices(&bytes, StreamRange { start: 2, length: 4 }).is_err());
    }

    #[test]
    fn huge_ranges_fail_without_overflow() {
        let bytes = u16_bytes(&[1, 2, 3, 4]);
        let near_end = StreamRange { start: usize::MAX - 1, length: 4 };
        assert!(matches!(decode_indices(&bytes, near_end), Err(ViewerError::Format(_))));
        assert!(matches!(
            decode_bboxes(&bytes, 0, usize::MAX / 8),
            Err(ViewerError::Format(_))
        ));
        assert!(matches!(
            decode_bboxes(&bytes, usize::MAX, 1),
            Err(ViewerError::Format(_))
        ));
    }

    #[test]
    fn bboxes_are_little_endian_floats() {
        let bytes: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let boxes = decode_bboxes(&bytes, 0, 1).unwrap();
        assert_eq!(boxes[0].to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(decode_bboxes(&bytes, 4, 1).is_err());
    }
}
