//! UTF-8 code-point chunk layout.
//!
//! Each code point carries one integer in `0..=0xFFFF`. Attribute streams are
//! channel-major and zig-zag delta coded, index streams use a high-water
//! mark, and bounding boxes are stored as quantized minimum corners plus
//! rounded-up radii.

use super::quantized::DecodeParams;
use crate::catalog::StreamRange;
use crate::error::ViewerError;
use crate::mesh::BBox;

/// Split chunk text into its integer code points.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] for invalid UTF-8 or code points above
/// the 16-bit range (they would shift every following offset).
pub fn code_points(bytes: &[u8]) -> Result<Vec<u32>, ViewerError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ViewerError::Format(format!("chunk is not UTF-8: {e}")))?;
    text.chars()
        .map(u32::from)
        .enumerate()
        .map(|(i, cp)| {
            if cp > 0xFFFF {
                Err(ViewerError::Format(format!(
                    "code point {cp:#x} at {i} is outside the 16-bit range"
                )))
            } else {
                Ok(cp)
            }
        })
        .collect()
}

/// Zig-zag decode: `0, 1, 2, 3, 4` → `0, -1, 1, -2, 2`.
pub fn unzigzag(code: u32) -> i32 {
    ((code >> 1) as i32) ^ -((code & 1) as i32)
}

/// Zig-zag encode, the inverse of [`unzigzag`].
pub fn zigzag(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Decode `range.length` vertices of interleaved attributes.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] if the range runs past the chunk.
pub fn decode_attributes(
    cps: &[u32],
    range: StreamRange,
    params: &DecodeParams,
) -> Result<Vec<f32>, ViewerError> {
    let channels = params.channel_count();
    let vertices = range.length;
    let total = product(vertices, channels, "attribute")?;
    let input = slice(cps, range.start, total, "attribute")?;

    let mut out = vec![0.0f32; total];
    for (channel, column) in input.chunks_exact(vertices.max(1)).enumerate() {
        let mut prev = 0i32;
        for (vertex, &code) in column.iter().enumerate() {
            prev = prev.wrapping_add(unzigzag(code));
            out[vertex * channels + channel] = params.decode_value(prev, channel);
        }
    }
    Ok(out)
}

/// Decode `range.length` triangles of high-water-mark coded indices.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] if the range runs past the chunk or a
/// code points above the current high-water mark.
pub fn decode_indices(cps: &[u32], range: StreamRange) -> Result<Vec<u32>, ViewerError> {
    let total = product(range.length, 3, "index")?;
    let input = slice(cps, range.start, total, "index")?;
    let mut highest = 0u32;
    input
        .iter()
        .enumerate()
        .map(|(i, &code)| {
            let index = highest.checked_sub(code).ok_or_else(|| {
                ViewerError::Format(format!(
                    "index code {code} at {i} exceeds high-water mark {highest}"
                ))
            })?;
            if code == 0 {
                highest += 1;
            }
            Ok(index)
        })
        .collect()
}

/// Decode `count` bounding boxes starting at code point `offset`.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] if the boxes run past the chunk.
pub fn decode_bboxes(
    cps: &[u32],
    offset: usize,
    count: usize,
    params: &DecodeParams,
) -> Result<Vec<BBox>, ViewerError> {
    let total = product(count, 6, "bounding box")?;
    let input = slice(cps, offset, total, "bounding box")?;
    Ok(input
        .chunks_exact(6)
        .map(|k| {
            let mut min = [0.0f32; 3];
            let mut max = [0.0f32; 3];
            for axis in 0..3 {
                let corner = k[axis] as i32;
                let radius = ((k[axis + 3] + 1) >> 1) as i32;
                min[axis] = params.decode_value(corner, axis);
                max[axis] = params.decode_value(corner + 2 * radius, axis);
            }
            BBox::from_min_max(min, max)
        })
        .collect())
}

fn slice<'a>(
    cps: &'a [u32],
    start: usize,
    len: usize,
    what: &str,
) -> Result<&'a [u32], ViewerError> {
    let end = start.checked_add(len).ok_or_else(|| {
        ViewerError::Format(format!("{what} stream at {start} overflows with length {len}"))
    })?;
    cps.get(start..end).ok_or_else(|| {
        ViewerError::Format(format!(
            "{what} stream [{start}, {end}) exceeds chunk of {} code points",
            cps.len()
        ))
    })
}

fn product(count: usize, width: usize, what: &str) -> Result<usize, ViewerError> {
    count.checked_mul(width).ok_or_else(|| {
        ViewerError::Format(format!("{what} count {count} overflows the stream size"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(channels: usize) -> DecodeParams {
        DecodeParams::new(vec![0.0; channels], vec![1.0; channels]).unwrap()
    }

    fn encode(values: &[u32]) -> Vec<u8> {
        values
            .iter()
            .filter_map(|&v| char::from_u32(v))
            .collect::<String>()
            .into_bytes()
    }

    #[test]
    fn zigzag_round_trips_small_values() {
        assert_eq!(unzigzag(0), 0);
        assert_eq!(unzigzag(1), -1);
        assert_eq!(unzigzag(2), 1);
        assert_eq!(unzigzag(3), -2);
        for v in [-300, -1, 0, 1, 4000] {
            assert_eq!(unzigzag(zigzag(v)), v);
        }
    }

    #[test]
    fn attributes_are_delta_coded_per_channel() {
        // Two channels, three vertices: channel 0 = 5, 3, 4; channel 1 = 0, 1, 1.
        let cps = vec![
            zigzag(5),
            zigzag(-2),
            zigzag(1),
            zigzag(0),
            zigzag(1),
            zigzag(0),
        ];
        let range = StreamRange { start: 0, length: 3 };
        let out = decode_attributes(&cps, range, &identity(2)).unwrap();
        assert_eq!(out, vec![5.0, 0.0, 3.0, 1.0, 4.0, 1.0]);
    }

    #[test]
    fn indices_use_high_water_mark() {
        // Triangles (0,1,2) and (2,1,3).
        let cps = vec![0, 0, 0, 1, 2, 0];
        let range = StreamRange { start: 0, length: 2 };
        assert_eq!(decode_indices(&cps, range).unwrap(), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn index_code_above_mark_is_rejected() {
        let cps = vec![1, 0, 0];
        let range = StreamRange { start: 0, length: 1 };
        assert!(matches!(
            decode_indices(&cps, range),
            Err(ViewerError::Format(_))
        ));
    }

    #[test]
    fn bboxes_decode_to_min_max() {
        let params = DecodeParams::new(vec![1.0; 3], vec![0.5; 3]).unwrap();
        // min corner (2, 4, 6), radii ceil(3/2)=2, ceil(4/2)=2, ceil(0/2)=0
        let cps = vec![2, 4, 6, 3, 4, 0];
        let boxes = decode_bboxes(&cps, 0, 1, &params).unwrap();
        assert_eq!(boxes[0].to_array(), [2.0, 3.0, 4.0, 4.0, 5.0, 4.0]);
    }

    #[test]
    fn out_of_range_streams_fail() {
        let cps = vec![0; 4];
        let range = StreamRange { start: 2, length: 2 };
        assert!(decode_attributes(&cps, range, &identity(3)).is_err());
        assert!(decode_bboxes(&cps, 0, 1, &identity(3)).is_err());
    }

    #[test]
    fn huge_ranges_fail_without_overflow() {
        let cps = vec![0; 16];
        let near_end = StreamRange { start: usize::MAX - 3, length: 2 };
        assert!(matches!(
            decode_attributes(&cps, near_end, &identity(3)),
            Err(ViewerError::Format(_))
        ));
        let too_long = StreamRange { start: 0, length: usize::MAX / 2 };
        assert!(matches!(decode_indices(&cps, too_long), Err(ViewerError::Format(_))));
        assert!(matches!(
            decode_bboxes(&cps, 0, usize::MAX / 4, &identity(3)),
            Err(ViewerError::Format(_))
        ));
    }

    #[test]
    fn code_points_reject_wide_characters() {
        assert_eq!(code_points(&encode(&[0, 65, 0xFFFF])).unwrap(), vec![0, 65, 0xFFFF]);
        assert!(code_points("\u{1F41B}".as_bytes()).is_err());
        assert!(code_points(&[0xFF, 0xFE]).is_err());
    }
}
