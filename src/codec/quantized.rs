//! Per-channel dequantization of integer attribute streams.
//!
//! Every vertex attribute channel (position x/y/z, texcoord u/v, normal
//! x/y/z in the shipped models) is stored as a small integer and mapped back
//! to a float with an affine `value = raw * scale + offset` transform. The
//! channel of element `i` in an interleaved stream is `i % channel_count`.

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

/// Per-model dequantization constants, one `(offset, scale)` pair per
/// attribute channel.
///
/// Deserializes from either the affine form `{ "offsets", "scales" }` or
/// the pre-scale form `{ "decodeOffsets", "decodeScales" }` written by the
/// model export tools, where `value = (raw + offset) * scale`. The pre-scale
/// form is folded into the affine form on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDecodeParams")]
pub struct DecodeParams {
    offsets: Vec<f32>,
    scales: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecodeParams {
    Affine {
        offsets: Vec<f32>,
        scales: Vec<f32>,
    },
    PreScale {
        #[serde(rename = "decodeOffsets")]
        decode_offsets: Vec<f32>,
        #[serde(rename = "decodeScales")]
        decode_scales: Vec<f32>,
    },
}

impl TryFrom<RawDecodeParams> for DecodeParams {
    type Error = ViewerError;

    fn try_from(raw: RawDecodeParams) -> Result<Self, Self::Error> {
        match raw {
            RawDecodeParams::Affine { offsets, scales } => {
                Self::new(offsets, scales)
            }
            RawDecodeParams::PreScale {
                decode_offsets,
                decode_scales,
            } => Self::from_pre_scale(&decode_offsets, &decode_scales),
        }
    }
}

impl DecodeParams {
    /// Affine parameters: `value = raw * scale + offset`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Format`] when the sequences differ in length
    /// or are empty.
    pub fn new(offsets: Vec<f32>, scales: Vec<f32>) -> Result<Self, ViewerError> {
        check_lengths(offsets.len(), scales.len())?;
        Ok(Self { offsets, scales })
    }

    /// Parameters in the exporter's `(raw + offset) * scale` convention.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DecodeParams::new`].
    pub fn from_pre_scale(
        offsets: &[f32],
        scales: &[f32],
    ) -> Result<Self, ViewerError> {
        check_lengths(offsets.len(), scales.len())?;
        let folded = offsets
            .iter()
            .zip(scales)
            .map(|(offset, scale)| offset * scale)
            .collect();
        Ok(Self {
            offsets: folded,
            scales: scales.to_vec(),
        })
    }

    /// Number of interleaved channels per vertex.
    pub fn channel_count(&self) -> usize {
        self.offsets.len()
    }

    /// Additive term for `channel`.
    pub fn offset(&self, channel: usize) -> f32 {
        self.offsets[channel % self.offsets.len()]
    }

    /// Multiplicative term for `channel`.
    pub fn scale(&self, channel: usize) -> f32 {
        self.scales[channel % self.scales.len()]
    }

    /// Dequantize a single value of `channel`.
    pub fn decode_value(&self, raw: i32, channel: usize) -> f32 {
        raw as f32 * self.scale(channel) + self.offset(channel)
    }

    /// Inverse of [`decode_value`](Self::decode_value), rounded to the
    /// nearest integer step.
    pub fn quantize_value(&self, value: f32, channel: usize) -> i32 {
        let scale = self.scale(channel);
        if scale == 0.0 {
            return 0;
        }
        ((value - self.offset(channel)) / scale).round() as i32
    }
}

/// Dequantize an interleaved stream of signed integers.
///
/// # Errors
///
/// Returns [`ViewerError::Format`] if the stream length is not a multiple of
/// the channel count.
pub fn decode(raw: &[i32], params: &DecodeParams) -> Result<Vec<f32>, ViewerError> {
    check_shape(raw.len(), params)?;
    let channels = params.channel_count();
    Ok(raw
        .iter()
        .enumerate()
        .map(|(i, &r)| params.decode_value(r, i % channels))
        .collect())
}

/// Dequantize an interleaved stream of unsigned 16-bit integers, the storage
/// type of the binary chunk layout.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_u16(raw: &[u16], params: &DecodeParams) -> Result<Vec<f32>, ViewerError> {
    check_shape(raw.len(), params)?;
    let channels = params.channel_count();
    Ok(raw
        .iter()
        .enumerate()
        .map(|(i, &r)| params.decode_value(i32::from(r), i % channels))
        .collect())
}

/// Quantize an interleaved float stream back into integers.
///
/// # Errors
///
/// Same as [`decode`].
pub fn quantize(values: &[f32], params: &DecodeParams) -> Result<Vec<i32>, ViewerError> {
    check_shape(values.len(), params)?;
    let channels = params.channel_count();
    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| params.quantize_value(v, i % channels))
        .collect())
}

fn check_lengths(offsets: usize, scales: usize) -> Result<(), ViewerError> {
    if offsets != scales {
        return Err(ViewerError::Format(format!(
            "decode params have {offsets} offsets but {scales} scales"
        )));
    }
    if offsets == 0 {
        return Err(ViewerError::Format(
            "decode params must describe at least one channel".to_owned(),
        ));
    }
    Ok(())
}

fn check_shape(len: usize, params: &DecodeParams) -> Result<(), ViewerError> {
    let channels = params.channel_count();
    if len % channels != 0 {
        return Err(ViewerError::Format(format!(
            "stream of {len} values is not a multiple of {channels} channels"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worm_params() -> DecodeParams {
        DecodeParams::from_pre_scale(
            &[-619.0, -1417.0, -8191.0, 0.0, 0.0, -511.0, -511.0, -511.0],
            &[
                0.000498, 0.000498, 0.000498, 0.000978, 0.000978, 0.001957,
                0.001957, 0.001957,
            ],
        )
        .unwrap()
    }

    #[test]
    fn decode_is_affine_per_channel() {
        let params =
            DecodeParams::new(vec![1.0, -2.0], vec![0.5, 2.0]).unwrap();
        let out = decode(&[4, 3, 10, -1], &params).unwrap();
        assert_eq!(out, vec![3.0, 4.0, 6.0, -4.0]);
    }

    #[test]
    fn eight_channel_stream_decodes() {
        let params = worm_params();
        let raw: Vec<i32> = (0..16).collect();
        let out = decode(&raw, &params).unwrap();
        assert_eq!(out.len(), 16);
        for (i, (&r, &v)) in raw.iter().zip(&out).enumerate() {
            let c = i % 8;
            assert_eq!(v, r as f32 * params.scale(c) + params.offset(c));
        }
    }

    #[test]
    fn pre_scale_form_matches_exporter_convention() {
        let params = worm_params();
        let expected = (700.0 - 619.0) * 0.000498_f32;
        assert!((params.decode_value(700, 0) - expected).abs() < 1e-5);
    }

    #[test]
    fn misaligned_stream_is_rejected() {
        let params = worm_params();
        let err = decode(&[1, 2, 3], &params).unwrap_err();
        assert!(matches!(err, ViewerError::Format(_)));
        assert!(decode_u16(&[0; 9], &params).is_err());
    }

    #[test]
    fn quantize_inverts_decode_within_one_step() {
        let params = worm_params();
        for channel in 0..8 {
            for raw in [-3000, -1, 0, 1, 17, 4095, 30000] {
                let value = params.decode_value(raw, channel);
                let back = params.quantize_value(value, channel);
                assert!((back - raw).abs() <= 1, "{raw} -> {back}");
            }
        }
    }

    #[test]
    fn mismatched_params_are_rejected() {
        assert!(DecodeParams::new(vec![0.0], vec![1.0, 2.0]).is_err());
        assert!(DecodeParams::new(vec![], vec![]).is_err());
    }

    #[test]
    fn both_json_forms_deserialize() {
        let affine: DecodeParams =
            serde_json::from_str(r#"{"offsets":[1.0],"scales":[2.0]}"#)
                .unwrap();
        assert_eq!(affine.decode_value(3, 0), 7.0);

        let pre: DecodeParams = serde_json::from_str(
            r#"{"decodeOffsets":[1.0],"decodeScales":[2.0]}"#,
        )
        .unwrap();
        assert_eq!(pre.decode_value(3, 0), 8.0);
    }
}
