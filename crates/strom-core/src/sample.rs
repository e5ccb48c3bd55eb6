//! Sample representation and full-scale conversions.
//!
//! Every stage exchanges interleaved [`Sample`]s carried at 32-bit
//! fixed-point scale: full scale is ±2³¹, so a 16-bit PCM value of `1`
//! becomes `65536.0` and a normalized float of `0.5` becomes `2³⁰`.
//! Keeping the fixed-point scale (rather than ±1.0) lets integer codecs
//! round-trip exactly and makes "clipping" a well-defined event: any value
//! whose magnitude exceeds [`SAMPLE_MAX`].
//!
//! DSP code that thinks in normalized units converts at the edges with
//! [`to_unit`] / [`from_unit`].

/// A single audio sample at 32-bit fixed-point scale.
pub type Sample = f32;

/// Largest representable sample magnitude (2³¹).
pub const SAMPLE_MAX: Sample = 2_147_483_648.0;

/// Smallest representable sample value (-2³¹).
pub const SAMPLE_MIN: Sample = -SAMPLE_MAX;

/// Converts a sample to normalized units (full scale = 1.0).
#[inline]
pub fn to_unit(sample: Sample) -> f32 {
    sample / SAMPLE_MAX
}

/// Converts a normalized value (full scale = 1.0) to a sample.
#[inline]
pub fn from_unit(value: f32) -> Sample {
    value * SAMPLE_MAX
}

/// Clamps a sample into the representable range.
///
/// Returns the clamped value and whether clamping occurred.
#[inline]
pub fn clip(sample: Sample) -> (Sample, bool) {
    if sample > SAMPLE_MAX {
        (SAMPLE_MAX, true)
    } else if sample < SAMPLE_MIN {
        (SAMPLE_MIN, true)
    } else {
        (sample, false)
    }
}

/// Clamps a block in place and returns the number of clipped samples.
///
/// Non-finite values are treated as clips and replaced with silence.
pub fn clip_block(samples: &mut [Sample]) -> u64 {
    let mut clips = 0;
    for s in samples.iter_mut() {
        if !s.is_finite() {
            *s = 0.0;
            clips += 1;
            continue;
        }
        let (value, clipped) = clip(*s);
        *s = value;
        clips += u64::from(clipped);
    }
    clips
}

/// Converts a signed integer sample of the given bit depth to sample scale.
#[inline]
pub fn from_int(value: i32, bits: u16) -> Sample {
    let shift = 32 - i32::from(bits.clamp(1, 32));
    value as f32 * (1u64 << shift) as f32
}

/// Converts a sample to a signed integer of the given bit depth.
///
/// Rounds to nearest and saturates; the boolean reports saturation.
#[inline]
pub fn to_int(sample: Sample, bits: u16) -> (i32, bool) {
    let bits = bits.clamp(1, 32);
    let scale = (1u64 << (32 - u32::from(bits))) as f64;
    let max = ((1i64 << (bits - 1)) - 1) as f64;
    let min = -((1i64 << (bits - 1)) as f64);
    let scaled = (f64::from(sample) / scale).round();
    if scaled > max {
        (max as i32, true)
    } else if scaled < min {
        (min as i32, true)
    } else {
        (scaled as i32, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_roundtrip() {
        assert_eq!(from_unit(0.5), 1_073_741_824.0);
        assert_eq!(to_unit(from_unit(-0.25)), -0.25);
    }

    #[test]
    fn clip_counts_out_of_range() {
        let mut block = [0.0, SAMPLE_MAX * 2.0, -SAMPLE_MAX * 3.0, 12.0, f32::NAN];
        assert_eq!(clip_block(&mut block), 3);
        assert_eq!(block, [0.0, SAMPLE_MAX, SAMPLE_MIN, 12.0, 0.0]);
    }

    #[test]
    fn int16_roundtrip() {
        for v in [-32768, -1, 0, 1, 12345, 32767] {
            let s = from_int(v, 16);
            assert_eq!(to_int(s, 16), (v, false));
        }
        assert_eq!(from_int(1, 16), 65536.0);
    }

    #[test]
    fn to_int_saturates() {
        assert_eq!(to_int(SAMPLE_MAX, 16), (32767, true));
        assert_eq!(to_int(SAMPLE_MIN, 16), (-32768, false));
        assert_eq!(to_int(SAMPLE_MIN * 2.0, 8), (-128, true));
    }
}
