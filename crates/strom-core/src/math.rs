//! Level and time conversions shared by the stages.
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//! - [`ms_to_samples`] - Milliseconds to a sample count at a rate

use libm::{expf, logf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use strom_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Values at or below zero map to -200 dB.
///
/// # Example
/// ```rust
/// use strom_core::linear_to_db;
///
/// assert!(linear_to_db(1.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) + 6.02).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(linear) = 20 * ln(linear) / ln(10)
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Convert milliseconds to a whole number of samples (frames) at `sample_rate`.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: u32) -> usize {
    #[allow(clippy::cast_precision_loss)]
    let samples = ms * sample_rate as f32 / 1000.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = libm::roundf(samples.max(0.0)) as usize;
    whole
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_linear_roundtrip() {
        for db in [-60.0, -12.0, -3.0, 0.0, 6.0, 20.0] {
            let back = linear_to_db(db_to_linear(db));
            assert!((back - db).abs() < 0.01, "{db} -> {back}");
        }
    }

    #[test]
    fn silence_floor() {
        assert!((linear_to_db(0.0) + 200.0).abs() < 0.01);
    }

    #[test]
    fn ms_conversion() {
        assert_eq!(ms_to_samples(10.0, 48000), 480);
        assert_eq!(ms_to_samples(0.5, 8000), 4);
        assert_eq!(ms_to_samples(-5.0, 8000), 0);
    }
}
