//! Second-order IIR section used by the filter stages.
//!
//! Coefficients follow the RBJ Audio EQ Cookbook. The filter is linear, so it
//! runs directly on [`Sample`](crate::Sample) values at full fixed-point scale.

use core::f32::consts::PI;
use libm::{cosf, sinf};

/// Response shape of a [`Biquad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterShape {
    /// Passes content below the corner frequency.
    Lowpass,
    /// Passes content above the corner frequency.
    Highpass,
}

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    /// Passes input through unchanged.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Designs a cookbook filter.
    ///
    /// `frequency` is clamped just below Nyquist so that a corner frequency
    /// above half the sample rate still yields a stable filter.
    pub fn design(shape: FilterShape, frequency: f32, q: f32, sample_rate: f32) -> Self {
        let frequency = frequency.clamp(1.0, sample_rate * 0.499);
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = cosf(omega);
        let alpha = sinf(omega) / (2.0 * q.max(0.01));

        let (b0, b1, b2) = match shape {
            FilterShape::Lowpass => {
                let b = (1.0 - cos_omega) / 2.0;
                (b, 1.0 - cos_omega, b)
            }
            FilterShape::Highpass => {
                let b = (1.0 + cos_omega) / 2.0;
                (b, -(1.0 + cos_omega), b)
            }
        };
        let a0 = 1.0 + alpha;
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Direct Form I biquad:
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: Coefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a filter with the given coefficients and cleared state.
    pub fn new(coeffs: Coefficients) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Replaces the coefficients, keeping the state.
    pub fn set_coefficients(&mut self, coeffs: Coefficients) {
        self.coeffs = coeffs;
    }

    /// Filters one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    /// Clears the delay lines.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new(Coefficients::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(filter: &mut Biquad, input: impl Fn(usize) -> f32, n: usize) -> f32 {
        let mut peak = 0.0f32;
        for i in 0..n {
            let y = filter.process(input(i));
            if i > n / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn identity_passes_through() {
        let mut filter = Biquad::default();
        for x in [1.0, -2.5, 1e9] {
            assert_eq!(filter.process(x), x);
        }
    }

    #[test]
    fn lowpass_passes_dc() {
        let coeffs = Coefficients::design(FilterShape::Lowpass, 1000.0, 0.707, 48000.0);
        let mut filter = Biquad::new(coeffs);
        let mut y = 0.0;
        for _ in 0..2000 {
            y = filter.process(65536.0);
        }
        assert!((y / 65536.0 - 1.0).abs() < 1e-3, "dc gain off: {y}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let coeffs = Coefficients::design(FilterShape::Highpass, 1000.0, 0.707, 48000.0);
        let mut filter = Biquad::new(coeffs);
        let mut y = 1.0;
        for _ in 0..4000 {
            y = filter.process(65536.0);
        }
        assert!((y / 65536.0).abs() < 1e-3, "dc leaked: {y}");
    }

    #[test]
    fn lowpass_attenuates_high_tone() {
        let sr = 48000.0;
        let coeffs = Coefficients::design(FilterShape::Lowpass, 500.0, 0.707, sr);
        let mut filter = Biquad::new(coeffs);
        let tone = |i: usize| libm::sinf(2.0 * PI * 10_000.0 * i as f32 / sr);
        assert!(settle(&mut filter, tone, 4800) < 0.02);
    }

    #[test]
    fn corner_above_nyquist_is_stable() {
        let coeffs = Coefficients::design(FilterShape::Lowpass, 30_000.0, 0.707, 8000.0);
        let mut filter = Biquad::new(coeffs);
        let peak = settle(&mut filter, |i| if i % 2 == 0 { 1.0 } else { -1.0 }, 2000);
        assert!(peak.is_finite());
    }

    #[test]
    fn clear_resets_state() {
        let coeffs = Coefficients::design(FilterShape::Lowpass, 1000.0, 0.707, 48000.0);
        let mut filter = Biquad::new(coeffs);
        filter.process(1.0);
        filter.clear();
        let mut fresh = Biquad::new(coeffs);
        assert_eq!(filter.process(0.5), fresh.process(0.5));
    }
}
